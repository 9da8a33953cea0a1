//! Fixed-interval, fixed-rate coupon bond repayment.
//!
//! The borrower pays `i · debt` at every coupon and returns the principal
//! together with the final coupon. Principal is never amortized early.

use serde::{Deserialize, Serialize};

use crate::cadence::Cadence;
use crate::error::{ScheduleError, ValidationError};

use super::phase::PhaseState;
use super::{check_rate, is_positive};

/// Coupon bond schedule.
///
/// # Examples
///
/// ```
/// use repayment_engine::{Cadence, CouponBond};
///
/// let mut bond = CouponBond::new(1000.0, 0.03, 5, Cadence::daily()).unwrap();
/// assert!((bond.next_installment_due() - 30.0).abs() < 1e-9);
/// for _ in 0..4 {
///     bond.advance_phase().unwrap();
/// }
/// assert!((bond.next_installment_due() - 1030.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponBond {
    phases: PhaseState,
    interest_per_coupon: f64,
    debt_now: f64,
    cadence: Cadence,
}

impl CouponBond {
    /// Create a coupon bond paying `interest_per_coupon · principal` per coupon.
    ///
    /// # Errors
    ///
    /// - `ValidationError::NonPositivePrincipal` or `ValidationError::ZeroPhases`
    ///   for an empty schedule
    /// - `ValidationError::InvalidRate` for a negative or non-finite rate
    /// - cadence errors from [`Cadence::validate`]
    pub fn new(
        principal: f64,
        interest_per_coupon: f64,
        coupons: u32,
        cadence: Cadence,
    ) -> Result<Self, ValidationError> {
        let phases = PhaseState::new(principal, coupons)?;
        check_rate("interest_per_coupon", interest_per_coupon)?;
        cadence.validate()?;
        Ok(Self {
            phases,
            interest_per_coupon,
            debt_now: principal,
            cadence,
        })
    }

    /// Anticipated total repayment (coupons plus principal) of a bond.
    #[must_use]
    pub fn total_repayment_due_for(principal: f64, interest_per_coupon: f64, coupons: u32) -> f64 {
        principal * (1.0 + interest_per_coupon * f64::from(coupons))
    }

    /// Phase bookkeeping.
    #[must_use]
    pub const fn phases(&self) -> &PhaseState {
        &self.phases
    }

    /// Interest paid per coupon, as a fraction of the debt.
    #[must_use]
    pub const fn interest_per_coupon(&self) -> f64 {
        self.interest_per_coupon
    }

    /// When coupons fall due.
    #[must_use]
    pub const fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    /// Outstanding principal.
    #[must_use]
    pub const fn debt_now(&self) -> f64 {
        self.debt_now
    }

    /// Coupon due now; the final coupon also returns the principal.
    #[must_use]
    pub fn next_installment_due(&self) -> f64 {
        if self.phases.is_fully_repaid() {
            return 0.0;
        }
        let principal_share = if self.phases.is_last_phase() { 1.0 } else { 0.0 };
        (self.interest_per_coupon + principal_share) * self.debt_now
    }

    /// Sum of all coupons and principal still owed.
    #[must_use]
    pub fn face_value(&self) -> f64 {
        if self.phases.is_fully_repaid() {
            return 0.0;
        }
        (f64::from(self.phases.phases_remaining()) * self.interest_per_coupon + 1.0) * self.debt_now
    }

    /// Outstanding principal after the next coupon.
    #[must_use]
    pub fn debt_in_next_phase(&self) -> f64 {
        if self.phases.phases_remaining() <= 1 {
            0.0
        } else {
            self.debt_now
        }
    }

    /// Interest over the whole schedule, `i · total coupons`.
    #[must_use]
    pub fn overall_interest(&self) -> f64 {
        self.interest_per_coupon * f64::from(self.phases.total_phases())
    }

    /// Record a paid coupon.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` once every coupon has been paid.
    pub fn advance_phase(&mut self) -> Result<(), ScheduleError> {
        self.phases.advance()?;
        if self.phases.is_fully_repaid() {
            self.debt_now = 0.0;
        }
        Ok(())
    }

    /// Raise the outstanding principal. The full amount is recorded as
    /// additional principal.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` for a positive amount on a repaid bond.
    pub fn extend(&mut self, amount: f64) -> Result<(), ScheduleError> {
        if !is_positive(amount) {
            return Ok(());
        }
        self.phases.ensure_outstanding("extend coupon bond")?;
        self.increment(amount);
        Ok(())
    }

    /// Write off part of the outstanding principal. Recorded principal is left
    /// as is.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` for a positive amount on a repaid bond.
    pub fn reduce(&mut self, amount: f64) -> Result<(), ScheduleError> {
        if !is_positive(amount) {
            return Ok(());
        }
        self.phases.ensure_outstanding("reduce coupon bond")?;
        self.increment(-amount.min(self.debt_now));
        Ok(())
    }

    fn increment(&mut self, delta: f64) {
        if delta > 0.0 {
            self.phases.increment_principal(delta);
        }
        self.debt_now = (self.debt_now + delta).max(0.0);
        if self.debt_now == 0.0 {
            self.phases.settle();
        } else {
            self.phases.rebase();
        }
    }
}
