//! Bullet repayment: principal plus interest in a single terminal payment.

use serde::{Deserialize, Serialize};

use crate::cadence::Cadence;
use crate::error::{ScheduleError, ValidationError};

use super::coupon_bond::CouponBond;
use super::phase::PhaseState;

/// A one-coupon bond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bullet(CouponBond);

impl Bullet {
    /// Create a bullet loan repaying `(1 + rate) · principal` after one interval.
    ///
    /// # Errors
    ///
    /// Same as [`CouponBond::new`] with a single phase.
    pub fn new(principal: f64, rate: f64, cadence: Cadence) -> Result<Self, ValidationError> {
        CouponBond::new(principal, rate, 1, cadence).map(Self)
    }

    /// The underlying single-coupon bond.
    #[must_use]
    pub const fn as_coupon_bond(&self) -> &CouponBond {
        &self.0
    }

    /// Phase bookkeeping.
    #[must_use]
    pub const fn phases(&self) -> &PhaseState {
        self.0.phases()
    }

    /// Interest rate applied to the single payment.
    #[must_use]
    pub const fn rate(&self) -> f64 {
        self.0.interest_per_coupon()
    }

    /// When the payment falls due.
    #[must_use]
    pub const fn cadence(&self) -> &Cadence {
        self.0.cadence()
    }

    /// Immediate debt, excluding interest.
    #[must_use]
    pub const fn debt_now(&self) -> f64 {
        self.0.debt_now()
    }

    /// Principal plus interest while unpaid, zero afterwards.
    #[must_use]
    pub fn next_installment_due(&self) -> f64 {
        self.0.next_installment_due()
    }

    /// The outstanding payment.
    #[must_use]
    pub fn face_value(&self) -> f64 {
        self.0.face_value()
    }

    /// Zero: the single payment clears the loan.
    #[must_use]
    pub fn debt_in_next_phase(&self) -> f64 {
        self.0.debt_in_next_phase()
    }

    /// Same as [`rate`](Self::rate).
    #[must_use]
    pub fn overall_interest(&self) -> f64 {
        self.0.overall_interest()
    }

    /// Record the payment.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` once the payment has been made.
    pub fn advance_phase(&mut self) -> Result<(), ScheduleError> {
        self.0.advance_phase()
    }

    /// Increase the principal.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` once the payment has been made.
    pub fn extend(&mut self, amount: f64) -> Result<(), ScheduleError> {
        self.0.extend(amount)
    }

    /// Write down the principal.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` once the payment has been made.
    pub fn reduce(&mut self, amount: f64) -> Result<(), ScheduleError> {
        self.0.reduce(amount)
    }
}
