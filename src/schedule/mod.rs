//! Repayment schedules.
//!
//! A schedule is a small state machine: it reports the installment due now,
//! advances one phase per paid installment, and can be re-based when the
//! outstanding debt is extended or written down. The set of schedules is
//! closed; [`PaymentSchedule`] is matched exhaustively wherever behaviour
//! depends on the concrete kind.

mod bullet;
mod coupon_bond;
mod mortgage;
mod non_accumulating;
mod phase;
mod terms;

pub use bullet::Bullet;
pub use coupon_bond::CouponBond;
pub use mortgage::FixedRateMortgage;
pub use non_accumulating::NonAccumulatingInterest;
pub use phase::PhaseState;
pub use terms::{ScheduleTerms, MIN_ANNUITY_RATE};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cadence::Cadence;
use crate::error::{ScheduleError, ValidationError};

pub(crate) fn check_rate(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidRate { field, value });
    }
    Ok(())
}

/// True for strictly positive, non-NaN amounts.
pub(crate) fn is_positive(amount: f64) -> bool {
    !amount.is_nan() && amount > 0.0
}

/// The concrete kind of a loan, derived from its schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanKind {
    /// Periodic coupons, principal returned with the last one.
    CouponBond,
    /// Single payment of principal plus interest.
    Bullet,
    /// Equal annuity installments.
    FixedRateMortgage,
    /// Equal installments with one overall interest rate.
    NonAccumulatingInterest,
}

impl fmt::Display for LoanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CouponBond => write!(f, "coupon_bond"),
            Self::Bullet => write!(f, "bullet"),
            Self::FixedRateMortgage => write!(f, "fixed_rate_mortgage"),
            Self::NonAccumulatingInterest => write!(f, "non_accumulating_interest"),
        }
    }
}

/// A repayment schedule of any supported kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentSchedule {
    /// See [`CouponBond`].
    CouponBond(CouponBond),
    /// See [`Bullet`].
    Bullet(Bullet),
    /// See [`FixedRateMortgage`].
    FixedRateMortgage(FixedRateMortgage),
    /// See [`NonAccumulatingInterest`].
    NonAccumulatingInterest(NonAccumulatingInterest),
}

impl From<CouponBond> for PaymentSchedule {
    fn from(schedule: CouponBond) -> Self {
        Self::CouponBond(schedule)
    }
}

impl From<Bullet> for PaymentSchedule {
    fn from(schedule: Bullet) -> Self {
        Self::Bullet(schedule)
    }
}

impl From<FixedRateMortgage> for PaymentSchedule {
    fn from(schedule: FixedRateMortgage) -> Self {
        Self::FixedRateMortgage(schedule)
    }
}

impl From<NonAccumulatingInterest> for PaymentSchedule {
    fn from(schedule: NonAccumulatingInterest) -> Self {
        Self::NonAccumulatingInterest(schedule)
    }
}

impl PaymentSchedule {
    /// The kind of loan this schedule describes.
    #[must_use]
    pub const fn kind(&self) -> LoanKind {
        match self {
            Self::CouponBond(_) => LoanKind::CouponBond,
            Self::Bullet(_) => LoanKind::Bullet,
            Self::FixedRateMortgage(_) => LoanKind::FixedRateMortgage,
            Self::NonAccumulatingInterest(_) => LoanKind::NonAccumulatingInterest,
        }
    }

    /// Phase bookkeeping shared by every kind.
    #[must_use]
    pub const fn phases(&self) -> &PhaseState {
        match self {
            Self::CouponBond(s) => s.phases(),
            Self::Bullet(s) => s.phases(),
            Self::FixedRateMortgage(s) => s.phases(),
            Self::NonAccumulatingInterest(s) => s.phases(),
        }
    }

    /// Installments still to be paid.
    #[must_use]
    pub const fn phases_remaining(&self) -> u32 {
        self.phases().phases_remaining()
    }

    /// Installments since inception, or since the last debt edit.
    #[must_use]
    pub const fn total_phases(&self) -> u32 {
        self.phases().total_phases()
    }

    /// Principal transferred to the borrower, including extensions.
    #[must_use]
    pub const fn total_principal(&self) -> f64 {
        self.phases().total_principal()
    }

    /// True once no installment remains.
    #[must_use]
    pub const fn is_fully_repaid(&self) -> bool {
        self.phases().is_fully_repaid()
    }

    /// True when exactly one installment remains.
    #[must_use]
    pub const fn is_last_phase(&self) -> bool {
        self.phases().is_last_phase()
    }

    /// When installments fall due.
    #[must_use]
    pub const fn cadence(&self) -> &Cadence {
        match self {
            Self::CouponBond(s) => s.cadence(),
            Self::Bullet(s) => s.cadence(),
            Self::FixedRateMortgage(s) => s.cadence(),
            Self::NonAccumulatingInterest(s) => s.cadence(),
        }
    }

    /// The amount that would settle the loan if paid immediately.
    #[must_use]
    pub const fn debt_now(&self) -> f64 {
        match self {
            Self::CouponBond(s) => s.debt_now(),
            Self::Bullet(s) => s.debt_now(),
            Self::FixedRateMortgage(s) => s.debt_now(),
            Self::NonAccumulatingInterest(s) => s.debt_now(),
        }
    }

    /// The installment due at the current phase (zero once repaid).
    #[must_use]
    pub fn next_installment_due(&self) -> f64 {
        match self {
            Self::CouponBond(s) => s.next_installment_due(),
            Self::Bullet(s) => s.next_installment_due(),
            Self::FixedRateMortgage(s) => s.next_installment_due(),
            Self::NonAccumulatingInterest(s) => s.next_installment_due(),
        }
    }

    /// Sum of all installments still owed.
    #[must_use]
    pub fn face_value(&self) -> f64 {
        match self {
            Self::CouponBond(s) => s.face_value(),
            Self::Bullet(s) => s.face_value(),
            Self::FixedRateMortgage(s) => s.face_value(),
            Self::NonAccumulatingInterest(s) => s.face_value(),
        }
    }

    /// `debt_now` as it will be once the next installment is paid.
    #[must_use]
    pub fn debt_in_next_phase(&self) -> f64 {
        match self {
            Self::CouponBond(s) => s.debt_in_next_phase(),
            Self::Bullet(s) => s.debt_in_next_phase(),
            Self::FixedRateMortgage(s) => s.debt_in_next_phase(),
            Self::NonAccumulatingInterest(s) => s.debt_in_next_phase(),
        }
    }

    /// The multiplier `r` such that `(1 + r) · principal` is the face value
    /// at inception (or at the last re-basing).
    #[must_use]
    pub fn overall_interest(&self) -> f64 {
        match self {
            Self::CouponBond(s) => s.overall_interest(),
            Self::Bullet(s) => s.overall_interest(),
            Self::FixedRateMortgage(s) => s.overall_interest(),
            Self::NonAccumulatingInterest(s) => s.overall_interest(),
        }
    }

    /// Record a paid installment.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::FullyRepaid` if no phase remains.
    pub fn advance_phase(&mut self) -> Result<(), ScheduleError> {
        match self {
            Self::CouponBond(s) => s.advance_phase(),
            Self::Bullet(s) => s.advance_phase(),
            Self::FixedRateMortgage(s) => s.advance_phase(),
            Self::NonAccumulatingInterest(s) => s.advance_phase(),
        }
    }

    /// Increase the debt by `amount` and re-base over the remaining phases.
    /// Non-positive amounts are ignored.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` for a positive amount on a repaid schedule.
    pub fn extend(&mut self, amount: f64) -> Result<(), ScheduleError> {
        match self {
            Self::CouponBond(s) => s.extend(amount),
            Self::Bullet(s) => s.extend(amount),
            Self::FixedRateMortgage(s) => s.extend(amount),
            Self::NonAccumulatingInterest(s) => s.extend(amount),
        }
    }

    /// Decrease the debt by at most `amount` and re-base over the remaining
    /// phases. Non-positive amounts are ignored.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` for a positive amount on a repaid schedule.
    pub fn reduce(&mut self, amount: f64) -> Result<(), ScheduleError> {
        match self {
            Self::CouponBond(s) => s.reduce(amount),
            Self::Bullet(s) => s.reduce(amount),
            Self::FixedRateMortgage(s) => s.reduce(amount),
            Self::NonAccumulatingInterest(s) => s.reduce(amount),
        }
    }

    /// Move the debt to `value` via [`extend`](Self::extend) or
    /// [`reduce`](Self::reduce). Values at or below zero settle the schedule.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` if the debt changes on a repaid schedule.
    pub fn set_debt_value(&mut self, value: f64) -> Result<(), ScheduleError> {
        let current = self.debt_now();
        let target = value.max(0.0);
        if target > current {
            self.extend(target - current)
        } else if target < current {
            self.reduce(current - target)
        } else {
            Ok(())
        }
    }
}
