//! Fixed rate mortgage (annuity) repayment.
//!
//! For principal `P`, per-installment rate `r` and `N` installments the fixed
//! installment is
//!
//! ```text
//! c = P · r · (1 + r)^N / ((1 + r)^N - 1)
//! ```
//!
//! and the outstanding balance evolves as `debt' = debt · (1 + r) - c`. The
//! formula is singular at `r = 0`; near-zero rates belong to
//! [`NonAccumulatingInterest`](super::NonAccumulatingInterest).

use serde::{Deserialize, Serialize};

use crate::cadence::Cadence;
use crate::error::{ScheduleError, ValidationError};

use super::phase::PhaseState;
use super::{check_rate, is_positive};

/// Fixed rate mortgage schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedRateMortgage {
    phases: PhaseState,
    rate: f64,
    installment: f64,
    debt_now: f64,
    cadence: Cadence,
}

impl FixedRateMortgage {
    /// Create a mortgage repaying `principal` in `installments` equal payments.
    ///
    /// # Errors
    ///
    /// - `ValidationError::NonPositiveMortgageRate` if `rate <= 0`
    /// - `ValidationError::NonPositivePrincipal`, `ValidationError::ZeroPhases`
    ///   or `ValidationError::InvalidRate` for other bad parameters
    /// - cadence errors from [`Cadence::validate`]
    pub fn new(
        principal: f64,
        rate: f64,
        installments: u32,
        cadence: Cadence,
    ) -> Result<Self, ValidationError> {
        let phases = PhaseState::new(principal, installments)?;
        check_rate("rate", rate)?;
        if rate <= 0.0 {
            return Err(ValidationError::NonPositiveMortgageRate { value: rate });
        }
        cadence.validate()?;
        Ok(Self {
            installment: annuity_installment(principal, rate, installments),
            phases,
            rate,
            debt_now: principal,
            cadence,
        })
    }

    /// Total anticipated repayment of a fresh mortgage.
    #[must_use]
    pub fn total_repayment_due_for(principal: f64, rate: f64, installments: u32) -> f64 {
        rate * f64::from(installments) * principal
            / (1.0 - (1.0 + rate).powf(-f64::from(installments)))
    }

    /// Phase bookkeeping.
    #[must_use]
    pub const fn phases(&self) -> &PhaseState {
        &self.phases
    }

    /// Interest rate per installment.
    #[must_use]
    pub const fn rate(&self) -> f64 {
        self.rate
    }

    /// The current fixed installment.
    #[must_use]
    pub const fn fixed_installment(&self) -> f64 {
        self.installment
    }

    /// When installments fall due.
    #[must_use]
    pub const fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    /// Outstanding balance.
    #[must_use]
    pub const fn debt_now(&self) -> f64 {
        self.debt_now
    }

    /// The fixed installment, or zero once repaid.
    #[must_use]
    pub fn next_installment_due(&self) -> f64 {
        if self.phases.is_fully_repaid() {
            0.0
        } else {
            self.installment
        }
    }

    /// Sum of the remaining installments.
    #[must_use]
    pub fn face_value(&self) -> f64 {
        f64::from(self.phases.phases_remaining()) * self.installment
    }

    /// Balance after the next installment has been paid.
    #[must_use]
    pub fn debt_in_next_phase(&self) -> f64 {
        if self.phases.phases_remaining() <= 1 {
            return 0.0;
        }
        (self.debt_now * (1.0 + self.rate) - self.installment).max(0.0)
    }

    /// `(total installments · c) / principal - 1`.
    #[must_use]
    pub fn overall_interest(&self) -> f64 {
        f64::from(self.phases.total_phases()) * self.installment / self.phases.total_principal()
            - 1.0
    }

    /// Record a paid installment.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` once every installment has been paid.
    pub fn advance_phase(&mut self) -> Result<(), ScheduleError> {
        self.phases.ensure_outstanding("advance mortgage")?;
        // Must read the phase count before the base decrement.
        self.debt_now = self.debt_in_next_phase();
        self.phases.advance()
    }

    /// Top up the balance and re-amortize it over the remaining installments.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` for a positive amount on a repaid mortgage.
    pub fn extend(&mut self, amount: f64) -> Result<(), ScheduleError> {
        if !is_positive(amount) {
            return Ok(());
        }
        self.phases.ensure_outstanding("extend mortgage")?;
        self.increment(amount);
        Ok(())
    }

    /// Write down the balance and re-amortize it over the remaining installments.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` for a positive amount on a repaid mortgage.
    pub fn reduce(&mut self, amount: f64) -> Result<(), ScheduleError> {
        if !is_positive(amount) {
            return Ok(());
        }
        self.phases.ensure_outstanding("reduce mortgage")?;
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
            self.installment = 0.0;
        } else {
            self.phases.rebase();
            self.installment =
                annuity_installment(self.debt_now, self.rate, self.phases.total_phases());
        }
    }
}

// Discount form; `(1 + r)^N` itself overflows for long schedules.
fn annuity_installment(balance: f64, rate: f64, installments: u32) -> f64 {
    balance * rate / (1.0 - (1.0 + rate).powf(-f64::from(installments)))
}
