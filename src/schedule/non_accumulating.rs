//! Repayment with non-accumulating interest.
//!
//! The borrower repays principal `P` plus overall interest `r · P` in equal
//! installments. Unlike a mortgage the total does not grow with the number of
//! installments.

use serde::{Deserialize, Serialize};

use crate::cadence::Cadence;
use crate::error::{ScheduleError, ValidationError};

use super::phase::PhaseState;
use super::{check_rate, is_positive};

/// Equal-installment schedule with a single overall interest rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonAccumulatingInterest {
    phases: PhaseState,
    overall_rate: f64,
    installment: f64,
    debt_now: f64,
    cadence: Cadence,
}

impl NonAccumulatingInterest {
    /// Create a schedule repaying `(1 + overall_rate) · principal` in
    /// `installments` equal parts.
    ///
    /// # Errors
    ///
    /// - `ValidationError::NonPositivePrincipal` or `ValidationError::ZeroPhases`
    ///   for an empty schedule
    /// - `ValidationError::InvalidRate` for a negative or non-finite rate
    /// - cadence errors from [`Cadence::validate`]
    pub fn new(
        principal: f64,
        overall_rate: f64,
        installments: u32,
        cadence: Cadence,
    ) -> Result<Self, ValidationError> {
        let phases = PhaseState::new(principal, installments)?;
        check_rate("overall_rate", overall_rate)?;
        cadence.validate()?;
        let debt_now = Self::total_repayment_due_for(principal, overall_rate);
        Ok(Self {
            installment: debt_now / f64::from(installments),
            phases,
            overall_rate,
            debt_now,
            cadence,
        })
    }

    /// Total repayment, `(1 + r) · P`.
    #[must_use]
    pub fn total_repayment_due_for(principal: f64, overall_rate: f64) -> f64 {
        (1.0 + overall_rate) * principal
    }

    /// Phase bookkeeping.
    #[must_use]
    pub const fn phases(&self) -> &PhaseState {
        &self.phases
    }

    /// Interest over the whole schedule.
    #[must_use]
    pub const fn overall_rate(&self) -> f64 {
        self.overall_rate
    }

    /// The current equal installment.
    #[must_use]
    pub const fn fixed_installment(&self) -> f64 {
        self.installment
    }

    /// When installments fall due.
    #[must_use]
    pub const fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    /// Remaining debt, interest included.
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

    /// Remaining debt after the next installment.
    #[must_use]
    pub fn debt_in_next_phase(&self) -> f64 {
        if self.phases.phases_remaining() <= 1 {
            return 0.0;
        }
        (self.debt_now - self.installment).max(0.0)
    }

    /// Same as [`overall_rate`](Self::overall_rate).
    #[must_use]
    pub const fn overall_interest(&self) -> f64 {
        self.overall_rate
    }

    /// Record a paid installment.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` once every installment has been paid.
    pub fn advance_phase(&mut self) -> Result<(), ScheduleError> {
        self.phases.ensure_outstanding("advance non-accumulating schedule")?;
        self.debt_now = self.debt_in_next_phase();
        self.phases.advance()
    }

    /// Add debt. Only the principal share `amount / (1 + r)` is recorded as
    /// principal.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` for a positive amount on a repaid schedule.
    pub fn extend(&mut self, amount: f64) -> Result<(), ScheduleError> {
        if !is_positive(amount) {
            return Ok(());
        }
        self.phases.ensure_outstanding("extend non-accumulating schedule")?;
        self.phases.increment_principal(amount / (1.0 + self.overall_rate));
        self.debt_now += amount;
        self.reprice();
        Ok(())
    }

    /// Write off debt. Recorded principal is not adjusted.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` for a positive amount on a repaid schedule.
    pub fn reduce(&mut self, amount: f64) -> Result<(), ScheduleError> {
        if !is_positive(amount) {
            return Ok(());
        }
        self.phases.ensure_outstanding("reduce non-accumulating schedule")?;
        self.debt_now = (self.debt_now - amount.min(self.debt_now)).max(0.0);
        self.reprice();
        Ok(())
    }

    fn reprice(&mut self) {
        if self.debt_now <= 0.0 {
            self.phases.settle();
            self.installment = 0.0;
        } else {
            self.phases.rebase();
            self.installment = self.debt_now / f64::from(self.phases.total_phases());
        }
    }
}
