//! Phase bookkeeping shared by every repayment schedule.

use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ValidationError};

/// Remaining/total phase counts plus the principal recorded so far.
///
/// Each schedule variant embeds one of these and layers its own debt
/// evolution on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseState {
    phases_remaining: u32,
    total_phases: u32,
    principal: f64,
}

impl PhaseState {
    /// Creates phase state for a fresh schedule.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NonPositivePrincipal` for a non-positive or
    /// non-finite principal and `ValidationError::ZeroPhases` for `phases == 0`.
    pub fn new(principal: f64, phases: u32) -> Result<Self, ValidationError> {
        if !principal.is_finite() || principal <= 0.0 {
            return Err(ValidationError::NonPositivePrincipal { value: principal });
        }
        if phases == 0 {
            return Err(ValidationError::ZeroPhases);
        }
        Ok(Self {
            phases_remaining: phases,
            total_phases: phases,
            principal,
        })
    }

    /// Phases still to be paid.
    #[must_use]
    pub const fn phases_remaining(&self) -> u32 {
        self.phases_remaining
    }

    /// Total phases since inception, or since the last debt edit.
    #[must_use]
    pub const fn total_phases(&self) -> u32 {
        self.total_phases
    }

    /// Principal recorded so far, including extensions.
    #[must_use]
    pub const fn total_principal(&self) -> f64 {
        self.principal
    }

    /// True once no phase remains.
    #[must_use]
    pub const fn is_fully_repaid(&self) -> bool {
        self.phases_remaining == 0
    }

    /// True when exactly one phase remains.
    #[must_use]
    pub const fn is_last_phase(&self) -> bool {
        self.phases_remaining == 1
    }

    /// Fails unless at least one phase remains.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` naming `operation`.
    pub fn ensure_outstanding(&self, operation: &'static str) -> Result<(), ScheduleError> {
        if self.is_fully_repaid() {
            return Err(ScheduleError::FullyRepaid { operation });
        }
        Ok(())
    }

    /// Step to the next repayment phase.
    ///
    /// # Errors
    ///
    /// `ScheduleError::FullyRepaid` if no phase remains.
    pub fn advance(&mut self) -> Result<(), ScheduleError> {
        self.ensure_outstanding("advance repayment phase")?;
        self.phases_remaining -= 1;
        Ok(())
    }

    /// Adjust the recorded principal; the result never drops below zero.
    pub fn increment_principal(&mut self, delta: f64) {
        self.principal = (self.principal + delta).max(0.0);
    }

    /// Treat the remaining phases as a fresh schedule of that length.
    pub fn rebase(&mut self) {
        self.total_phases = self.phases_remaining;
    }

    /// Mark the schedule as fully repaid.
    pub fn settle(&mut self) {
        self.phases_remaining = 0;
    }
}
