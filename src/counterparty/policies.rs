//! Built-in default policies.

use super::traits::{DefaultNotice, DefaultOutcome, DefaultPolicy};

/// Leave every missed installment unresolved.
///
/// The contract stops progressing and waits for external liquidation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeavePending;

impl DefaultPolicy for LeavePending {
    fn resolve(&mut self, notice: &DefaultNotice) -> DefaultOutcome {
        log::warn!(
            "loan {} left pending after borrower {} missed {:.4}",
            notice.loan_id,
            notice.borrower,
            notice.amount_due
        );
        DefaultOutcome::Unresolved
    }
}

/// Lender forbearance: tolerate missed installments, optionally up to a limit.
///
/// A forgiven installment is not retried; the schedule simply continues at
/// its usual cadence.
#[derive(Debug, Clone, Default)]
pub struct Forbearance {
    max_misses: Option<u32>,
    misses: u32,
    forgiven: f64,
}

impl Forbearance {
    /// Forgive every missed installment.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_misses: None,
            misses: 0,
            forgiven: 0.0,
        }
    }

    /// Forgive at most `max_misses` installments over the life of the loan.
    #[must_use]
    pub const fn up_to(max_misses: u32) -> Self {
        Self {
            max_misses: Some(max_misses),
            misses: 0,
            forgiven: 0.0,
        }
    }

    /// Missed installments seen so far.
    #[must_use]
    pub const fn misses(&self) -> u32 {
        self.misses
    }

    /// Total amount of installments forgiven.
    #[must_use]
    pub const fn forgiven(&self) -> f64 {
        self.forgiven
    }
}

impl DefaultPolicy for Forbearance {
    fn resolve(&mut self, notice: &DefaultNotice) -> DefaultOutcome {
        self.misses = self.misses.saturating_add(1);
        if self.max_misses.is_some_and(|max| self.misses > max) {
            log::warn!(
                "loan {}: forbearance exhausted after {} missed installments",
                notice.loan_id,
                self.misses
            );
            return DefaultOutcome::Unresolved;
        }
        self.forgiven += notice.amount_due - notice.amount_already_paid;
        log::debug!(
            "loan {}: forgiving installment of {:.4} (miss {})",
            notice.loan_id,
            notice.amount_due,
            self.misses
        );
        DefaultOutcome::Resolved
    }
}
