//! Collaborator traits for loan contracts.
//!
//! The engine never moves cash or edits balance sheets itself. These traits
//! define the contract it has with the surrounding system:
//! - settlement channels perform atomic two-party cash transfers
//! - borrowers and lenders track membership and receive notifications
//! - default policies decide what happens after a missed installment

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contract::LoanId;
use crate::error::SettlementError;
use crate::schedule::LoanKind;

/// Stable identifier for a borrower or lender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(Uuid);

impl PartyId {
    /// Creates a new random party ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PartyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Atomic cash movement between one borrower and one lender.
pub trait SettlementChannel: Send + Sync {
    /// Move `amount` from the borrower to the lender.
    fn transfer(&self, amount: f64) -> Result<(), SettlementError>;

    /// Signed transfer: positive amounts flow borrower to lender, negative
    /// amounts flow lender to borrower.
    fn bidirectional_transfer(&self, amount: f64) -> Result<(), SettlementError>;
}

/// Builds settlement channels for a borrower/lender pair.
pub trait SettlementFactory: Send + Sync {
    /// Create a direct channel between `borrower` and `lender`.
    fn direct(&self, borrower: PartyId, lender: PartyId) -> Box<dyn SettlementChannel>;
}

/// The party that receives loan cash.
pub trait Borrower: Send + Sync {
    /// Stable id of this borrower.
    fn party_id(&self) -> PartyId;

    /// Record the loan as a liability.
    fn add_liability(&self, loan: LoanId);

    /// Remove the loan from the liabilities.
    fn remove_liability(&self, loan: LoanId);

    /// Notification: principal has been received from `lender`.
    fn register_new_loan_transfer(&self, principal: f64, lender: PartyId, interest_rate: f64);

    /// Notification: an installment has been paid to `lender`.
    fn register_new_loan_repayment_installment(
        &self,
        amount: f64,
        lender: PartyId,
        interest_rate: f64,
    );
}

/// The party that advances loan cash.
pub trait Lender: Send + Sync {
    /// Stable id of this lender.
    fn party_id(&self) -> PartyId;

    /// Record the loan as an asset.
    fn add_asset(&self, loan: LoanId);

    /// Remove the loan from the assets.
    fn remove_asset(&self, loan: LoanId);
}

/// Details of a missed installment handed to a [`DefaultPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultNotice {
    /// The defaulted loan.
    pub loan_id: LoanId,
    /// Its kind.
    pub kind: LoanKind,
    /// The party that missed the installment.
    pub borrower: PartyId,
    /// The party that was not paid.
    pub lender: PartyId,
    /// The installment that could not be paid.
    pub amount_due: f64,
    /// Portion of the installment that was paid before the failure.
    pub amount_already_paid: f64,
    /// Outstanding debt at the time of the default.
    pub debt_now: f64,
}

/// Result of applying a default policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultOutcome {
    /// The contract continues at its usual cadence.
    Resolved,
    /// The contract stays pending until handled externally.
    Unresolved,
}

impl DefaultOutcome {
    /// True if installments continue at the usual cadence.
    #[must_use]
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved)
    }
}

/// Strategy invoked once per missed installment.
pub trait DefaultPolicy: Send {
    /// Decide whether the contract keeps running after `notice`.
    fn resolve(&mut self, notice: &DefaultNotice) -> DefaultOutcome;
}
