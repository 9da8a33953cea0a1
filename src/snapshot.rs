//! Serializable contract snapshots.
//!
//! A snapshot captures everything observable about a contract at one point
//! in time. Serde already provides JSON; the helpers here keep error mapping
//! consistent with the rest of the crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contract::LoanId;
use crate::counterparty::PartyId;
use crate::error::LoanError;
use crate::schedule::{LoanKind, PaymentSchedule};

/// Read-only view of a [`LoanContract`](crate::LoanContract).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSnapshot {
    /// Contract id.
    pub id: LoanId,
    /// Loan kind.
    pub kind: LoanKind,
    /// Borrower, absent once terminated.
    pub borrower: Option<PartyId>,
    /// Lender, absent once terminated.
    pub lender: Option<PartyId>,
    /// True once the contract has ended.
    pub terminated: bool,
    /// Immediate debt.
    pub value: f64,
    /// Sum of pending installments.
    pub face_value: f64,
    /// Installment due at the next callback.
    pub next_installment: f64,
    /// Installments received so far.
    pub total_payments_made: f64,
    /// Origination time.
    pub originated_at: DateTime<Utc>,
    /// Expected expiry if every payment succeeds.
    pub expires_at: DateTime<Utc>,
    /// Full schedule state.
    pub schedule: PaymentSchedule,
}

/// Serialize a snapshot to pretty JSON.
///
/// # Errors
///
/// `LoanError::Internal` if serialization fails.
pub fn to_json_pretty(snapshot: &LoanSnapshot) -> Result<String, LoanError> {
    serde_json::to_string_pretty(snapshot)
        .map_err(|e| LoanError::internal(format!("serialize snapshot: {e}")))
}

/// Deserialize a snapshot from JSON.
///
/// # Errors
///
/// `LoanError::Internal` for malformed input.
pub fn from_json(s: &str) -> Result<LoanSnapshot, LoanError> {
    serde_json::from_str::<LoanSnapshot>(s)
        .map_err(|e| LoanError::internal(format!("deserialize snapshot: {e}")))
}
