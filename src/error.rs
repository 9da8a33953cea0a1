//! Error types for the repayment engine.
//!
//! All errors are strongly typed using thiserror. Construction problems,
//! schedule state violations and failed cash movements each have their own
//! enum; `LoanError` ties them together for contract-level operations.

use thiserror::Error;

use crate::contract::LoanId;
use crate::counterparty::PartyId;

/// Validation errors raised before any side effect takes place.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Principal is zero, negative or not finite.
    #[error("Principal must be positive and finite, got {value}")]
    NonPositivePrincipal {
        /// The rejected principal.
        value: f64,
    },

    /// A rate is negative or not finite.
    #[error("Rate '{field}' must be non-negative and finite, got {value}")]
    InvalidRate {
        /// Name of the offending parameter.
        field: &'static str,
        /// The rejected rate.
        value: f64,
    },

    /// The annuity formula needs a strictly positive rate.
    #[error("Mortgage rate must be strictly positive, got {value}")]
    NonPositiveMortgageRate {
        /// The rejected rate.
        value: f64,
    },

    /// A schedule needs at least one phase.
    #[error("Number of repayment phases must be positive")]
    ZeroPhases,

    /// Cadence interval is zero or negative.
    #[error("Cadence interval must be positive, got {seconds}s")]
    NonPositiveInterval {
        /// The rejected interval, in whole seconds.
        seconds: i64,
    },

    /// Cadence interval has a sub-second remainder.
    #[error("Cadence interval must be a whole number of seconds, got {millis}ms")]
    FractionalInterval {
        /// The rejected interval, in milliseconds.
        millis: i64,
    },

    /// A builder was asked to finish without a required field.
    #[error("Required field '{field}' is missing")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },
}

/// Schedule state violations.
///
/// These indicate a caller programming error: the schedule has already been
/// driven to full repayment and cannot be advanced or edited further.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// No phase remains.
    #[error("Cannot {operation}: repayment schedule is fully repaid")]
    FullyRepaid {
        /// The operation that was attempted.
        operation: &'static str,
    },
}

/// Failures reported by a settlement channel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettlementError {
    /// The paying party lacks the cash.
    #[error("Insufficient funds: party {party} holds {available}, needs {requested}")]
    InsufficientFunds {
        /// The paying party.
        party: PartyId,
        /// Amount the transfer needed.
        requested: f64,
        /// Amount the party held.
        available: f64,
    },

    /// One side of the transfer has no account.
    #[error("No cash account registered for party {0}")]
    UnknownAccount(PartyId),

    /// Any other backend failure.
    #[error("Settlement backend error: {0}")]
    Backend(String),
}

impl SettlementError {
    /// Returns true if the transfer failed because the payer lacked cash.
    #[must_use]
    pub const fn is_insufficient_funds(&self) -> bool {
        matches!(self, Self::InsufficientFunds { .. })
    }
}

/// Top-level error type for loan contract operations.
#[derive(Debug, Error)]
pub enum LoanError {
    /// Invalid construction parameters.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Operation on a fully repaid schedule.
    #[error("Invalid state: {0}")]
    InvalidState(#[from] ScheduleError),

    /// Origination or extension could not be funded; nothing changed.
    #[error("Lender cannot fund {requested}: {source}")]
    LenderInsufficientFunds {
        /// Amount the lender had to advance.
        requested: f64,
        /// The settlement failure.
        #[source]
        source: SettlementError,
    },

    /// The contract was terminated earlier.
    #[error("Loan {id} has already been terminated")]
    AlreadyTerminated {
        /// The terminated loan.
        id: LoanId,
    },

    /// No contract with this id in the book.
    #[error("Loan {id} not found")]
    LoanNotFound {
        /// The unknown loan.
        id: LoanId,
    },

    /// The contract is not pending; its next installment is already queued.
    #[error("Loan {id} already has an installment callback queued")]
    CallbackQueued {
        /// The loan that is not pending.
        id: LoanId,
    },

    /// Unexpected failure, such as a serialization error.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl LoanError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a schedule state violation.
    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    /// Returns true if the lender could not fund a transfer.
    #[must_use]
    pub const fn is_insufficient_funds(&self) -> bool {
        matches!(self, Self::LenderInsufficientFunds { .. })
    }

    /// Returns true if the contract was already terminated.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        matches!(self, Self::AlreadyTerminated { .. })
    }

    /// Returns true if retrying the same operation later may succeed.
    ///
    /// Only funding failures qualify: the lender's cash position can change
    /// between periods, everything else is deterministic.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::LenderInsufficientFunds { source, .. } => source.is_insufficient_funds(),
            _ => false,
        }
    }
}

/// Result type alias for loan operations.
pub type LoanResult<T> = Result<T, LoanError>;
