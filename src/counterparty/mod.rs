//! Counterparties of a loan contract: settlement, parties and default policies.
//!
//! Traits live in `traits`; `memory` and `policies` provide reference
//! implementations.

mod memory;
mod policies;
mod traits;

pub use memory::{BalanceSheet, CashLedger, DirectSettlement, LoanTransferRecord, RepaymentRecord};
pub use policies::{Forbearance, LeavePending};
pub use traits::{
    Borrower, DefaultNotice, DefaultOutcome, DefaultPolicy, Lender, PartyId, SettlementChannel,
    SettlementFactory,
};
