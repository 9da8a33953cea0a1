//! # Repayment Engine - Loan contracts and repayment schedules
//!
//! The repayment engine models loans between a borrower and a lender in a
//! discrete-time economic simulation. Each loan pairs a repayment schedule
//! with a settlement channel and reacts to installment callbacks.
//!
//! ## Core Concepts
//!
//! - **Schedule**: Phase accounting plus one of four repayment rules
//!   (coupon bond, bullet, fixed rate mortgage, non-accumulating interest)
//! - **Contract**: Binds a schedule to counterparties, moves cash and
//!   consults a default policy when the borrower cannot pay
//! - **Wakeup**: The next callback a contract asks for; no global scheduler
//! - **Book**: A deterministic driver that queues wake-ups on a simulated clock
//!
//! ## Usage
//!
//! ```rust,ignore
//! use repayment_engine::{Cadence, CashLedger, BalanceSheet, CouponBond, LoanBook, LoanContract};
//!
//! let ledger = CashLedger::new();
//! let firm = Arc::new(BalanceSheet::new("firm"));
//! let bank = Arc::new(BalanceSheet::new("bank"));
//! ledger.open_account(firm.id(), 0.0)?;
//! ledger.open_account(bank.id(), 10_000.0)?;
//!
//! let mut book = LoanBook::new(Utc::now());
//! let loan = book.originate(
//!     LoanContract::builder()
//!         .borrower(&firm)
//!         .lender(&bank)
//!         .schedule(CouponBond::new(1000.0, 0.03, 5, Cadence::daily())?)
//!         .settlement(Arc::new(ledger.clone())),
//! )?;
//! let events = book.run_until(Utc::now() + Duration::days(10))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod cadence;
pub mod error;
pub mod schedule;

// Contracts and collaborators
pub mod contract;
pub mod counterparty;
pub mod snapshot;
pub mod visitor;

// Simulation driver
pub mod book;

// Re-export primary types at crate root for convenience
pub use book::{InstallmentEvent, LoanBook};
pub use cadence::{Cadence, EventOrder, Wakeup};
pub use contract::{InstallmentOutcome, LoanContract, LoanContractBuilder, LoanId};
pub use counterparty::{
    BalanceSheet, Borrower, CashLedger, DefaultNotice, DefaultOutcome, DefaultPolicy,
    DirectSettlement, Forbearance, LeavePending, Lender, PartyId, SettlementChannel,
    SettlementFactory,
};
pub use error::{LoanError, LoanResult, ScheduleError, SettlementError, ValidationError};
pub use schedule::{
    Bullet, CouponBond, FixedRateMortgage, LoanKind, NonAccumulatingInterest, PaymentSchedule,
    PhaseState, ScheduleTerms, MIN_ANNUITY_RATE,
};
pub use snapshot::LoanSnapshot;
pub use visitor::LoanVisitor;
