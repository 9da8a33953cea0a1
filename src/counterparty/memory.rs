//! In-memory collaborators.
//!
//! Thread-safe reference implementations of the settlement and party traits,
//! intended for embedded usage, tests and small simulations.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::{Deserialize, Serialize};

use crate::contract::LoanId;
use crate::error::SettlementError;

use super::traits::{Borrower, Lender, PartyId, SettlementChannel, SettlementFactory};

fn lock_err(context: &'static str) -> SettlementError {
    SettlementError::Backend(format!("poisoned lock: {context}"))
}

type Accounts = Arc<RwLock<HashMap<PartyId, f64>>>;

/// Cash balances keyed by party.
///
/// Cloning a ledger yields another handle onto the same accounts.
#[derive(Debug, Clone, Default)]
pub struct CashLedger {
    accounts: Accounts,
}

impl CashLedger {
    /// An empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reset) an account with the given balance.
    ///
    /// # Errors
    ///
    /// `SettlementError::Backend` if the ledger lock is poisoned.
    pub fn open_account(&self, party: PartyId, balance: f64) -> Result<(), SettlementError> {
        let mut accounts = self.accounts.write().map_err(|_| lock_err("open_account"))?;
        accounts.insert(party, balance);
        Ok(())
    }

    /// Add cash to an existing account.
    ///
    /// # Errors
    ///
    /// `SettlementError::UnknownAccount` if `party` has no account.
    pub fn deposit(&self, party: PartyId, amount: f64) -> Result<(), SettlementError> {
        let mut accounts = self.accounts.write().map_err(|_| lock_err("deposit"))?;
        let balance = accounts
            .get_mut(&party)
            .ok_or(SettlementError::UnknownAccount(party))?;
        *balance += amount;
        Ok(())
    }

    /// Cash held by `party`.
    ///
    /// # Errors
    ///
    /// `SettlementError::UnknownAccount` if `party` has no account.
    pub fn balance(&self, party: PartyId) -> Result<f64, SettlementError> {
        let accounts = self.accounts.read().map_err(|_| lock_err("balance"))?;
        accounts
            .get(&party)
            .copied()
            .ok_or(SettlementError::UnknownAccount(party))
    }

    /// Sum of all balances. Settlement never creates or destroys cash.
    ///
    /// # Errors
    ///
    /// `SettlementError::Backend` if the ledger lock is poisoned.
    pub fn total_cash(&self) -> Result<f64, SettlementError> {
        let accounts = self.accounts.read().map_err(|_| lock_err("total_cash"))?;
        Ok(accounts.values().sum())
    }
}

impl SettlementFactory for CashLedger {
    fn direct(&self, borrower: PartyId, lender: PartyId) -> Box<dyn SettlementChannel> {
        Box::new(DirectSettlement {
            accounts: Arc::clone(&self.accounts),
            borrower,
            lender,
        })
    }
}

/// Two-party channel over a [`CashLedger`].
#[derive(Debug)]
pub struct DirectSettlement {
    accounts: Accounts,
    borrower: PartyId,
    lender: PartyId,
}

impl DirectSettlement {
    fn move_cash(&self, from: PartyId, to: PartyId, amount: f64) -> Result<(), SettlementError> {
        let mut accounts = self.accounts.write().map_err(|_| lock_err("transfer"))?;
        let available = *accounts.get(&from).ok_or(SettlementError::UnknownAccount(from))?;
        if !accounts.contains_key(&to) {
            return Err(SettlementError::UnknownAccount(to));
        }
        if available < amount {
            return Err(SettlementError::InsufficientFunds {
                party: from,
                requested: amount,
                available,
            });
        }
        if let Some(balance) = accounts.get_mut(&from) {
            *balance -= amount;
        }
        if let Some(balance) = accounts.get_mut(&to) {
            *balance += amount;
        }
        Ok(())
    }
}

impl SettlementChannel for DirectSettlement {
    fn transfer(&self, amount: f64) -> Result<(), SettlementError> {
        if amount < 0.0 {
            return Err(SettlementError::Backend(format!(
                "transfer amount must be non-negative, got {amount}"
            )));
        }
        self.move_cash(self.borrower, self.lender, amount)
    }

    fn bidirectional_transfer(&self, amount: f64) -> Result<(), SettlementError> {
        if amount >= 0.0 {
            self.move_cash(self.borrower, self.lender, amount)
        } else {
            self.move_cash(self.lender, self.borrower, -amount)
        }
    }
}

/// A principal received by a borrower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTransferRecord {
    /// Cash received.
    pub principal: f64,
    /// Who advanced it.
    pub lender: PartyId,
    /// Overall interest of the loan.
    pub interest_rate: f64,
}

/// An installment paid by a borrower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentRecord {
    /// Cash paid.
    pub amount: f64,
    /// Who received it.
    pub lender: PartyId,
    /// Overall interest of the loan.
    pub interest_rate: f64,
}

#[derive(Debug, Default)]
struct SheetState {
    assets: BTreeSet<LoanId>,
    liabilities: BTreeSet<LoanId>,
    transfers: Vec<LoanTransferRecord>,
    repayments: Vec<RepaymentRecord>,
}

/// A party that records its loan memberships and notifications.
///
/// Implements both [`Borrower`] and [`Lender`].
#[derive(Debug)]
pub struct BalanceSheet {
    id: PartyId,
    name: String,
    state: Mutex<SheetState>,
}

impl BalanceSheet {
    /// A sheet with a fresh id and no loans.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PartyId::new(),
            name: name.into(),
            state: Mutex::new(SheetState::default()),
        }
    }

    /// This party's id.
    #[must_use]
    pub const fn id(&self) -> PartyId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    // A poisoned sheet is still readable; membership sets stay consistent
    // because every mutation is a single insert or remove.
    fn state(&self) -> MutexGuard<'_, SheetState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Loans held as assets.
    pub fn assets(&self) -> Vec<LoanId> {
        self.state().assets.iter().copied().collect()
    }

    /// Loans owed as liabilities.
    pub fn liabilities(&self) -> Vec<LoanId> {
        self.state().liabilities.iter().copied().collect()
    }

    /// Principal receipts, oldest first.
    pub fn loan_transfers(&self) -> Vec<LoanTransferRecord> {
        self.state().transfers.clone()
    }

    /// Installments paid, oldest first.
    pub fn repayments(&self) -> Vec<RepaymentRecord> {
        self.state().repayments.clone()
    }
}

impl Borrower for BalanceSheet {
    fn party_id(&self) -> PartyId {
        self.id
    }

    fn add_liability(&self, loan: LoanId) {
        self.state().liabilities.insert(loan);
    }

    fn remove_liability(&self, loan: LoanId) {
        self.state().liabilities.remove(&loan);
    }

    fn register_new_loan_transfer(&self, principal: f64, lender: PartyId, interest_rate: f64) {
        self.state().transfers.push(LoanTransferRecord {
            principal,
            lender,
            interest_rate,
        });
    }

    fn register_new_loan_repayment_installment(
        &self,
        amount: f64,
        lender: PartyId,
        interest_rate: f64,
    ) {
        self.state().repayments.push(RepaymentRecord {
            amount,
            lender,
            interest_rate,
        });
    }
}

impl Lender for BalanceSheet {
    fn party_id(&self) -> PartyId {
        self.id
    }

    fn add_asset(&self, loan: LoanId) {
        self.state().assets.insert(loan);
    }

    fn remove_asset(&self, loan: LoanId) {
        self.state().assets.remove(&loan);
    }
}
