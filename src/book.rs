//! Deterministic discrete-time driver for loan contracts.
//!
//! `LoanBook` owns a set of contracts and a queue of pending installment
//! callbacks ordered by `(due time, event order, insertion sequence)`. It is
//! the glue between contracts, which only return [`Wakeup`] instructions, and
//! simulated time.
//!
//! Callbacks are never cancelled. A contract terminated early still receives
//! its queued callback and ignores it. Each contract has at most one callback
//! queued at any time.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use chrono::{DateTime, Utc};

use crate::cadence::{EventOrder, Wakeup};
use crate::contract::{InstallmentOutcome, LoanContract, LoanContractBuilder, LoanId};
use crate::error::{LoanError, LoanResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Pending {
    due: DateTime<Utc>,
    order: EventOrder,
    sequence: u64,
    loan: LoanId,
}

/// One processed installment callback.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentEvent {
    /// Simulated time the callback fired.
    pub at: DateTime<Utc>,
    /// The contract that was called.
    pub loan: LoanId,
    /// What the contract did.
    pub outcome: InstallmentOutcome,
}

/// A collection of loan contracts driven by a simulated clock.
#[derive(Debug)]
pub struct LoanBook {
    now: DateTime<Utc>,
    sequence: u64,
    loans: BTreeMap<LoanId, LoanContract>,
    queue: BinaryHeap<Reverse<Pending>>,
    // Loans with a callback in `queue`.
    queued: BTreeSet<LoanId>,
}

impl LoanBook {
    /// Creates an empty book whose clock starts at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: start,
            sequence: 0,
            loans: BTreeMap::new(),
            queue: BinaryHeap::new(),
            queued: BTreeSet::new(),
        }
    }

    /// Current simulated time.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Originate a contract at the current time and queue its first installment.
    ///
    /// # Errors
    ///
    /// Propagates origination failures from [`LoanContractBuilder::originate`];
    /// nothing is added to the book in that case.
    pub fn originate(&mut self, builder: LoanContractBuilder) -> LoanResult<LoanId> {
        let (contract, first) = builder.originated_at(self.now).originate()?;
        let id = contract.id();
        self.loans.insert(id, contract);
        self.enqueue(id, first);
        Ok(id)
    }

    /// The contract with this id, terminated or not.
    #[must_use]
    pub fn get(&self, id: LoanId) -> Option<&LoanContract> {
        self.loans.get(&id)
    }

    /// Mutable access for extensions, write-downs and lender transfers.
    pub fn get_mut(&mut self, id: LoanId) -> Option<&mut LoanContract> {
        self.loans.get_mut(&id)
    }

    /// Contracts that have not been terminated.
    pub fn active(&self) -> impl Iterator<Item = &LoanContract> {
        self.loans.values().filter(|loan| !loan.is_terminated())
    }

    /// Number of contracts held, including terminated ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loans.len()
    }

    /// True if the book holds no contracts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    /// Number of queued installment callbacks, including stale ones.
    #[must_use]
    pub fn pending_callbacks(&self) -> usize {
        self.queue.len()
    }

    /// When the next queued callback fires.
    #[must_use]
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.queue.peek().map(|Reverse(pending)| pending.due)
    }

    /// True if the contract is live but has no callback queued, which only
    /// happens after an unresolved default.
    #[must_use]
    pub fn is_pending(&self, id: LoanId) -> bool {
        self.loans
            .get(&id)
            .is_some_and(|loan| !loan.is_terminated() && !self.queued.contains(&id))
    }

    /// Terminate a contract early. Its queued callback stays in the queue.
    ///
    /// # Errors
    ///
    /// `LoanError::LoanNotFound` for an unknown id, `LoanError::AlreadyTerminated`
    /// if the contract has already ended.
    pub fn terminate(&mut self, id: LoanId) -> LoanResult<()> {
        self.loans
            .get_mut(&id)
            .ok_or(LoanError::LoanNotFound { id })?
            .terminate()
    }

    /// Re-queue a contract left pending by an unresolved default.
    ///
    /// # Errors
    ///
    /// - `LoanError::LoanNotFound` for an unknown id
    /// - `LoanError::AlreadyTerminated` if the contract has ended
    /// - `LoanError::CallbackQueued` if its next installment is already queued
    pub fn resume(&mut self, id: LoanId) -> LoanResult<()> {
        let loan = self.loans.get(&id).ok_or(LoanError::LoanNotFound { id })?;
        if loan.is_terminated() {
            return Err(LoanError::AlreadyTerminated { id });
        }
        if self.queued.contains(&id) {
            return Err(LoanError::CallbackQueued { id });
        }
        let wakeup = loan.schedule().cadence().wakeup();
        self.enqueue(id, wakeup);
        Ok(())
    }

    /// Take a contract out of the book, terminating it first if it is live.
    ///
    /// A queued callback for it is dropped when it falls due.
    ///
    /// # Errors
    ///
    /// `LoanError::LoanNotFound` for an unknown id.
    pub fn remove(&mut self, id: LoanId) -> LoanResult<LoanContract> {
        let mut loan = self.loans.remove(&id).ok_or(LoanError::LoanNotFound { id })?;
        if !loan.is_terminated() {
            loan.terminate()?;
        }
        Ok(loan)
    }

    /// Remove every terminated contract and return them.
    pub fn prune_terminated(&mut self) -> Vec<LoanContract> {
        let ids: Vec<LoanId> = self
            .loans
            .iter()
            .filter(|(_, loan)| loan.is_terminated())
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter()
            .filter_map(|id| self.loans.remove(&id))
            .collect()
    }

    /// Process the earliest queued callback, advancing the clock to it.
    ///
    /// Returns `None` when the queue is empty or the callback belonged to a
    /// removed contract.
    ///
    /// # Errors
    ///
    /// Propagates `LoanError::InvalidState` from the contract.
    pub fn step(&mut self) -> LoanResult<Option<InstallmentEvent>> {
        let Some(Reverse(pending)) = self.queue.pop() else {
            return Ok(None);
        };
        self.queued.remove(&pending.loan);
        self.now = self.now.max(pending.due);
        let Some(contract) = self.loans.get_mut(&pending.loan) else {
            log::debug!("callback for removed loan {} dropped", pending.loan);
            return Ok(None);
        };
        let outcome = contract.on_installment_due()?;
        if let Some(wakeup) = outcome.next_wakeup() {
            self.enqueue(pending.loan, wakeup);
        }
        Ok(Some(InstallmentEvent {
            at: self.now,
            loan: pending.loan,
            outcome,
        }))
    }

    /// Process every callback due at or before `until`, then move the clock
    /// to `until`.
    ///
    /// # Errors
    ///
    /// Stops at the first error from [`step`](Self::step).
    pub fn run_until(&mut self, until: DateTime<Utc>) -> LoanResult<Vec<InstallmentEvent>> {
        let mut events = Vec::new();
        while self.next_due().is_some_and(|due| due <= until) {
            if let Some(event) = self.step()? {
                events.push(event);
            }
        }
        self.now = self.now.max(until);
        Ok(events)
    }

    fn enqueue(&mut self, loan: LoanId, wakeup: Wakeup) {
        self.sequence += 1;
        self.queued.insert(loan);
        // Saturated callbacks sit at the end of time and never fire.
        let due = self
            .now
            .checked_add_signed(wakeup.after)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.queue.push(Reverse(Pending {
            due,
            order: wakeup.order,
            sequence: self.sequence,
            loan,
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::cadence::Cadence;
    use crate::counterparty::{BalanceSheet, CashLedger};
    use crate::schedule::{Bullet, CouponBond};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap()
    }

    fn parties(firm_cash: f64) -> (CashLedger, Arc<BalanceSheet>, Arc<BalanceSheet>) {
        let ledger = CashLedger::new();
        let firm = Arc::new(BalanceSheet::new("firm"));
        let bank = Arc::new(BalanceSheet::new("bank"));
        ledger.open_account(firm.id(), firm_cash).unwrap();
        ledger.open_account(bank.id(), 10_000.0).unwrap();
        (ledger, firm, bank)
    }

    #[test]
    fn runs_installments_in_time_order() {
        let (ledger, firm, bank) = parties(500.0);
        let mut book = LoanBook::new(start());
        let weekly = Cadence::new(EventOrder::BondPayments, Duration::days(7)).unwrap();

        let bond = book
            .originate(
                LoanContract::builder()
                    .borrower(&firm)
                    .lender(&bank)
                    .schedule(CouponBond::new(1000.0, 0.01, 3, weekly).unwrap())
                    .settlement(Arc::new(ledger.clone())),
            )
            .unwrap();
        let bullet = book
            .originate(
                LoanContract::builder()
                    .borrower(&firm)
                    .lender(&bank)
                    .schedule(Bullet::new(100.0, 0.1, Cadence::daily()).unwrap())
                    .settlement(Arc::new(ledger.clone())),
            )
            .unwrap();

        let events = book.run_until(start() + Duration::days(30)).unwrap();
        let order: Vec<LoanId> = events.iter().map(|e| e.loan).collect();
        assert_eq!(order, vec![bullet, bond, bond, bond]);
        assert_eq!(events[0].at, start() + Duration::days(1));
        assert_eq!(events[3].at, start() + Duration::days(21));
        assert!(book.active().next().is_none());
        assert_eq!(book.pending_callbacks(), 0);
        assert_eq!(book.now(), start() + Duration::days(30));
    }

    #[test]
    fn stale_callback_after_early_termination_is_skipped() {
        let (ledger, firm, bank) = parties(500.0);
        let mut book = LoanBook::new(start());
        let id = book
            .originate(
                LoanContract::builder()
                    .borrower(&firm)
                    .lender(&bank)
                    .schedule(CouponBond::new(100.0, 0.05, 4, Cadence::daily()).unwrap())
                    .settlement(Arc::new(ledger.clone())),
            )
            .unwrap();

        book.terminate(id).unwrap();
        assert_eq!(book.pending_callbacks(), 1);

        let event = book.step().unwrap().unwrap();
        assert_eq!(event.outcome, InstallmentOutcome::Skipped);
        assert_eq!(book.pending_callbacks(), 0);
        assert!(book.terminate(id).unwrap_err().is_terminated());
    }

    #[test]
    fn same_instant_callbacks_follow_event_order() {
        let (ledger, firm, bank) = parties(500.0);
        let mut book = LoanBook::new(start());
        let daily_bonds = Cadence::new(EventOrder::BondPayments, Duration::days(1)).unwrap();
        let daily_interbank =
            Cadence::new(EventOrder::InterbankLoanPayments, Duration::days(1)).unwrap();

        let late = book
            .originate(
                LoanContract::builder()
                    .borrower(&firm)
                    .lender(&bank)
                    .schedule(Bullet::new(10.0, 0.0, daily_bonds).unwrap())
                    .settlement(Arc::new(ledger.clone())),
            )
            .unwrap();
        let early = book
            .originate(
                LoanContract::builder()
                    .borrower(&firm)
                    .lender(&bank)
                    .schedule(Bullet::new(10.0, 0.0, daily_interbank).unwrap())
                    .settlement(Arc::new(ledger.clone())),
            )
            .unwrap();

        let events = book.run_until(start() + Duration::days(1)).unwrap();
        let order: Vec<LoanId> = events.iter().map(|e| e.loan).collect();
        assert_eq!(order, vec![early, late]);
    }

    #[test]
    fn unresolved_default_can_be_resumed() {
        let (ledger, firm, bank) = parties(0.0);
        let mut book = LoanBook::new(start());
        let id = book
            .originate(
                LoanContract::builder()
                    .borrower(&firm)
                    .lender(&bank)
                    .schedule(CouponBond::new(100.0, 0.05, 2, Cadence::daily()).unwrap())
                    .settlement(Arc::new(ledger.clone())),
            )
            .unwrap();
        ledger.open_account(firm.id(), 0.0).unwrap();

        let events = book.run_until(start() + Duration::days(5)).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].outcome, InstallmentOutcome::Defaulted { next: None, .. }));
        assert_eq!(book.pending_callbacks(), 0);

        ledger.deposit(firm.id(), 200.0).unwrap();
        book.resume(id).unwrap();
        let events = book.run_until(start() + Duration::days(10)).unwrap();
        assert_eq!(events.len(), 2);
        assert!(book.get(id).unwrap().is_terminated());
    }

    #[test]
    fn resume_is_rejected_while_a_callback_is_queued() {
        let (ledger, firm, bank) = parties(500.0);
        let mut book = LoanBook::new(start());
        let id = book
            .originate(
                LoanContract::builder()
                    .borrower(&firm)
                    .lender(&bank)
                    .schedule(CouponBond::new(100.0, 0.05, 5, Cadence::daily()).unwrap())
                    .settlement(Arc::new(ledger.clone())),
            )
            .unwrap();
        assert!(!book.is_pending(id));

        let err = book.resume(id).unwrap_err();
        assert!(matches!(err, LoanError::CallbackQueued { id: queued } if queued == id));
        assert_eq!(book.pending_callbacks(), 1);

        let events = book.run_until(start() + Duration::days(1)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(book.get(id).unwrap().installments_remaining(), 4);
        assert_eq!(book.pending_callbacks(), 1);
        assert!(book.resume(id).is_err());
    }

    #[test]
    fn defaulted_loan_is_pending_until_resumed() {
        let (ledger, firm, bank) = parties(0.0);
        let mut book = LoanBook::new(start());
        let id = book
            .originate(
                LoanContract::builder()
                    .borrower(&firm)
                    .lender(&bank)
                    .schedule(CouponBond::new(100.0, 0.05, 2, Cadence::daily()).unwrap())
                    .settlement(Arc::new(ledger.clone())),
            )
            .unwrap();
        ledger.open_account(firm.id(), 0.0).unwrap();

        book.run_until(start() + Duration::days(1)).unwrap();
        assert!(book.is_pending(id));
        book.resume(id).unwrap();
        assert!(!book.is_pending(id));
        assert!(matches!(
            book.resume(id).unwrap_err(),
            LoanError::CallbackQueued { .. }
        ));
        assert_eq!(book.pending_callbacks(), 1);
    }

    #[test]
    fn far_future_callback_saturates_instead_of_panicking() {
        let (ledger, firm, bank) = parties(500.0);
        let mut book = LoanBook::new(start());
        let glacial = Cadence::new(EventOrder::BondPayments, Duration::days(100_000_000)).unwrap();
        book.originate(
            LoanContract::builder()
                .borrower(&firm)
                .lender(&bank)
                .schedule(Bullet::new(100.0, 0.1, glacial).unwrap())
                .settlement(Arc::new(ledger.clone())),
        )
        .unwrap();

        assert_eq!(book.next_due(), Some(DateTime::<Utc>::MAX_UTC));
        let events = book.run_until(start() + Duration::days(10)).unwrap();
        assert!(events.is_empty());
        assert_eq!(book.pending_callbacks(), 1);
    }

    #[test]
    fn removed_loans_leave_the_book() {
        let (ledger, firm, bank) = parties(500.0);
        let mut book = LoanBook::new(start());
        let originate = |book: &mut LoanBook| {
            book.originate(
                LoanContract::builder()
                    .borrower(&firm)
                    .lender(&bank)
                    .schedule(CouponBond::new(100.0, 0.05, 3, Cadence::daily()).unwrap())
                    .settlement(Arc::new(ledger.clone())),
            )
            .unwrap()
        };
        let kept = originate(&mut book);
        let removed = originate(&mut book);
        let pruned = originate(&mut book);
        assert_eq!(book.len(), 3);

        let contract = book.remove(removed).unwrap();
        assert!(contract.is_terminated());
        assert!(firm.liabilities().iter().all(|id| *id != removed));
        assert!(matches!(
            book.remove(removed).unwrap_err(),
            LoanError::LoanNotFound { .. }
        ));

        book.terminate(pruned).unwrap();
        let gone = book.prune_terminated();
        assert_eq!(gone.len(), 1);
        assert_eq!(gone[0].id(), pruned);
        assert_eq!(book.len(), 1);
        assert!(book.get(kept).is_some());

        let events = book.run_until(start() + Duration::days(1)).unwrap();
        let loans: Vec<LoanId> = events.iter().map(|e| e.loan).collect();
        assert_eq!(loans, vec![kept]);
        assert_eq!(book.pending_callbacks(), 1);
    }

    #[test]
    fn unknown_loan_is_reported() {
        let mut book = LoanBook::new(start());
        let err = book.terminate(LoanId::new()).unwrap_err();
        assert!(matches!(err, LoanError::LoanNotFound { .. }));
        assert!(book.is_empty());
        assert!(book.step().unwrap().is_none());
    }
}
