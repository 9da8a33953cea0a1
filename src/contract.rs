//! Loan contracts.
//!
//! A [`LoanContract`] binds one repayment schedule to a borrower/lender pair.
//! It moves cash only through its settlement channel and never talks to a
//! scheduler: origination and every installment return the next [`Wakeup`]
//! for the caller to queue.
//!
//! Lifecycle:
//! - origination transfers the principal or fails without side effects
//! - each installment either advances the schedule or consults the default
//!   policy
//! - termination happens exactly once, on full repayment or explicitly

use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cadence::Wakeup;
use crate::counterparty::{
    Borrower, DefaultNotice, DefaultOutcome, DefaultPolicy, LeavePending, Lender, PartyId,
    SettlementChannel, SettlementFactory,
};
use crate::error::{LoanError, LoanResult, ValidationError};
use crate::schedule::{is_positive, LoanKind, PaymentSchedule};
use crate::snapshot::LoanSnapshot;
use crate::visitor::LoanVisitor;

/// Stable identifier for a loan contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(Uuid);

impl LoanId {
    /// Creates a new random loan ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LoanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened when an installment fell due.
#[derive(Debug, Clone, PartialEq)]
pub enum InstallmentOutcome {
    /// The contract was already terminated; nothing happened.
    Skipped,
    /// The installment was paid and further installments remain.
    Paid {
        /// Installment received by the lender.
        amount: f64,
        /// When the next installment falls due.
        next: Wakeup,
    },
    /// The final installment was paid and the contract terminated.
    Repaid {
        /// Installment received by the lender.
        amount: f64,
    },
    /// The borrower could not pay and the default policy was consulted.
    Defaulted {
        /// The installment that was not paid.
        missed: f64,
        /// What the policy decided.
        resolution: DefaultOutcome,
        /// Retry of the missed installment, if the policy allowed one.
        next: Option<Wakeup>,
    },
}

impl InstallmentOutcome {
    /// The wake-up to queue, if any.
    #[must_use]
    pub const fn next_wakeup(&self) -> Option<Wakeup> {
        match self {
            Self::Paid { next, .. } => Some(*next),
            Self::Defaulted { next, .. } => *next,
            Self::Skipped | Self::Repaid { .. } => None,
        }
    }

    /// Amount received by the lender.
    #[must_use]
    pub const fn amount_paid(&self) -> f64 {
        match self {
            Self::Paid { amount, .. } | Self::Repaid { amount } => *amount,
            Self::Skipped | Self::Defaulted { .. } => 0.0,
        }
    }
}

/// Live link to the counterparties; absent once the contract is terminated.
struct Counterparties {
    borrower: Weak<dyn Borrower>,
    borrower_id: PartyId,
    lender: Weak<dyn Lender>,
    lender_id: PartyId,
    settlement: Box<dyn SettlementChannel>,
}

/// A loan between one borrower and one lender.
pub struct LoanContract {
    id: LoanId,
    schedule: PaymentSchedule,
    default_policy: Box<dyn DefaultPolicy>,
    settlements: Arc<dyn SettlementFactory>,
    parties: Option<Counterparties>,
    total_payments_made: f64,
    originated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl fmt::Debug for LoanContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoanContract")
            .field("id", &self.id)
            .field("schedule", &self.schedule)
            .field("borrower", &self.borrower_id())
            .field("lender", &self.lender_id())
            .field("total_payments_made", &self.total_payments_made)
            .field("terminated", &self.is_terminated())
            .finish_non_exhaustive()
    }
}

impl LoanContract {
    /// Creates a builder for originating a loan.
    #[must_use]
    pub fn builder() -> LoanContractBuilder {
        LoanContractBuilder::default()
    }

    /// Stable identifier.
    #[must_use]
    pub const fn id(&self) -> LoanId {
        self.id
    }

    /// Loan kind, from the schedule.
    #[must_use]
    pub const fn kind(&self) -> LoanKind {
        self.schedule.kind()
    }

    /// The repayment schedule.
    #[must_use]
    pub const fn schedule(&self) -> &PaymentSchedule {
        &self.schedule
    }

    /// The borrower, unless terminated or dropped.
    #[must_use]
    pub fn borrower(&self) -> Option<Arc<dyn Borrower>> {
        self.parties.as_ref().and_then(|p| p.borrower.upgrade())
    }

    /// The lender, unless terminated or dropped.
    #[must_use]
    pub fn lender(&self) -> Option<Arc<dyn Lender>> {
        self.parties.as_ref().and_then(|p| p.lender.upgrade())
    }

    /// Borrower id, `None` once terminated.
    #[must_use]
    pub fn borrower_id(&self) -> Option<PartyId> {
        self.parties.as_ref().map(|p| p.borrower_id)
    }

    /// Lender id, `None` once terminated.
    #[must_use]
    pub fn lender_id(&self) -> Option<PartyId> {
        self.parties.as_ref().map(|p| p.lender_id)
    }

    /// True once the contract has been repaid, terminated or written off.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        self.parties.is_none()
    }

    /// Immediate borrower debt: the amount that would settle the loan now.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.schedule.debt_now()
    }

    /// Sum of all pending installments.
    #[must_use]
    pub fn face_value(&self) -> f64 {
        self.schedule.face_value()
    }

    /// Overall interest: `(1 + r) · principal` is the face value at inception.
    #[must_use]
    pub fn interest_rate(&self) -> f64 {
        self.schedule.overall_interest()
    }

    /// Principal transferred to the borrower, including extensions.
    #[must_use]
    pub const fn principal(&self) -> f64 {
        self.schedule.total_principal()
    }

    /// Installment due at the next callback.
    #[must_use]
    pub fn next_installment(&self) -> f64 {
        self.schedule.next_installment_due()
    }

    /// Installments still to be paid.
    #[must_use]
    pub const fn installments_remaining(&self) -> u32 {
        self.schedule.phases_remaining()
    }

    /// Debt left once the next installment is paid.
    #[must_use]
    pub fn value_after_next_installment(&self) -> f64 {
        self.schedule.debt_in_next_phase()
    }

    /// Payments received so far plus everything still owed.
    #[must_use]
    pub fn total_amount_to_repay_at_inception(&self) -> f64 {
        self.total_payments_made + self.schedule.face_value()
    }

    /// Sum of installments received by the lender.
    #[must_use]
    pub const fn total_payments_made(&self) -> f64 {
        self.total_payments_made
    }

    /// When the loan was originated.
    #[must_use]
    pub const fn originated_at(&self) -> DateTime<Utc> {
        self.originated_at
    }

    /// When the last installment falls due if every payment succeeds.
    ///
    /// Saturates at the latest representable instant.
    #[must_use]
    pub const fn expected_expiry(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Dispatch on the concrete loan kind.
    pub fn accept<V: LoanVisitor>(&self, visitor: &mut V) -> V::Output {
        match &self.schedule {
            PaymentSchedule::CouponBond(s) => visitor.visit_coupon_bond(self, s),
            PaymentSchedule::Bullet(s) => visitor.visit_bullet(self, s),
            PaymentSchedule::FixedRateMortgage(s) => visitor.visit_fixed_rate_mortgage(self, s),
            PaymentSchedule::NonAccumulatingInterest(s) => {
                visitor.visit_non_accumulating_interest(self, s)
            }
        }
    }

    /// Read-only view of the contract.
    #[must_use]
    pub fn snapshot(&self) -> LoanSnapshot {
        LoanSnapshot {
            id: self.id,
            kind: self.kind(),
            borrower: self.borrower_id(),
            lender: self.lender_id(),
            terminated: self.is_terminated(),
            value: self.value(),
            face_value: self.face_value(),
            next_installment: self.next_installment(),
            total_payments_made: self.total_payments_made,
            originated_at: self.originated_at,
            expires_at: self.expires_at,
            schedule: self.schedule.clone(),
        }
    }

    fn active(&self) -> LoanResult<&Counterparties> {
        self.parties
            .as_ref()
            .ok_or(LoanError::AlreadyTerminated { id: self.id })
    }

    /// Handle one due installment.
    ///
    /// Borrower payment failures never surface as errors; they are handed to
    /// the default policy and reported as [`InstallmentOutcome::Defaulted`].
    ///
    /// # Errors
    ///
    /// Returns `LoanError::InvalidState` if the schedule is already fully
    /// repaid while the contract is still live.
    pub fn on_installment_due(&mut self) -> LoanResult<InstallmentOutcome> {
        let Some(parties) = self.parties.as_ref() else {
            log::debug!("loan {}: installment callback after termination ignored", self.id);
            return Ok(InstallmentOutcome::Skipped);
        };
        self.schedule.phases().ensure_outstanding("collect installment")?;

        let amount = self.schedule.next_installment_due();
        match parties.settlement.transfer(amount) {
            Ok(()) => {
                self.total_payments_made += amount;
                match parties.borrower.upgrade() {
                    Some(borrower) => borrower.register_new_loan_repayment_installment(
                        amount,
                        parties.lender_id,
                        self.schedule.overall_interest(),
                    ),
                    None => log::warn!("loan {}: borrower dropped before notification", self.id),
                }
                self.schedule.advance_phase()?;
                log::debug!(
                    "loan {}: installment {:.4} paid, {} remaining, debt {:.4}",
                    self.id,
                    amount,
                    self.schedule.phases_remaining(),
                    self.schedule.debt_now()
                );
                if self.schedule.is_fully_repaid() {
                    self.release();
                    Ok(InstallmentOutcome::Repaid { amount })
                } else {
                    Ok(InstallmentOutcome::Paid {
                        amount,
                        next: self.schedule.cadence().wakeup(),
                    })
                }
            }
            Err(err) => {
                log::warn!("loan {}: borrower failed to pay {:.4}: {err}", self.id, amount);
                let notice = DefaultNotice {
                    loan_id: self.id,
                    kind: self.kind(),
                    borrower: parties.borrower_id,
                    lender: parties.lender_id,
                    amount_due: amount,
                    amount_already_paid: 0.0,
                    debt_now: self.schedule.debt_now(),
                };
                let resolution = self.default_policy.resolve(&notice);
                let next = if resolution.is_resolved() {
                    Some(self.schedule.cadence().wakeup())
                } else {
                    log::warn!("loan {}: default unresolved, contract pending", self.id);
                    None
                };
                Ok(InstallmentOutcome::Defaulted {
                    missed: amount,
                    resolution,
                    next,
                })
            }
        }
    }

    /// Terminate the contract, removing it from both balance sheets.
    ///
    /// # Errors
    ///
    /// Returns `LoanError::AlreadyTerminated` on a second call.
    pub fn terminate(&mut self) -> LoanResult<()> {
        self.active()?;
        self.release();
        Ok(())
    }

    fn release(&mut self) {
        let Some(parties) = self.parties.take() else {
            return;
        };
        if let Some(borrower) = parties.borrower.upgrade() {
            borrower.remove_liability(self.id);
        }
        if let Some(lender) = parties.lender.upgrade() {
            lender.remove_asset(self.id);
        }
        log::info!(
            "loan {} terminated after payments of {:.4}",
            self.id,
            self.total_payments_made
        );
    }

    /// Move the immediate debt to `value`.
    ///
    /// Negative values are treated as zero, and zero terminates the contract.
    /// Larger values extend the loan (with a lender transfer), smaller values
    /// write it down.
    ///
    /// # Errors
    ///
    /// Same as [`terminate`](Self::terminate), [`extend_loan`](Self::extend_loan)
    /// or [`write_down_loan`](Self::write_down_loan), whichever applies.
    pub fn set_value(&mut self, value: f64) -> LoanResult<()> {
        let value = value.max(0.0);
        let current = self.value();
        if value == 0.0 {
            self.terminate()
        } else if value > current {
            self.extend_loan(value - current)
        } else if value < current {
            self.write_down_loan(current - value)
        } else {
            Ok(())
        }
    }

    /// Advance `amount` more cash to the borrower and extend the schedule.
    ///
    /// # Errors
    ///
    /// Returns `LoanError::LenderInsufficientFunds` if the transfer fails; the
    /// schedule is left untouched. `LoanError::AlreadyTerminated` if the
    /// contract has ended.
    pub fn extend_loan(&mut self, amount: f64) -> LoanResult<()> {
        if !is_positive(amount) {
            return Ok(());
        }
        let parties = self.active()?;
        parties
            .settlement
            .bidirectional_transfer(-amount)
            .map_err(|source| LoanError::LenderInsufficientFunds {
                requested: amount,
                source,
            })?;
        self.schedule.extend(amount)?;
        log::info!("loan {}: extended by {:.4}", self.id, amount);
        Ok(())
    }

    /// Write off up to `amount` of debt. The lender receives no compensation.
    /// A write-down that clears the debt terminates the contract.
    ///
    /// # Errors
    ///
    /// `LoanError::AlreadyTerminated` if the contract has ended.
    pub fn write_down_loan(&mut self, amount: f64) -> LoanResult<()> {
        if !is_positive(amount) {
            return Ok(());
        }
        self.active()?;
        self.schedule.reduce(amount)?;
        log::info!("loan {}: written down by {:.4}", self.id, amount);
        if self.schedule.is_fully_repaid() {
            self.release();
        }
        Ok(())
    }

    /// Hand the loan to `new_lender`. The schedule is unaffected.
    ///
    /// # Errors
    ///
    /// `LoanError::AlreadyTerminated` if the contract has ended.
    pub fn transfer_to_new_lender<L>(&mut self, new_lender: &Arc<L>) -> LoanResult<()>
    where
        L: Lender + 'static,
    {
        let id = self.id;
        let settlements = Arc::clone(&self.settlements);
        let parties = self
            .parties
            .as_mut()
            .ok_or(LoanError::AlreadyTerminated { id })?;

        if let Some(old) = parties.lender.upgrade() {
            old.remove_asset(id);
        }
        new_lender.add_asset(id);

        let new_lender_id = new_lender.party_id();
        let strong: Arc<dyn Lender> = new_lender.clone();
        let weak: Weak<dyn Lender> = Arc::downgrade(&strong);
        log::info!(
            "loan {id}: lender transferred from {} to {new_lender_id}",
            parties.lender_id
        );
        parties.lender = weak;
        parties.lender_id = new_lender_id;
        parties.settlement = settlements.direct(parties.borrower_id, new_lender_id);
        Ok(())
    }
}

/// Builder that originates a [`LoanContract`].
///
/// # Example
/// ```rust,ignore
/// let (loan, first) = LoanContract::builder()
///     .borrower(&firm)
///     .lender(&bank)
///     .schedule(schedule)
///     .settlement(Arc::new(ledger.clone()))
///     .originated_at(now)
///     .originate()?;
/// ```
#[derive(Default)]
pub struct LoanContractBuilder {
    borrower: Option<Arc<dyn Borrower>>,
    lender: Option<Arc<dyn Lender>>,
    schedule: Option<PaymentSchedule>,
    default_policy: Option<Box<dyn DefaultPolicy>>,
    settlements: Option<Arc<dyn SettlementFactory>>,
    originated_at: Option<DateTime<Utc>>,
}

impl LoanContractBuilder {
    /// Set the borrower (required).
    #[must_use]
    pub fn borrower<B>(mut self, borrower: &Arc<B>) -> Self
    where
        B: Borrower + 'static,
    {
        let borrower: Arc<dyn Borrower> = borrower.clone();
        self.borrower = Some(borrower);
        self
    }

    /// Set the lender (required).
    #[must_use]
    pub fn lender<L>(mut self, lender: &Arc<L>) -> Self
    where
        L: Lender + 'static,
    {
        let lender: Arc<dyn Lender> = lender.clone();
        self.lender = Some(lender);
        self
    }

    /// Set the repayment schedule (required).
    #[must_use]
    pub fn schedule(mut self, schedule: impl Into<PaymentSchedule>) -> Self {
        self.schedule = Some(schedule.into());
        self
    }

    /// Set the default policy (default: [`LeavePending`]).
    #[must_use]
    pub fn default_policy(mut self, policy: impl DefaultPolicy + 'static) -> Self {
        self.default_policy = Some(Box::new(policy));
        self
    }

    /// Set the settlement factory (required).
    #[must_use]
    pub fn settlement(mut self, settlements: Arc<dyn SettlementFactory>) -> Self {
        self.settlements = Some(settlements);
        self
    }

    /// Set the origination time (default: now).
    #[must_use]
    pub fn originated_at(mut self, at: DateTime<Utc>) -> Self {
        self.originated_at = Some(at);
        self
    }

    /// Transfer the principal and create the contract.
    ///
    /// Returns the contract together with the wake-up for its first
    /// installment.
    ///
    /// # Errors
    ///
    /// - `ValidationError::MissingField` if a required field is not set
    /// - `LoanError::LenderInsufficientFunds` if the principal cannot be
    ///   transferred; nothing is registered in that case
    pub fn originate(self) -> LoanResult<(LoanContract, Wakeup)> {
        let borrower = self.borrower.ok_or_else(|| missing("borrower"))?;
        let lender = self.lender.ok_or_else(|| missing("lender"))?;
        let schedule = self.schedule.ok_or_else(|| missing("schedule"))?;
        let settlements = self.settlements.ok_or_else(|| missing("settlement"))?;
        let default_policy = self
            .default_policy
            .unwrap_or_else(|| Box::new(LeavePending));
        let originated_at = self.originated_at.unwrap_or_else(Utc::now);

        let borrower_id = borrower.party_id();
        let lender_id = lender.party_id();
        let settlement = settlements.direct(borrower_id, lender_id);

        let principal = schedule.total_principal();
        settlement
            .bidirectional_transfer(-principal)
            .map_err(|source| LoanError::LenderInsufficientFunds {
                requested: principal,
                source,
            })?;

        let id = LoanId::new();
        borrower.add_liability(id);
        lender.add_asset(id);
        borrower.register_new_loan_transfer(principal, lender_id, schedule.overall_interest());

        let cadence = *schedule.cadence();
        let expires_at = cadence
            .interval
            .checked_mul(schedule_length(&schedule))
            .and_then(|span| originated_at.checked_add_signed(span))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        log::info!(
            "loan {id}: originated {} of {principal:.4} from {lender_id} to {borrower_id}",
            schedule.kind()
        );

        let contract = LoanContract {
            id,
            schedule,
            default_policy,
            settlements,
            parties: Some(Counterparties {
                borrower: Arc::downgrade(&borrower),
                borrower_id,
                lender: Arc::downgrade(&lender),
                lender_id,
                settlement,
            }),
            total_payments_made: 0.0,
            originated_at,
            expires_at,
        };
        Ok((contract, cadence.wakeup()))
    }
}

fn missing(field: &str) -> LoanError {
    ValidationError::MissingField {
        field: field.to_string(),
    }
    .into()
}

fn schedule_length(schedule: &PaymentSchedule) -> i32 {
    i32::try_from(schedule.phases_remaining()).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::cadence::Cadence;
    use crate::counterparty::{BalanceSheet, CashLedger, Forbearance};
    use crate::schedule::{Bullet, CouponBond, FixedRateMortgage, NonAccumulatingInterest};

    struct Fixture {
        ledger: CashLedger,
        firm: Arc<BalanceSheet>,
        bank: Arc<BalanceSheet>,
    }

    fn fixture(firm_cash: f64, bank_cash: f64) -> Fixture {
        let ledger = CashLedger::new();
        let firm = Arc::new(BalanceSheet::new("firm"));
        let bank = Arc::new(BalanceSheet::new("bank"));
        ledger.open_account(firm.id(), firm_cash).unwrap();
        ledger.open_account(bank.id(), bank_cash).unwrap();
        Fixture { ledger, firm, bank }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    fn originate(fx: &Fixture, schedule: impl Into<PaymentSchedule>) -> LoanResult<LoanContract> {
        LoanContract::builder()
            .borrower(&fx.firm)
            .lender(&fx.bank)
            .schedule(schedule)
            .settlement(Arc::new(fx.ledger.clone()))
            .originated_at(start())
            .originate()
            .map(|(loan, _)| loan)
    }

    fn bond() -> CouponBond {
        CouponBond::new(1000.0, 0.03, 5, Cadence::daily()).unwrap()
    }

    #[test]
    fn origination_transfers_principal_and_registers() {
        let fx = fixture(0.0, 5000.0);
        let (loan, first) = LoanContract::builder()
            .borrower(&fx.firm)
            .lender(&fx.bank)
            .schedule(bond())
            .settlement(Arc::new(fx.ledger.clone()))
            .originated_at(start())
            .originate()
            .unwrap();

        assert_eq!(first, Cadence::daily().wakeup());
        assert!((fx.ledger.balance(fx.firm.id()).unwrap() - 1000.0).abs() < 1e-9);
        assert!((fx.ledger.balance(fx.bank.id()).unwrap() - 4000.0).abs() < 1e-9);
        assert_eq!(fx.firm.liabilities(), vec![loan.id()]);
        assert_eq!(fx.bank.assets(), vec![loan.id()]);
        assert_eq!(fx.firm.loan_transfers().len(), 1);
        assert_eq!(loan.expected_expiry(), start() + Duration::days(5));
        assert_eq!(loan.borrower_id(), Some(fx.firm.id()));
        assert!(!loan.is_terminated());
    }

    #[test]
    fn expiry_saturates_for_very_long_schedules() {
        let fx = fixture(0.0, 1000.0);
        let loan = originate(
            &fx,
            CouponBond::new(1000.0, 0.0, 200_000_000, Cadence::daily()).unwrap(),
        )
        .unwrap();
        assert_eq!(loan.expected_expiry(), DateTime::<Utc>::MAX_UTC);
        assert_eq!(loan.installments_remaining(), 200_000_000);
    }

    #[test]
    fn unfunded_origination_has_no_side_effects() {
        let fx = fixture(0.0, 999.0);
        let err = originate(&fx, bond()).unwrap_err();
        assert!(err.is_insufficient_funds());
        assert!(fx.firm.liabilities().is_empty());
        assert!(fx.bank.assets().is_empty());
        assert!(fx.firm.loan_transfers().is_empty());
        assert_eq!(fx.ledger.balance(fx.firm.id()).unwrap(), 0.0);
    }

    #[test]
    fn builder_requires_fields() {
        let fx = fixture(0.0, 1000.0);
        let err = LoanContract::builder()
            .borrower(&fx.firm)
            .schedule(bond())
            .originate()
            .unwrap_err();
        assert!(err.is_validation());
        assert!(format!("{err}").contains("lender"));
    }

    #[test]
    fn coupon_bond_runs_to_termination() {
        let fx = fixture(200.0, 1000.0);
        let mut loan = originate(&fx, bond()).unwrap();

        let mut amounts = Vec::new();
        loop {
            let outcome = loan.on_installment_due().unwrap();
            amounts.push(outcome.amount_paid());
            if outcome.next_wakeup().is_none() {
                assert!(matches!(outcome, InstallmentOutcome::Repaid { .. }));
                break;
            }
        }
        assert_eq!(amounts.len(), 5);
        assert!((amounts[4] - 1030.0).abs() < 1e-9);
        assert!((loan.total_payments_made() - 1150.0).abs() < 1e-9);
        assert!(loan.is_terminated());
        assert!(fx.firm.liabilities().is_empty());
        assert!(fx.bank.assets().is_empty());
        assert_eq!(fx.firm.repayments().len(), 5);
        assert!((fx.ledger.balance(fx.bank.id()).unwrap() - 1150.0).abs() < 1e-9);

        assert_eq!(loan.on_installment_due().unwrap(), InstallmentOutcome::Skipped);
    }

    #[test]
    fn unresolved_default_leaves_contract_pending() {
        let fx = fixture(0.0, 1000.0);
        let mut loan = originate(&fx, Bullet::new(1000.0, 0.1, Cadence::daily()).unwrap()).unwrap();

        let outcome = loan.on_installment_due().unwrap();
        let InstallmentOutcome::Defaulted { missed, resolution, next } = outcome else {
            panic!("expected InstallmentOutcome::Defaulted");
        };
        assert!((missed - 1100.0).abs() < 1e-9);
        assert_eq!(resolution, DefaultOutcome::Unresolved);
        assert!(next.is_none());
        assert!(!loan.is_terminated());
        assert_eq!(loan.installments_remaining(), 1);
        assert_eq!(loan.total_payments_made(), 0.0);
    }

    #[test]
    fn resolved_default_reschedules_without_retry() {
        let fx = fixture(0.0, 1000.0);
        let (mut loan, _) = LoanContract::builder()
            .borrower(&fx.firm)
            .lender(&fx.bank)
            .schedule(bond())
            .default_policy(Forbearance::unlimited())
            .settlement(Arc::new(fx.ledger.clone()))
            .originate()
            .unwrap();
        fx.ledger.open_account(fx.firm.id(), 0.0).unwrap();

        let outcome = loan.on_installment_due().unwrap();
        assert_eq!(outcome.next_wakeup(), Some(Cadence::daily().wakeup()));
        assert!(matches!(
            outcome,
            InstallmentOutcome::Defaulted {
                resolution: DefaultOutcome::Resolved,
                ..
            }
        ));
        assert_eq!(loan.installments_remaining(), 5);
    }

    #[test]
    fn terminate_twice_is_an_error() {
        let fx = fixture(0.0, 1000.0);
        let mut loan = originate(&fx, bond()).unwrap();
        loan.terminate().unwrap();
        assert!(fx.bank.assets().is_empty());
        assert!(loan.borrower().is_none());
        assert!(loan.terminate().unwrap_err().is_terminated());
        assert!(loan.extend_loan(10.0).unwrap_err().is_terminated());
    }

    #[test]
    fn extend_loan_moves_cash_then_extends() {
        let fx = fixture(0.0, 1500.0);
        let mut loan =
            originate(&fx, FixedRateMortgage::new(1000.0, 0.05, 10, Cadence::daily()).unwrap())
                .unwrap();
        loan.extend_loan(500.0).unwrap();
        assert!((loan.value() - 1500.0).abs() < 1e-9);
        assert!((loan.principal() - 1500.0).abs() < 1e-9);
        assert!((fx.ledger.balance(fx.firm.id()).unwrap() - 1500.0).abs() < 1e-9);

        let err = loan.extend_loan(1.0).unwrap_err();
        assert!(err.is_insufficient_funds());
        assert!((loan.value() - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn set_value_routes_to_extend_write_down_or_terminate() {
        let fx = fixture(0.0, 2000.0);
        let mut loan =
            originate(&fx, NonAccumulatingInterest::new(1000.0, 0.1, 4, Cadence::daily()).unwrap())
                .unwrap();

        loan.set_value(1200.0).unwrap();
        assert!((loan.value() - 1200.0).abs() < 1e-9);
        assert!((fx.ledger.balance(fx.bank.id()).unwrap() - 900.0).abs() < 1e-9);

        loan.set_value(600.0).unwrap();
        assert!((loan.value() - 600.0).abs() < 1e-9);
        assert!((fx.ledger.balance(fx.bank.id()).unwrap() - 900.0).abs() < 1e-9);

        loan.set_value(-5.0).unwrap();
        assert!(loan.is_terminated());
        assert!(fx.bank.assets().is_empty());
    }

    #[test]
    fn full_write_down_terminates() {
        let fx = fixture(0.0, 1000.0);
        let mut loan = originate(&fx, bond()).unwrap();
        loan.write_down_loan(5000.0).unwrap();
        assert!(loan.is_terminated());
        assert_eq!(loan.value(), 0.0);
        assert!(fx.firm.liabilities().is_empty());
    }

    #[test]
    fn transfer_to_new_lender_repoints_settlement() {
        let fx = fixture(100.0, 1000.0);
        let fund = Arc::new(BalanceSheet::new("fund"));
        fx.ledger.open_account(fund.id(), 0.0).unwrap();
        let mut loan = originate(&fx, bond()).unwrap();
        let before = loan.schedule().clone();

        loan.transfer_to_new_lender(&fund).unwrap();
        assert!(fx.bank.assets().is_empty());
        assert_eq!(fund.assets(), vec![loan.id()]);
        assert_eq!(loan.lender_id(), Some(fund.id()));
        assert_eq!(loan.schedule(), &before);

        loan.on_installment_due().unwrap();
        assert!((fx.ledger.balance(fund.id()).unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_reflects_state() {
        let fx = fixture(0.0, 1000.0);
        let loan = originate(&fx, bond()).unwrap();
        let snapshot = loan.snapshot();
        assert_eq!(snapshot.id, loan.id());
        assert_eq!(snapshot.kind, LoanKind::CouponBond);
        assert!(!snapshot.terminated);
        assert!((snapshot.face_value - 1150.0).abs() < 1e-9);
        assert!((loan.total_amount_to_repay_at_inception() - 1150.0).abs() < 1e-9);
    }
}
