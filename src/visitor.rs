//! Double dispatch over the concrete loan kind.
//!
//! Callers that need kind-specific behaviour implement [`LoanVisitor`] and
//! call [`LoanContract::accept`]. Adding a schedule kind adds a method here,
//! so every visitor has to handle it.

use crate::contract::LoanContract;
use crate::schedule::{Bullet, CouponBond, FixedRateMortgage, NonAccumulatingInterest};

/// One method per loan kind.
pub trait LoanVisitor {
    /// Value produced per visited loan.
    type Output;

    /// Visit a coupon bond.
    fn visit_coupon_bond(&mut self, loan: &LoanContract, schedule: &CouponBond) -> Self::Output;

    /// Visit a bullet loan.
    fn visit_bullet(&mut self, loan: &LoanContract, schedule: &Bullet) -> Self::Output;

    /// Visit a fixed rate mortgage.
    fn visit_fixed_rate_mortgage(
        &mut self,
        loan: &LoanContract,
        schedule: &FixedRateMortgage,
    ) -> Self::Output;

    /// Visit a non-accumulating interest loan.
    fn visit_non_accumulating_interest(
        &mut self,
        loan: &LoanContract,
        schedule: &NonAccumulatingInterest,
    ) -> Self::Output;
}
