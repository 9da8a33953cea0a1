//! Declarative schedule terms.
//!
//! Terms are the serializable description of a schedule, suitable for
//! configuration files and wire payloads. They are validated before a
//! schedule is built.

use serde::{Deserialize, Serialize};

use crate::cadence::Cadence;
use crate::error::{LoanError, ValidationError};

use super::{Bullet, CouponBond, FixedRateMortgage, NonAccumulatingInterest, PaymentSchedule};

/// Mortgage rates at or below this threshold are built as
/// [`NonAccumulatingInterest`]; the annuity formula is singular at zero.
pub const MIN_ANNUITY_RATE: f64 = 1.0e-8;

/// Parameters for one of the supported schedules.
///
/// # Examples
///
/// ```
/// use repayment_engine::{LoanKind, ScheduleTerms};
///
/// let terms = ScheduleTerms::from_json(
///     r#"{"kind":"fixed_rate_mortgage","principal":1000.0,"rate":0.05,"installments":10}"#,
/// ).unwrap();
/// let schedule = terms.build().unwrap();
/// assert_eq!(schedule.kind(), LoanKind::FixedRateMortgage);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleTerms {
    /// Terms for [`CouponBond::new`].
    CouponBond {
        /// Cash advanced at origination.
        principal: f64,
        /// Interest per coupon, as a fraction of the debt.
        interest_per_coupon: f64,
        /// Number of coupons.
        coupons: u32,
        /// Defaults to [`Cadence::daily`].
        #[serde(default)]
        cadence: Cadence,
    },
    /// Terms for [`Bullet::new`].
    Bullet {
        /// Cash advanced at origination.
        principal: f64,
        /// Interest on the single payment.
        rate: f64,
        /// Defaults to [`Cadence::daily`].
        #[serde(default)]
        cadence: Cadence,
    },
    /// Terms for [`FixedRateMortgage::new`].
    FixedRateMortgage {
        /// Cash advanced at origination.
        principal: f64,
        /// Interest per installment.
        rate: f64,
        /// Number of installments.
        installments: u32,
        /// Defaults to [`Cadence::daily`].
        #[serde(default)]
        cadence: Cadence,
    },
    /// Terms for [`NonAccumulatingInterest::new`].
    NonAccumulatingInterest {
        /// Cash advanced at origination.
        principal: f64,
        /// Interest over the whole schedule.
        overall_rate: f64,
        /// Number of installments.
        installments: u32,
        /// Defaults to [`Cadence::daily`].
        #[serde(default)]
        cadence: Cadence,
    },
}

impl ScheduleTerms {
    /// Validate the terms without building a schedule.
    ///
    /// # Errors
    ///
    /// The same errors as [`build`](Self::build).
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.build().map(|_| ())
    }

    /// Build the schedule described by these terms.
    ///
    /// A fixed rate mortgage whose rate is at most [`MIN_ANNUITY_RATE`] is
    /// built as a non-accumulating schedule with the same rate.
    ///
    /// # Errors
    ///
    /// Any `ValidationError` raised by the schedule constructor.
    pub fn build(&self) -> Result<PaymentSchedule, ValidationError> {
        let schedule = match *self {
            Self::CouponBond {
                principal,
                interest_per_coupon,
                coupons,
                cadence,
            } => CouponBond::new(principal, interest_per_coupon, coupons, cadence)?.into(),
            Self::Bullet {
                principal,
                rate,
                cadence,
            } => Bullet::new(principal, rate, cadence)?.into(),
            Self::FixedRateMortgage {
                principal,
                rate,
                installments,
                cadence,
            } if (0.0..=MIN_ANNUITY_RATE).contains(&rate) => {
                NonAccumulatingInterest::new(principal, rate, installments, cadence)?.into()
            }
            Self::FixedRateMortgage {
                principal,
                rate,
                installments,
                cadence,
            } => FixedRateMortgage::new(principal, rate, installments, cadence)?.into(),
            Self::NonAccumulatingInterest {
                principal,
                overall_rate,
                installments,
                cadence,
            } => NonAccumulatingInterest::new(principal, overall_rate, installments, cadence)?
                .into(),
        };
        Ok(schedule)
    }

    /// Deserialize terms from JSON.
    ///
    /// # Errors
    ///
    /// `LoanError::Internal` for malformed JSON, unknown kinds and
    /// out-of-range intervals. Field values are checked by [`build`](Self::build).
    pub fn from_json(s: &str) -> Result<Self, LoanError> {
        serde_json::from_str(s).map_err(|e| LoanError::internal(format!("deserialize terms: {e}")))
    }

    /// Serialize terms to pretty JSON.
    ///
    /// # Errors
    ///
    /// `LoanError::Internal` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, LoanError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LoanError::internal(format!("serialize terms: {e}")))
    }
}
