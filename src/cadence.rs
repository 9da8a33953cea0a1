//! Installment cadence and scheduler wake-up instructions.
//!
//! A schedule does not own a clock. It declares how often installments fall
//! due and at which point of the simulation cycle they are processed; the
//! contract turns that into a [`Wakeup`] that the caller hands to whatever
//! drives simulated time.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Position of a payment event within a single simulated time step.
///
/// Events due at the same instant are processed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrder {
    /// Interbank lending, settled first.
    InterbankLoanPayments,
    /// Central bank facilities.
    CentralBankLoanPayments,
    /// Commercial and household loans.
    CommercialLoanPayments,
    /// Government bonds.
    GiltPayments,
    /// Corporate bonds.
    BondPayments,
    /// Repurchase agreements, settled last.
    RepoLoanPayments,
}

impl Default for EventOrder {
    fn default() -> Self {
        Self::CommercialLoanPayments
    }
}

impl fmt::Display for EventOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InterbankLoanPayments => write!(f, "interbank_loan_payments"),
            Self::CentralBankLoanPayments => write!(f, "central_bank_loan_payments"),
            Self::CommercialLoanPayments => write!(f, "commercial_loan_payments"),
            Self::GiltPayments => write!(f, "gilt_payments"),
            Self::BondPayments => write!(f, "bond_payments"),
            Self::RepoLoanPayments => write!(f, "repo_loan_payments"),
        }
    }
}

/// How often installments fall due, and when within a step they are settled.
///
/// # Examples
///
/// ```
/// use repayment_engine::{Cadence, EventOrder};
/// use chrono::Duration;
///
/// let weekly = Cadence::new(EventOrder::BondPayments, Duration::days(7)).unwrap();
/// assert_eq!(weekly.interval, Duration::days(7));
/// assert!(Cadence::new(EventOrder::BondPayments, Duration::zero()).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cadence {
    /// Event ordering used for every installment of the schedule.
    #[serde(default)]
    pub order: EventOrder,

    /// Time between consecutive installments.
    #[serde(with = "duration_seconds", rename = "interval_seconds")]
    pub interval: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            order: EventOrder::default(),
            interval: Duration::days(1),
        }
    }
}

impl Cadence {
    /// Creates a validated cadence.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NonPositiveInterval` if `interval <= 0`.
    pub fn new(order: EventOrder, interval: Duration) -> Result<Self, ValidationError> {
        let cadence = Self { order, interval };
        cadence.validate()?;
        Ok(cadence)
    }

    /// One installment per simulated day, settled with commercial loans.
    #[must_use]
    pub fn daily() -> Self {
        Self::default()
    }

    /// Validate the interval.
    ///
    /// # Errors
    ///
    /// - `ValidationError::NonPositiveInterval` if `interval <= 0`
    /// - `ValidationError::FractionalInterval` if `interval` is not a whole
    ///   number of seconds; intervals are configured in seconds
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval <= Duration::zero() {
            return Err(ValidationError::NonPositiveInterval {
                seconds: self.interval.num_seconds(),
            });
        }
        if self.interval.subsec_nanos() != 0 {
            return Err(ValidationError::FractionalInterval {
                millis: self.interval.num_milliseconds(),
            });
        }
        Ok(())
    }

    /// The wake-up instruction for the next installment.
    #[must_use]
    pub const fn wakeup(&self) -> Wakeup {
        Wakeup {
            order: self.order,
            after: self.interval,
        }
    }
}

/// Instruction to invoke the installment handler once more.
///
/// The handler fires `after` the current simulated time, at `order` within
/// that step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Wakeup {
    /// Event ordering within the target step.
    pub order: EventOrder,
    /// Delay relative to the current simulated time.
    pub after: Duration,
}

mod duration_seconds {
    use chrono::Duration;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = i64::deserialize(deserializer)?;
        Duration::try_seconds(seconds)
            .ok_or_else(|| D::Error::custom(format!("interval of {seconds}s is out of range")))
    }
}
