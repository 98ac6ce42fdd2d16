//! Household expense domain: records, installment schedules, monthly
//! summaries and payment marking. Everything here is synchronous and free of
//! I/O.

pub mod expense;
pub mod month;
pub mod schedule;
pub mod settlement;
pub mod summary;

pub use expense::{ExpenseRecord, Installment, PaymentSchedule, Person};
pub use month::{BillingMonth, MonthParseError};
pub use schedule::{ScheduleParams, FIXED_EXPENSE_HORIZON_MONTHS, MAX_INSTALLMENTS};
pub use summary::Summary;

use bigdecimal::BigDecimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),
}

impl From<MonthParseError> for ScheduleError {
    fn from(err: MonthParseError) -> Self {
        ScheduleError::InvalidInput(err.to_string())
    }
}

/// Rounds half-up to cents and pins the scale, so `50` renders as `50.00`.
pub fn round_money(value: &BigDecimal) -> BigDecimal {
    value.round(2).with_scale(2)
}

/// `amount * percent / 100`, at full precision.
pub fn percent_of(amount: &BigDecimal, percent: &BigDecimal) -> BigDecimal {
    (amount.clone() * percent.clone()) / BigDecimal::from(100)
}

pub(crate) fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

#[cfg(test)]
pub(crate) fn dec(value: &str) -> BigDecimal {
    use std::str::FromStr;
    BigDecimal::from_str(value).expect("valid decimal")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_up_to_two_places() {
        assert_eq!(round_money(&dec("33.333333")).to_string(), "33.33");
        assert_eq!(round_money(&dec("0.125")).to_string(), "0.13");
        assert_eq!(round_money(&dec("50")).to_string(), "50.00");
    }

    #[test]
    fn computes_percentage_share() {
        assert_eq!(percent_of(&dec("1200"), &dec("50")), dec("600"));
        assert_eq!(percent_of(&dec("100"), &dec("33.5")), dec("33.5"));
    }
}
