//! Expense record entity and its installment schedule.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::month::BillingMonth;
use super::schedule::ScheduleParams;
use super::{percent_of, ScheduleError};

/// One of the two people sharing the household expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Person {
    A,
    B,
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Person::A => write!(f, "a"),
            Person::B => write!(f, "b"),
        }
    }
}

impl FromStr for Person {
    type Err = ScheduleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a" | "person_a" | "person1" => Ok(Person::A),
            "b" | "person_b" | "person2" => Ok(Person::B),
            other => Err(ScheduleError::InvalidInput(format!(
                "person must be 'person1' or 'person2', got '{}'",
                other
            ))),
        }
    }
}

/// The share each person owes for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub month: BillingMonth,
    pub amount_a: BigDecimal,
    pub amount_b: BigDecimal,
    #[serde(default)]
    pub paid_a: bool,
    #[serde(default)]
    pub paid_b: bool,
}

impl Installment {
    pub fn new(month: BillingMonth, amount_a: BigDecimal, amount_b: BigDecimal) -> Self {
        Self {
            month,
            amount_a,
            amount_b,
            paid_a: false,
            paid_b: false,
        }
    }

    pub fn amount_for(&self, person: Person) -> &BigDecimal {
        match person {
            Person::A => &self.amount_a,
            Person::B => &self.amount_b,
        }
    }

    pub fn is_paid_by(&self, person: Person) -> bool {
        match person {
            Person::A => self.paid_a,
            Person::B => self.paid_b,
        }
    }

    pub fn mark_paid(&mut self, person: Person) {
        match person {
            Person::A => self.paid_a = true,
            Person::B => self.paid_b = true,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.paid_a && self.paid_b
    }
}

/// How a record tracks payments.
///
/// Records written before per-month schedules existed only carry one paid
/// flag per person; they are kept readable as `Legacy`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PaymentSchedule {
    Installments { installments: Vec<Installment> },
    Legacy { paid_a: bool, paid_b: bool },
}

impl PaymentSchedule {
    pub fn installments(&self) -> Option<&[Installment]> {
        match self {
            PaymentSchedule::Installments { installments } => Some(installments),
            PaymentSchedule::Legacy { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseRecord {
    pub id: String,
    pub name: String,
    pub total_amount: BigDecimal,
    pub installment_count: i64,
    pub split_percent_a: BigDecimal,
    pub split_percent_b: BigDecimal,
    pub is_fixed_expense: bool,
    pub manual_amount_a: Option<BigDecimal>,
    pub manual_amount_b: Option<BigDecimal>,
    pub start_in_current_month: bool,
    pub created_at: String,
    pub active: bool,
    #[serde(flatten)]
    pub schedule: PaymentSchedule,
}

impl ExpenseRecord {
    pub fn schedule_params(&self) -> ScheduleParams {
        ScheduleParams {
            total_amount: self.total_amount.clone(),
            installment_count: self.installment_count,
            split_percent_a: self.split_percent_a.clone(),
            split_percent_b: self.split_percent_b.clone(),
            start_in_current_month: self.start_in_current_month,
            is_fixed_expense: self.is_fixed_expense,
            manual_amount_a: self.manual_amount_a.clone(),
            manual_amount_b: self.manual_amount_b.clone(),
        }
    }

    pub fn split_for(&self, person: Person) -> &BigDecimal {
        match person {
            Person::A => &self.split_percent_a,
            Person::B => &self.split_percent_b,
        }
    }

    /// What `person` owes over the whole life of the record.
    pub fn total_due(&self, person: Person) -> BigDecimal {
        percent_of(&self.total_amount, self.split_for(person))
    }

    pub fn installments(&self) -> Option<&[Installment]> {
        self.schedule.installments()
    }

    /// True when a non-fixed record has every installment paid by both
    /// people. Fixed expenses never settle.
    pub fn is_settled(&self) -> bool {
        if self.is_fixed_expense {
            return false;
        }
        match self.installments() {
            Some(installments) if !installments.is_empty() => {
                installments.iter().all(Installment::is_settled)
            }
            _ => false,
        }
    }
}
