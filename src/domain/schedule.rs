//! Installment generation.

use bigdecimal::BigDecimal;

use super::expense::{Installment, Person};
use super::month::BillingMonth;
use super::{percent_of, round_money, ScheduleError};

/// Fixed expenses have no natural end; their schedule covers ten years.
pub const FIXED_EXPENSE_HORIZON_MONTHS: i64 = 120;

/// Upper bound on installment counts: fifty years, five fixed horizons.
pub const MAX_INSTALLMENTS: i64 = 5 * FIXED_EXPENSE_HORIZON_MONTHS;

/// Inputs of the installment generator.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleParams {
    pub total_amount: BigDecimal,
    pub installment_count: i64,
    pub split_percent_a: BigDecimal,
    pub split_percent_b: BigDecimal,
    pub start_in_current_month: bool,
    pub is_fixed_expense: bool,
    pub manual_amount_a: Option<BigDecimal>,
    pub manual_amount_b: Option<BigDecimal>,
}

impl ScheduleParams {
    fn split_for(&self, person: Person) -> &BigDecimal {
        match person {
            Person::A => &self.split_percent_a,
            Person::B => &self.split_percent_b,
        }
    }

    /// Manual amounts apply only to fixed expenses, and only as a pair.
    fn manual_for(&self, person: Person) -> Option<&BigDecimal> {
        if !self.is_fixed_expense {
            return None;
        }
        match (&self.manual_amount_a, &self.manual_amount_b) {
            (Some(a), Some(b)) => Some(match person {
                Person::A => a,
                Person::B => b,
            }),
            _ => None,
        }
    }

    /// Unrounded amount `person` owes each month, or `None` when an
    /// installment expense has no positive count to divide by.
    pub fn monthly_share(&self, person: Person) -> Option<BigDecimal> {
        if let Some(manual) = self.manual_for(person) {
            return Some(manual.clone());
        }

        let share = percent_of(&self.total_amount, self.split_for(person));
        if self.is_fixed_expense {
            return Some(share);
        }
        if self.installment_count <= 0 {
            return None;
        }
        Some(share / BigDecimal::from(self.installment_count))
    }

    /// Number of months the schedule spans.
    pub fn effective_count(&self) -> Result<i64, ScheduleError> {
        if self.is_fixed_expense {
            return Ok(FIXED_EXPENSE_HORIZON_MONTHS);
        }
        if self.installment_count <= 0 {
            return Err(ScheduleError::InvalidInput(
                "installment_count must be greater than zero".to_string(),
            ));
        }
        if self.installment_count > MAX_INSTALLMENTS {
            return Err(too_many_installments());
        }
        Ok(self.installment_count)
    }

    /// First month of a new schedule created during `current`.
    pub fn anchor(&self, current: BillingMonth) -> Result<BillingMonth, ScheduleError> {
        if self.start_in_current_month {
            Ok(current)
        } else {
            current.next().map_err(|_| past_last_month(current))
        }
    }
}

/// Generates a schedule anchored on the real current month.
pub fn generate(params: &ScheduleParams) -> Result<Vec<Installment>, ScheduleError> {
    generate_from(params, BillingMonth::current())
}

/// Generates a schedule as if today fell in `current`.
pub fn generate_from(
    params: &ScheduleParams,
    current: BillingMonth,
) -> Result<Vec<Installment>, ScheduleError> {
    build_from_anchor(params, params.anchor(current)?)
}

/// Emits one installment per consecutive month starting at `anchor`.
pub fn build_from_anchor(
    params: &ScheduleParams,
    anchor: BillingMonth,
) -> Result<Vec<Installment>, ScheduleError> {
    let count = params.effective_count()?;
    let amount_a = rounded_share(params, Person::A)?;
    let amount_b = rounded_share(params, Person::B)?;

    let mut installments = Vec::with_capacity(count as usize);
    let mut month = anchor;
    for index in 0..count {
        if index > 0 {
            month = month.next().map_err(|_| past_last_month(month))?;
        }
        installments.push(Installment::new(month, amount_a.clone(), amount_b.clone()));
    }

    Ok(installments)
}

/// Rebuilds a schedule after the financial terms of a record changed.
///
/// The new schedule keeps the first month of `existing` and carries paid
/// flags over for months present in both.
pub fn regenerate(
    existing: &[Installment],
    params: &ScheduleParams,
    current: BillingMonth,
) -> Result<Vec<Installment>, ScheduleError> {
    let anchor = match existing.first() {
        Some(installment) => installment.month,
        None => params.anchor(current)?,
    };

    let mut installments = build_from_anchor(params, anchor)?;
    for installment in installments.iter_mut() {
        if let Some(previous) = existing.iter().find(|p| p.month == installment.month) {
            installment.paid_a = previous.paid_a;
            installment.paid_b = previous.paid_b;
        }
    }

    Ok(installments)
}

/// Checks that a client-supplied schedule has one entry per consecutive
/// month.
pub fn validate_sequence(installments: &[Installment]) -> Result<(), ScheduleError> {
    if installments.is_empty() {
        return Err(ScheduleError::InvalidInput(
            "installments must not be empty".to_string(),
        ));
    }
    if installments.len() as i64 > MAX_INSTALLMENTS {
        return Err(too_many_installments());
    }

    for pair in installments.windows(2) {
        if pair[0].month.next().ok() != Some(pair[1].month) {
            return Err(ScheduleError::InvalidInput(format!(
                "installment {} must be followed by the next month, found {}",
                pair[0].month, pair[1].month
            )));
        }
    }

    Ok(())
}

fn too_many_installments() -> ScheduleError {
    ScheduleError::InvalidInput(format!(
        "installment_count must be at most {}",
        MAX_INSTALLMENTS
    ))
}

fn past_last_month(month: BillingMonth) -> ScheduleError {
    ScheduleError::InvalidInput(format!("schedule cannot run past {}", month))
}

fn rounded_share(params: &ScheduleParams, person: Person) -> Result<BigDecimal, ScheduleError> {
    params
        .monthly_share(person)
        .map(|share| round_money(&share))
        .ok_or_else(|| {
            ScheduleError::InvalidInput("installment_count must be greater than zero".to_string())
        })
}
