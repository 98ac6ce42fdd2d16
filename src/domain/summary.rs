//! Monthly summary of what each person owes.

use bigdecimal::BigDecimal;
use serde::Serialize;

use super::expense::{ExpenseRecord, Installment, PaymentSchedule, Person};
use super::month::BillingMonth;
use super::{round_money, zero};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_amount_a: BigDecimal,
    pub total_amount_b: BigDecimal,
    pub outstanding_a: BigDecimal,
    pub outstanding_b: BigDecimal,
    pub unpaid_this_month_a: BigDecimal,
    pub unpaid_this_month_b: BigDecimal,
    pub current_month: BillingMonth,
    pub items: Vec<ExpenseRecord>,
    /// Records found fully paid while summarizing. They are reported here as
    /// inactive so the caller can persist the change.
    pub settled_ids: Vec<String>,
}

/// What one record adds to one person's totals.
#[derive(Debug, Clone, PartialEq)]
struct Contribution {
    due: BigDecimal,
    unpaid: BigDecimal,
    outstanding: BigDecimal,
}

#[derive(Debug, Default)]
struct Totals {
    due: BigDecimal,
    unpaid: BigDecimal,
    outstanding: BigDecimal,
}

impl Totals {
    fn add(&mut self, contribution: Contribution) {
        self.due += contribution.due;
        self.unpaid += contribution.unpaid;
        self.outstanding += contribution.outstanding;
    }
}

/// Aggregates the active records for `current_month`.
pub fn summarize(records: Vec<ExpenseRecord>, current_month: BillingMonth) -> Summary {
    let mut totals_a = Totals::default();
    let mut totals_b = Totals::default();
    let mut items = Vec::new();
    let mut settled_ids = Vec::new();

    for mut record in records.into_iter().filter(|record| record.active) {
        if record.is_settled() {
            record.active = false;
            settled_ids.push(record.id);
            continue;
        }

        match (
            contribution(&record, Person::A, current_month),
            contribution(&record, Person::B, current_month),
        ) {
            (Some(a), Some(b)) => {
                totals_a.add(a);
                totals_b.add(b);
            }
            _ => tracing::warn!(
                item_id = %record.id,
                installment_count = record.installment_count,
                "Skipping payment item with no usable installment count"
            ),
        }

        items.push(record);
    }

    Summary {
        total_amount_a: round_money(&totals_a.due),
        total_amount_b: round_money(&totals_b.due),
        outstanding_a: round_money(&totals_a.outstanding),
        outstanding_b: round_money(&totals_b.outstanding),
        unpaid_this_month_a: round_money(&totals_a.unpaid),
        unpaid_this_month_b: round_money(&totals_b.unpaid),
        current_month,
        items,
        settled_ids,
    }
}

fn contribution(
    record: &ExpenseRecord,
    person: Person,
    current_month: BillingMonth,
) -> Option<Contribution> {
    match &record.schedule {
        PaymentSchedule::Installments { installments } => Some(scheduled_contribution(
            record,
            installments,
            person,
            current_month,
        )),
        PaymentSchedule::Legacy { paid_a, paid_b } => {
            let paid = match person {
                Person::A => *paid_a,
                Person::B => *paid_b,
            };
            legacy_contribution(record, person, paid)
        }
    }
}

fn scheduled_contribution(
    record: &ExpenseRecord,
    installments: &[Installment],
    person: Person,
    current_month: BillingMonth,
) -> Contribution {
    let this_month = installments.iter().find(|i| i.month == current_month);

    let due = this_month
        .map(|i| i.amount_for(person).clone())
        .unwrap_or_else(zero);
    let unpaid = match this_month {
        Some(i) if !i.is_paid_by(person) => due.clone(),
        _ => zero(),
    };

    let outstanding = if record.is_fixed_expense {
        zero()
    } else {
        let paid = installments
            .iter()
            .filter(|i| i.is_paid_by(person))
            .fold(zero(), |acc, i| acc + i.amount_for(person).clone());
        non_negative(record.total_due(person) - paid)
    };

    Contribution {
        due,
        unpaid,
        outstanding,
    }
}

fn legacy_contribution(record: &ExpenseRecord, person: Person, paid: bool) -> Option<Contribution> {
    let monthly = record.schedule_params().monthly_share(person)?;

    let outstanding = if record.is_fixed_expense {
        zero()
    } else {
        non_negative(record.total_due(person) - monthly.clone())
    };
    let unpaid = if paid { zero() } else { monthly.clone() };

    Some(Contribution {
        due: monthly,
        unpaid,
        outstanding,
    })
}

fn non_negative(value: BigDecimal) -> BigDecimal {
    if value < zero() {
        zero()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dec;
    use crate::domain::expense::fixtures::{loan, monthly};

    fn month(raw: &str) -> BillingMonth {
        raw.parse().unwrap()
    }

    #[test]
    fn empty_records_yield_zero_totals() {
        let summary = summarize(Vec::new(), month("10/2026"));
        assert_eq!(summary.total_amount_a, dec("0"));
        assert_eq!(summary.total_amount_b, dec("0"));
        assert_eq!(summary.outstanding_a, dec("0"));
        assert_eq!(summary.unpaid_this_month_b, dec("0"));
        assert_eq!(summary.current_month.to_string(), "10/2026");
        assert_eq!(summary.total_amount_a.to_string(), "0.00");
        assert!(summary.items.is_empty());
        assert!(summary.settled_ids.is_empty());
    }

    #[test]
    fn sums_current_month_installment() {
        let mut installments = monthly("01/2025", 12, "50", "50");
        installments[0].paid_a = true;
        installments[0].paid_b = true;
        installments[1].paid_a = true;
        let record = loan(installments);

        let summary = summarize(vec![record], month("02/2025"));
        assert_eq!(summary.total_amount_a, dec("50"));
        assert_eq!(summary.total_amount_b, dec("50"));
        assert_eq!(summary.unpaid_this_month_a, dec("0"));
        assert_eq!(summary.unpaid_this_month_b, dec("50"));
        assert_eq!(summary.outstanding_a, dec("500"));
        assert_eq!(summary.outstanding_b, dec("550"));
        assert_eq!(summary.items.len(), 1);
    }

    #[test]
    fn month_outside_schedule_contributes_nothing_due() {
        let record = loan(monthly("01/2025", 3, "200", "200"));
        let summary = summarize(vec![record], month("06/2025"));
        assert_eq!(summary.total_amount_a, dec("0"));
        assert_eq!(summary.outstanding_a, dec("600"));
    }

    #[test]
    fn fixed_expense_has_no_outstanding_balance() {
        let mut record = loan(monthly("01/2025", 120, "100", "50"));
        record.is_fixed_expense = true;

        let summary = summarize(vec![record], month("03/2025"));
        assert_eq!(summary.total_amount_a, dec("100"));
        assert_eq!(summary.total_amount_b, dec("50"));
        assert_eq!(summary.outstanding_a, dec("0"));
        assert_eq!(summary.outstanding_b, dec("0"));
    }

    #[test]
    fn inactive_records_are_ignored() {
        let mut record = loan(monthly("01/2025", 12, "50", "50"));
        record.active = false;
        let summary = summarize(vec![record], month("01/2025"));
        assert_eq!(summary.total_amount_a, dec("0"));
        assert!(summary.items.is_empty());
    }

    #[test]
    fn settled_records_are_deactivated_and_reported() {
        let mut installments = monthly("01/2025", 2, "300", "300");
        for installment in installments.iter_mut() {
            installment.paid_a = true;
            installment.paid_b = true;
        }
        let settled = loan(installments);
        let open = ExpenseRecord {
            id: "item-2".to_string(),
            ..loan(monthly("01/2025", 12, "50", "50"))
        };

        let summary = summarize(vec![settled, open], month("01/2025"));
        assert_eq!(summary.settled_ids, vec!["item-1".to_string()]);
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.items[0].id, "item-2");
        assert_eq!(summary.total_amount_a, dec("50"));
    }

    #[test]
    fn legacy_record_uses_deprecated_flags() {
        let mut record = loan(Vec::new());
        record.installment_count = 12;
        record.schedule = PaymentSchedule::Legacy {
            paid_a: true,
            paid_b: false,
        };

        let summary = summarize(vec![record], month("07/2025"));
        assert_eq!(summary.total_amount_a, dec("50"));
        assert_eq!(summary.total_amount_b, dec("50"));
        assert_eq!(summary.unpaid_this_month_a, dec("0"));
        assert_eq!(summary.unpaid_this_month_b, dec("50"));
        assert_eq!(summary.outstanding_a, dec("550"));
    }

    #[test]
    fn legacy_fixed_record_with_manual_amounts() {
        let mut record = loan(Vec::new());
        record.is_fixed_expense = true;
        record.installment_count = 1;
        record.manual_amount_a = Some(dec("80"));
        record.manual_amount_b = Some(dec("20"));
        record.schedule = PaymentSchedule::Legacy {
            paid_a: false,
            paid_b: false,
        };

        let summary = summarize(vec![record], month("07/2025"));
        assert_eq!(summary.total_amount_a, dec("80"));
        assert_eq!(summary.unpaid_this_month_b, dec("20"));
        assert_eq!(summary.outstanding_a, dec("0"));
    }

    #[test]
    fn legacy_record_without_count_is_skipped_from_totals() {
        let mut record = loan(Vec::new());
        record.installment_count = 0;
        record.schedule = PaymentSchedule::Legacy {
            paid_a: false,
            paid_b: false,
        };

        let summary = summarize(vec![record], month("07/2025"));
        assert_eq!(summary.total_amount_a, dec("0"));
        assert_eq!(summary.items.len(), 1);
    }

    #[test]
    fn rounds_only_at_the_boundary() {
        let mut first = loan(monthly("01/2025", 3, "33.333", "0"));
        first.id = "a".to_string();
        let mut second = loan(monthly("01/2025", 3, "33.333", "0"));
        second.id = "b".to_string();

        let summary = summarize(vec![first, second], month("01/2025"));
        assert_eq!(summary.total_amount_a.to_string(), "66.67");
    }
}
