//! Marking installments as paid.

use super::expense::{ExpenseRecord, PaymentSchedule, Person};
use super::month::BillingMonth;
use super::ScheduleError;

/// Marks `person`'s share of the installment for `month` as paid and
/// deactivates the record once it is fully settled.
///
/// Marking an already paid share leaves the record unchanged.
pub fn mark_paid(
    mut record: ExpenseRecord,
    month: BillingMonth,
    person: Person,
) -> Result<ExpenseRecord, ScheduleError> {
    let installments = match &mut record.schedule {
        PaymentSchedule::Installments { installments } => installments,
        PaymentSchedule::Legacy { .. } => {
            return Err(ScheduleError::InvalidInput(format!(
                "payment item {} has no installment schedule",
                record.id
            )))
        }
    };

    let installment = installments
        .iter_mut()
        .find(|installment| installment.month == month)
        .ok_or_else(|| {
            ScheduleError::NotFound(format!(
                "installment for {} not found in payment item {}",
                month, record.id
            ))
        })?;
    installment.mark_paid(person);

    refresh_active(&mut record);
    Ok(record)
}

/// Applies the settlement rule: a non-fixed record with every installment
/// fully paid becomes inactive.
pub fn refresh_active(record: &mut ExpenseRecord) {
    if record.is_settled() {
        record.active = false;
    }
}
