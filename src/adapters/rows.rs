//! Mapping between spreadsheet rows and expense records.

use bigdecimal::BigDecimal;
use std::str::FromStr;

use crate::domain::{ExpenseRecord, Installment, PaymentSchedule};
use crate::ports::{Column, Row, RowPatch, StoreError};

/// Rows with fewer cells than this are partial writes and are skipped.
const MIN_CELLS: usize = 7;

pub fn record_to_row(record: &ExpenseRecord) -> Result<Row, StoreError> {
    let mut row = vec![String::new(); Column::ALL.len()];
    record_patch(record)?.apply(&mut row);
    row[Column::Id.index()] = record.id.clone();
    row[Column::CreatedAt.index()] = record.created_at.clone();
    Ok(row)
}

/// Every mutable cell of `record`: all columns except id and creation time.
pub fn record_patch(record: &ExpenseRecord) -> Result<RowPatch, StoreError> {
    let (paid_a, paid_b) = match &record.schedule {
        PaymentSchedule::Legacy { paid_a, paid_b } => (*paid_a, *paid_b),
        PaymentSchedule::Installments { .. } => (false, false),
    };

    Ok(RowPatch::new()
        .set(Column::Name, record.name.clone())
        .set(Column::TotalAmount, record.total_amount.to_string())
        .set(Column::InstallmentCount, record.installment_count.to_string())
        .set(Column::SplitPercentA, record.split_percent_a.to_string())
        .set(Column::SplitPercentB, record.split_percent_b.to_string())
        .set(Column::Active, format_bool(record.active))
        .set(Column::FixedExpense, format_bool(record.is_fixed_expense))
        .set(Column::ManualAmountA, format_optional(&record.manual_amount_a))
        .set(Column::ManualAmountB, format_optional(&record.manual_amount_b))
        .set(Column::PaidA, format_bool(paid_a))
        .set(Column::PaidB, format_bool(paid_b))
        .set(Column::Schedule, schedule_cell(&record.schedule)?)
        .set(
            Column::StartInCurrentMonth,
            format_bool(record.start_in_current_month),
        ))
}

/// The cells touched when a payment is marked.
pub fn schedule_patch(record: &ExpenseRecord) -> Result<RowPatch, StoreError> {
    Ok(RowPatch::new().set(Column::Schedule, schedule_cell(&record.schedule)?))
}

pub fn active_patch(active: bool) -> RowPatch {
    RowPatch::new().set(Column::Active, format_bool(active))
}

fn schedule_cell(schedule: &PaymentSchedule) -> Result<String, StoreError> {
    match schedule {
        PaymentSchedule::Installments { installments } => serde_json::to_string(installments)
            .map_err(|e| StoreError::Malformed(format!("schedule: {}", e))),
        PaymentSchedule::Legacy { .. } => Ok(String::new()),
    }
}

pub fn record_from_row(row: &[String]) -> Result<ExpenseRecord, StoreError> {
    let id = cell(row, Column::Id).to_string();
    if id.is_empty() {
        return Err(StoreError::Malformed("row has no id".to_string()));
    }

    let schedule = match cell(row, Column::Schedule) {
        "" => None,
        raw => {
            let installments: Vec<Installment> = serde_json::from_str(raw)
                .map_err(|e| StoreError::Malformed(format!("{}: schedule: {}", id, e)))?;
            Some(installments).filter(|list| !list.is_empty())
        }
    };
    let schedule = match schedule {
        Some(installments) => PaymentSchedule::Installments { installments },
        None => PaymentSchedule::Legacy {
            paid_a: parse_bool(cell(row, Column::PaidA), false),
            paid_b: parse_bool(cell(row, Column::PaidB), false),
        },
    };

    Ok(ExpenseRecord {
        name: cell(row, Column::Name).to_string(),
        total_amount: parse_decimal(&id, row, Column::TotalAmount)?,
        installment_count: parse_count(&id, row)?,
        split_percent_a: parse_decimal(&id, row, Column::SplitPercentA)?,
        split_percent_b: parse_decimal(&id, row, Column::SplitPercentB)?,
        is_fixed_expense: parse_bool(cell(row, Column::FixedExpense), false),
        manual_amount_a: parse_optional_decimal(&id, row, Column::ManualAmountA)?,
        manual_amount_b: parse_optional_decimal(&id, row, Column::ManualAmountB)?,
        start_in_current_month: parse_bool(cell(row, Column::StartInCurrentMonth), true),
        created_at: cell(row, Column::CreatedAt).to_string(),
        active: parse_bool(cell(row, Column::Active), true),
        schedule,
        id,
    })
}

/// Decodes every usable row. Short and malformed rows are logged and
/// skipped.
pub fn parse_rows(rows: Vec<Row>) -> Vec<ExpenseRecord> {
    let mut records = Vec::with_capacity(rows.len());
    for (position, row) in rows.iter().enumerate() {
        if row.len() < MIN_CELLS {
            continue;
        }
        match record_from_row(row) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(row = position + 2, error = %e, "Skipping unreadable row"),
        }
    }
    tracing::debug!("Loaded {} payment items", records.len());
    records
}

fn cell(row: &[String], column: Column) -> &str {
    row.get(column.index()).map(|v| v.trim()).unwrap_or("")
}

fn format_bool(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

fn format_optional(value: &Option<BigDecimal>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

fn parse_bool(raw: &str, default: bool) -> bool {
    if raw.is_empty() {
        default
    } else {
        raw.eq_ignore_ascii_case("true")
    }
}

fn parse_decimal(id: &str, row: &[String], column: Column) -> Result<BigDecimal, StoreError> {
    match cell(row, column) {
        "" => Ok(BigDecimal::from(0)),
        raw => BigDecimal::from_str(raw).map_err(|_| {
            StoreError::Malformed(format!("{}: {} is not a number: '{}'", id, column.header(), raw))
        }),
    }
}

fn parse_optional_decimal(
    id: &str,
    row: &[String],
    column: Column,
) -> Result<Option<BigDecimal>, StoreError> {
    match cell(row, column) {
        "" | "None" | "null" => Ok(None),
        _ => parse_decimal(id, row, column).map(Some),
    }
}

fn parse_count(id: &str, row: &[String]) -> Result<i64, StoreError> {
    match cell(row, Column::InstallmentCount) {
        "" => Ok(1),
        raw => raw.parse().map_err(|_| {
            StoreError::Malformed(format!("{}: installment count is not an integer: '{}'", id, raw))
        }),
    }
}
