use bigdecimal::BigDecimal;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::adapters::rows::{active_patch, parse_rows, record_patch, record_to_row, schedule_patch};
use crate::domain::schedule::{generate, regenerate, validate_sequence};
use crate::domain::settlement::{mark_paid, refresh_active};
use crate::domain::summary::summarize;
use crate::domain::{
    BillingMonth, ExpenseRecord, Installment, PaymentSchedule, Person, ScheduleParams, Summary,
    MAX_INSTALLMENTS,
};
use crate::error::AppError;
use crate::ports::RecordStore;
use crate::validation::{
    validate_count_range, validate_name, validate_non_negative, validate_positive_amount,
    validate_split,
};

const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn default_count() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub total_amount: BigDecimal,
    #[serde(default = "default_count")]
    pub installment_count: i64,
    pub split_percent_a: BigDecimal,
    pub split_percent_b: BigDecimal,
    #[serde(default)]
    pub is_fixed_expense: bool,
    #[serde(default)]
    pub manual_amount_a: Option<BigDecimal>,
    #[serde(default)]
    pub manual_amount_b: Option<BigDecimal>,
    #[serde(default = "default_true")]
    pub start_in_current_month: bool,
}

/// Partial update: absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub total_amount: Option<BigDecimal>,
    pub installment_count: Option<i64>,
    pub split_percent_a: Option<BigDecimal>,
    pub split_percent_b: Option<BigDecimal>,
    pub active: Option<bool>,
    pub is_fixed_expense: Option<bool>,
    pub manual_amount_a: Option<BigDecimal>,
    pub manual_amount_b: Option<BigDecimal>,
    pub start_in_current_month: Option<bool>,
    /// Legacy paid flags; only records without a schedule accept them.
    pub paid_a: Option<bool>,
    pub paid_b: Option<bool>,
    pub installments: Option<Vec<Installment>>,
}

impl UpdateItemRequest {
    fn changes_terms(&self) -> bool {
        self.total_amount.is_some()
            || self.installment_count.is_some()
            || self.split_percent_a.is_some()
            || self.split_percent_b.is_some()
            || self.is_fixed_expense.is_some()
            || self.manual_amount_a.is_some()
            || self.manual_amount_b.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentMarked {
    pub message: String,
    pub item: ExpenseRecord,
}

/// Expense bookkeeping on top of a [`RecordStore`].
#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn RecordStore>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    /// Writes the header row of the backing sheet if needed.
    pub async fn prepare_store(&self) -> Result<(), AppError> {
        self.store.ensure_headers().await?;
        Ok(())
    }

    pub async fn list_items(&self) -> Result<Vec<ExpenseRecord>, AppError> {
        Ok(parse_rows(self.store.list_all().await?))
    }

    pub async fn get_item(&self, id: &str) -> Result<ExpenseRecord, AppError> {
        self.list_items()
            .await?
            .into_iter()
            .find(|record| record.id == id)
            .ok_or_else(|| not_found(id))
    }

    /// Summarizes `month` (default: the current month) and persists the
    /// deactivation of records found settled on the way.
    pub async fn summary(&self, month: Option<BillingMonth>) -> Result<Summary, AppError> {
        let month = month.unwrap_or_else(BillingMonth::current);
        let summary = summarize(self.list_items().await?, month);

        for id in &summary.settled_ids {
            match self.store.update(id, &active_patch(false)).await {
                Ok(_) => tracing::info!(item_id = %id, "Deactivated settled payment item"),
                Err(e) => {
                    tracing::warn!(item_id = %id, error = %e, "Failed to deactivate settled item")
                }
            }
        }

        Ok(summary)
    }

    pub async fn create_item(&self, request: CreateItemRequest) -> Result<ExpenseRecord, AppError> {
        let name = validate_name(&request.name)?;
        validate_positive_amount("total_amount", &request.total_amount)?;
        validate_count_range(
            "installment_count",
            request.installment_count,
            MAX_INSTALLMENTS,
        )?;
        validate_split(&request.split_percent_a, &request.split_percent_b)?;
        validate_manual_amounts(&request.manual_amount_a, &request.manual_amount_b)?;

        let params = ScheduleParams {
            total_amount: request.total_amount,
            installment_count: request.installment_count,
            split_percent_a: request.split_percent_a,
            split_percent_b: request.split_percent_b,
            start_in_current_month: request.start_in_current_month,
            is_fixed_expense: request.is_fixed_expense,
            manual_amount_a: request.manual_amount_a,
            manual_amount_b: request.manual_amount_b,
        };
        let installments = generate(&params)?;

        let mut record = ExpenseRecord {
            id: String::new(),
            name,
            total_amount: params.total_amount,
            installment_count: params.installment_count,
            split_percent_a: params.split_percent_a,
            split_percent_b: params.split_percent_b,
            is_fixed_expense: params.is_fixed_expense,
            manual_amount_a: params.manual_amount_a,
            manual_amount_b: params.manual_amount_b,
            start_in_current_month: params.start_in_current_month,
            created_at: Local::now().format(CREATED_AT_FORMAT).to_string(),
            active: true,
            schedule: PaymentSchedule::Installments { installments },
        };

        record.id = self.store.create(record_to_row(&record)?).await?;
        tracing::info!(
            item_id = %record.id,
            name = %record.name,
            fixed = record.is_fixed_expense,
            "Created payment item"
        );
        Ok(record)
    }

    pub async fn update_item(
        &self,
        id: &str,
        request: UpdateItemRequest,
    ) -> Result<ExpenseRecord, AppError> {
        let mut record = self.get_item(id).await?;
        let regenerate_schedule = request.changes_terms() && request.installments.is_none();

        if let Some(name) = &request.name {
            record.name = validate_name(name)?;
        }
        if let Some(total_amount) = request.total_amount {
            validate_positive_amount("total_amount", &total_amount)?;
            record.total_amount = total_amount;
        }
        if let Some(count) = request.installment_count {
            validate_count_range("installment_count", count, MAX_INSTALLMENTS)?;
            record.installment_count = count;
        }
        if request.split_percent_a.is_some() || request.split_percent_b.is_some() {
            let percent_a = request
                .split_percent_a
                .unwrap_or_else(|| record.split_percent_a.clone());
            let percent_b = request
                .split_percent_b
                .unwrap_or_else(|| record.split_percent_b.clone());
            validate_split(&percent_a, &percent_b)?;
            record.split_percent_a = percent_a;
            record.split_percent_b = percent_b;
        }
        if let Some(fixed) = request.is_fixed_expense {
            record.is_fixed_expense = fixed;
        }
        validate_manual_amounts(&request.manual_amount_a, &request.manual_amount_b)?;
        if request.manual_amount_a.is_some() {
            record.manual_amount_a = request.manual_amount_a;
        }
        if request.manual_amount_b.is_some() {
            record.manual_amount_b = request.manual_amount_b;
        }
        if let Some(start) = request.start_in_current_month {
            record.start_in_current_month = start;
        }
        if let Some(active) = request.active {
            record.active = active;
        }

        if request.paid_a.is_some() || request.paid_b.is_some() {
            match &mut record.schedule {
                PaymentSchedule::Legacy { paid_a, paid_b } => {
                    *paid_a = request.paid_a.unwrap_or(*paid_a);
                    *paid_b = request.paid_b.unwrap_or(*paid_b);
                }
                PaymentSchedule::Installments { .. } => {
                    return Err(AppError::InvalidInput(
                        "paid flags apply to records without installments; mark installments instead"
                            .to_string(),
                    ))
                }
            }
        }

        if let Some(installments) = request.installments {
            validate_sequence(&installments)?;
            record.schedule = PaymentSchedule::Installments { installments };
        } else if regenerate_schedule {
            if let PaymentSchedule::Installments { installments } = &record.schedule {
                let rebuilt =
                    regenerate(installments, &record.schedule_params(), BillingMonth::current())?;
                record.schedule = PaymentSchedule::Installments {
                    installments: rebuilt,
                };
            }
        }

        refresh_active(&mut record);

        if !self.store.update(id, &record_patch(&record)?).await? {
            return Err(not_found(id));
        }
        tracing::info!(item_id = %id, active = record.active, "Updated payment item");
        Ok(record)
    }

    /// Deactivates the record, or removes its row when `hard` is set.
    pub async fn delete_item(&self, id: &str, hard: bool) -> Result<(), AppError> {
        let found = if hard {
            self.store.delete(id).await?
        } else {
            self.store.update(id, &active_patch(false)).await?
        };

        if !found {
            return Err(not_found(id));
        }
        tracing::info!(item_id = %id, hard, "Removed payment item");
        Ok(())
    }

    pub async fn mark_installment_paid(
        &self,
        id: &str,
        month: &str,
        person: &str,
    ) -> Result<PaymentMarked, AppError> {
        let month: BillingMonth = month.trim().parse()?;
        let person: Person = person.parse()?;

        let record = self.get_item(id).await?;
        let was_active = record.active;
        let record = mark_paid(record, month, person)?;

        if !self.store.update(id, &schedule_patch(&record)?).await? {
            return Err(not_found(id));
        }

        if was_active && !record.active {
            // The payment itself is already stored; a failed deactivation
            // is picked up again by the next summary.
            match self.store.update(id, &active_patch(false)).await {
                Ok(_) => tracing::info!(item_id = %id, "Payment item fully settled"),
                Err(e) => tracing::warn!(
                    item_id = %id,
                    error = %e,
                    "Failed to deactivate settled payment item"
                ),
            }
        }

        tracing::info!(item_id = %id, month = %month, person = %person, "Installment marked paid");
        Ok(PaymentMarked {
            message: format!("installment {} marked paid for person {}", month, person),
            item: record,
        })
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("payment item {} not found", id))
}

fn validate_manual_amounts(
    manual_a: &Option<BigDecimal>,
    manual_b: &Option<BigDecimal>,
) -> Result<(), AppError> {
    if let Some(amount) = manual_a {
        validate_non_negative("manual_amount_a", amount)?;
    }
    if let Some(amount) = manual_b {
        validate_non_negative("manual_amount_b", amount)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryRecordStore;
    use crate::domain::dec;
    use crate::domain::expense::fixtures::{loan, monthly};
    use crate::ports::Column;

    fn service() -> (PaymentService, MemoryRecordStore) {
        let store = MemoryRecordStore::new();
        (PaymentService::new(Arc::new(store.clone())), store)
    }

    fn loan_request() -> CreateItemRequest {
        CreateItemRequest {
            name: " Laptop ".to_string(),
            total_amount: dec("1200"),
            installment_count: 12,
            split_percent_a: dec("50"),
            split_percent_b: dec("50"),
            is_fixed_expense: false,
            manual_amount_a: None,
            manual_amount_b: None,
            start_in_current_month: true,
        }
    }

    #[tokio::test]
    async fn creates_and_reads_back_items() {
        let (service, _) = service();
        let created = service.create_item(loan_request()).await.unwrap();

        assert!(!created.id.is_empty());
        assert_eq!(created.name, "Laptop");
        assert_eq!(created.installments().unwrap().len(), 12);
        assert_eq!(service.get_item(&created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn rejects_invalid_creates() {
        let (service, _) = service();

        let mut request = loan_request();
        request.split_percent_b = dec("40");
        assert!(matches!(
            service.create_item(request).await,
            Err(AppError::InvalidInput(_))
        ));

        let mut request = loan_request();
        request.installment_count = 0;
        assert!(matches!(
            service.create_item(request).await,
            Err(AppError::InvalidInput(_))
        ));

        let mut request = loan_request();
        request.total_amount = dec("-5");
        assert!(matches!(
            service.create_item(request).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn partial_split_update_is_checked_against_stored_side() {
        let (service, _) = service();
        let created = service.create_item(loan_request()).await.unwrap();

        let request = UpdateItemRequest {
            split_percent_a: Some(dec("70")),
            ..Default::default()
        };
        assert!(matches!(
            service.update_item(&created.id, request).await,
            Err(AppError::InvalidInput(_))
        ));

        let request = UpdateItemRequest {
            split_percent_a: Some(dec("70")),
            split_percent_b: Some(dec("30")),
            ..Default::default()
        };
        let updated = service.update_item(&created.id, request).await.unwrap();
        let first = &updated.installments().unwrap()[0];
        assert_eq!(first.amount_a, dec("70.00"));
        assert_eq!(first.amount_b, dec("30.00"));
    }

    #[tokio::test]
    async fn term_changes_keep_paid_months() {
        let (service, _) = service();
        let created = service.create_item(loan_request()).await.unwrap();
        let first_month = created.installments().unwrap()[0].month.to_string();
        service
            .mark_installment_paid(&created.id, &first_month, "a")
            .await
            .unwrap();

        let request = UpdateItemRequest {
            installment_count: Some(6),
            ..Default::default()
        };
        let updated = service.update_item(&created.id, request).await.unwrap();
        let installments = updated.installments().unwrap();
        assert_eq!(installments.len(), 6);
        assert!(installments[0].paid_a);
        assert_eq!(installments[0].amount_a, dec("100.00"));
    }

    #[tokio::test]
    async fn marking_last_installment_deactivates() {
        let (service, _) = service();
        let mut request = loan_request();
        request.installment_count = 1;
        let created = service.create_item(request).await.unwrap();
        let month = created.installments().unwrap()[0].month.to_string();

        let marked = service
            .mark_installment_paid(&created.id, &month, "person1")
            .await
            .unwrap();
        assert!(marked.item.active);

        let marked = service
            .mark_installment_paid(&created.id, &month, "person2")
            .await
            .unwrap();
        assert!(!marked.item.active);
        assert!(!service.get_item(&created.id).await.unwrap().active);
    }

    #[tokio::test]
    async fn mark_errors_map_to_request_errors() {
        let (service, _) = service();
        let created = service.create_item(loan_request()).await.unwrap();

        assert!(matches!(
            service.mark_installment_paid(&created.id, "01/1999", "a").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.mark_installment_paid(&created.id, "1999-01", "a").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            service.mark_installment_paid(&created.id, "01/2025", "carol").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            service.mark_installment_paid("missing", "01/2025", "a").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn soft_and_hard_delete() {
        let (service, _) = service();
        let first = service.create_item(loan_request()).await.unwrap();
        let second = service.create_item(loan_request()).await.unwrap();

        service.delete_item(&first.id, false).await.unwrap();
        assert!(!service.get_item(&first.id).await.unwrap().active);

        service.delete_item(&second.id, true).await.unwrap();
        assert!(matches!(
            service.get_item(&second.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_item("missing", false).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn summary_persists_settled_records() {
        let mut installments = monthly("01/2025", 2, "300", "300");
        for installment in installments.iter_mut() {
            installment.paid_a = true;
            installment.paid_b = true;
        }
        let settled = loan(installments);
        let store = MemoryRecordStore::with_rows(vec![record_to_row(&settled).unwrap()]);
        let service = PaymentService::new(Arc::new(store));

        let summary = service.summary(Some("01/2025".parse().unwrap())).await.unwrap();
        assert!(summary.items.is_empty());
        assert_eq!(summary.settled_ids, vec!["item-1".to_string()]);
        assert!(!service.get_item("item-1").await.unwrap().active);
    }

    #[tokio::test]
    async fn failed_deactivation_keeps_the_payment() {
        let (service, store) = service();
        let mut request = loan_request();
        request.installment_count = 1;
        let created = service.create_item(request).await.unwrap();
        let month = created.installments().unwrap()[0].month.to_string();
        service
            .mark_installment_paid(&created.id, &month, "a")
            .await
            .unwrap();

        store.reject_updates_to(Some(Column::Active));
        let marked = service
            .mark_installment_paid(&created.id, &month, "b")
            .await
            .unwrap();
        assert!(!marked.item.active);

        let stored = service.get_item(&created.id).await.unwrap();
        assert!(stored.active);
        assert!(stored.installments().unwrap()[0].is_settled());
    }

    #[tokio::test]
    async fn summary_survives_failed_write_back() {
        let mut installments = monthly("01/2025", 1, "300", "300");
        installments[0].paid_a = true;
        installments[0].paid_b = true;
        let store = MemoryRecordStore::with_rows(vec![record_to_row(&loan(installments)).unwrap()]);
        store.reject_updates_to(Some(Column::Active));
        let service = PaymentService::new(Arc::new(store));

        let summary = service.summary(Some("01/2025".parse().unwrap())).await.unwrap();
        assert_eq!(summary.settled_ids, vec!["item-1".to_string()]);
        assert!(summary.items.is_empty());
        assert!(service.get_item("item-1").await.unwrap().active);
    }

    #[tokio::test]
    async fn installment_count_is_bounded() {
        let (service, _) = service();

        for count in [MAX_INSTALLMENTS + 1, 100_000, i64::MAX] {
            let mut request = loan_request();
            request.installment_count = count;
            assert!(matches!(
                service.create_item(request).await,
                Err(AppError::InvalidInput(_))
            ));
        }
        assert!(service.list_items().await.unwrap().is_empty());

        let mut request = loan_request();
        request.installment_count = MAX_INSTALLMENTS;
        let created = service.create_item(request).await.unwrap();
        assert_eq!(
            service.get_item(&created.id).await.unwrap().installments().unwrap().len(),
            MAX_INSTALLMENTS as usize
        );

        let request = UpdateItemRequest {
            installment_count: Some(100_000),
            ..Default::default()
        };
        assert!(matches!(
            service.update_item(&created.id, request).await,
            Err(AppError::InvalidInput(_))
        ));
        assert_eq!(
            service.get_item(&created.id).await.unwrap().installment_count,
            MAX_INSTALLMENTS
        );
    }

    #[tokio::test]
    async fn store_outage_is_upstream_unavailable() {
        let (service, store) = service();
        store.set_offline(true);
        assert!(matches!(
            service.list_items().await,
            Err(AppError::UpstreamUnavailable(_))
        ));
    }
}
