//! In-process record store, used for local runs and tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ports::{Column, RecordStore, Row, RowPatch, StoreError, StoreResult};

#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    rows: Arc<RwLock<Vec<Row>>>,
    offline: Arc<AtomicBool>,
    rejected_column: Arc<Mutex<Option<Column>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows)),
            ..Self::default()
        }
    }

    /// While offline every call fails as if the remote store were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes every update that writes `column` fail as unavailable, while
    /// other calls keep working. `None` clears it.
    pub fn reject_updates_to(&self, column: Option<Column>) {
        if let Ok(mut rejected) = self.rejected_column.lock() {
            *rejected = column;
        }
    }

    fn check_patch(&self, patch: &RowPatch) -> StoreResult<()> {
        let rejected = self.rejected_column.lock().map(|c| *c).unwrap_or(None);
        match rejected {
            Some(column) if patch.get(column).is_some() => Err(StoreError::Unavailable(format!(
                "memory store rejected write to {}",
                column.header()
            ))),
            _ => Ok(()),
        }
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

fn position_of(rows: &[Row], id: &str) -> Option<usize> {
    rows.iter()
        .position(|row| row.get(Column::Id.index()).map(String::as_str) == Some(id))
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn ensure_headers(&self) -> StoreResult<()> {
        self.check_online()
    }

    async fn list_all(&self) -> StoreResult<Vec<Row>> {
        self.check_online()?;
        Ok(self.rows.read().await.clone())
    }

    async fn create(&self, mut row: Row) -> StoreResult<String> {
        self.check_online()?;
        let id = Uuid::new_v4().to_string();
        if row.is_empty() {
            row.push(String::new());
        }
        row[Column::Id.index()] = id.clone();
        self.rows.write().await.push(row);
        Ok(id)
    }

    async fn update(&self, id: &str, patch: &RowPatch) -> StoreResult<bool> {
        self.check_online()?;
        self.check_patch(patch)?;
        let mut rows = self.rows.write().await;
        match position_of(&rows, id) {
            Some(index) => {
                patch.apply(&mut rows[index]);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.check_online()?;
        let mut rows = self.rows.write().await;
        match position_of(&rows, id) {
            Some(index) => {
                rows.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
