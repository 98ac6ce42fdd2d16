//! Record store backed by one tab of a Google spreadsheet.

use async_trait::async_trait;
use uuid::Uuid;

use crate::ports::{Column, RecordStore, Row, RowPatch, StoreError, StoreResult};
use crate::sheets::{SheetsClient, SheetsError};

/// How many times a row is looked up again when its position shifted
/// between the sheet read and the write.
const LOCATE_ATTEMPTS: usize = 3;

impl From<SheetsError> for StoreError {
    fn from(err: SheetsError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

pub struct SheetsRecordStore {
    client: SheetsClient,
    sheet_name: String,
    sheet_tab_id: i64,
}

impl SheetsRecordStore {
    pub fn new(client: SheetsClient, sheet_name: impl Into<String>, sheet_tab_id: i64) -> Self {
        Self {
            client,
            sheet_name: sheet_name.into(),
            sheet_tab_id,
        }
    }

    pub fn circuit_state(&self) -> String {
        self.client.circuit_state()
    }

    fn range(&self, cells: &str) -> String {
        format!("{}!{}", self.sheet_name, cells)
    }

    /// Data row `n` (zero-based, header excluded) lives on sheet row `n + 2`.
    fn row_range(&self, position: usize) -> String {
        let sheet_row = position + 2;
        self.range(&format!("A{}:{}{}", sheet_row, Column::LAST_LETTER, sheet_row))
    }

    async fn data_rows(&self) -> StoreResult<Vec<Row>> {
        Ok(self.client.get_values(&self.range("A2:Z")).await?)
    }

    /// Locates `id` in the current data rows, returning its position and row.
    async fn find(&self, id: &str) -> StoreResult<Option<(usize, Row)>> {
        let rows = self.data_rows().await?;
        Ok(rows.into_iter().enumerate().find(|(_, row)| {
            row.get(Column::Id.index()).map(|cell| cell.trim()) == Some(id)
        }))
    }

    /// Reads only the ID cell of data row `position`.
    async fn id_at(&self, position: usize) -> StoreResult<Option<String>> {
        let sheet_row = position + 2;
        let cells = self
            .client
            .get_values(&self.range(&format!("A{0}:A{0}", sheet_row)))
            .await?;
        Ok(cells
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .map(|cell| cell.trim().to_string()))
    }

    /// Like [`find`](Self::find), but re-reads the ID cell right before the
    /// caller writes, so a row shifted by a concurrent delete is looked up
    /// again instead of overwritten. The sheet has no conditional writes, so
    /// a shift between this check and the write itself is still possible.
    async fn locate(&self, id: &str) -> StoreResult<Option<(usize, Row)>> {
        for _ in 0..LOCATE_ATTEMPTS {
            let Some((position, row)) = self.find(id).await? else {
                return Ok(None);
            };
            if self.id_at(position).await?.as_deref() == Some(id) {
                return Ok(Some((position, row)));
            }
            tracing::warn!(id = %id, position, "Payment row moved, looking it up again");
        }

        Err(StoreError::Unavailable(format!(
            "row of payment item {} kept moving during the write",
            id
        )))
    }
}

#[async_trait]
impl RecordStore for SheetsRecordStore {
    async fn ensure_headers(&self) -> StoreResult<()> {
        let existing = self.client.get_values(&self.range("A1:Z1")).await?;
        let width = existing.first().map(Vec::len).unwrap_or(0);
        if width >= Column::ALL.len() {
            return Ok(());
        }

        tracing::info!(
            sheet = %self.sheet_name,
            existing_columns = width,
            "Writing payment sheet headers"
        );
        let range = self.range(&format!("A1:{}1", Column::LAST_LETTER));
        self.client
            .update_values(&range, vec![Column::headers()])
            .await?;
        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<Row>> {
        self.data_rows().await
    }

    async fn create(&self, mut row: Row) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        row.resize(Column::ALL.len(), String::new());
        row[Column::Id.index()] = id.clone();

        let range = self.range(&format!("A:{}", Column::LAST_LETTER));
        self.client.append_values(&range, vec![row]).await?;
        tracing::debug!(id = %id, sheet = %self.sheet_name, "Appended payment row");
        Ok(id)
    }

    async fn update(&self, id: &str, patch: &RowPatch) -> StoreResult<bool> {
        let Some((position, mut row)) = self.locate(id).await? else {
            return Ok(false);
        };

        patch.apply(&mut row);
        row.truncate(Column::ALL.len());
        self.client
            .update_values(&self.row_range(position), vec![row])
            .await?;
        Ok(true)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let Some((position, _)) = self.locate(id).await? else {
            return Ok(false);
        };

        // Sheet row `position + 2` is zero-based index `position + 1`.
        self.client
            .delete_rows(self.sheet_tab_id, position + 1, position + 2)
            .await?;
        tracing::info!(id = %id, sheet = %self.sheet_name, "Deleted payment row");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::{AccessTokenProvider, TokenSource};

    fn store() -> SheetsRecordStore {
        let client = SheetsClient::new(
            "https://sheets.example.com/v4".to_string(),
            "sheet-123".to_string(),
            AccessTokenProvider::new(TokenSource::Static("token".to_string())),
        );
        SheetsRecordStore::new(client, "Payments", 7)
    }

    #[test]
    fn maps_positions_to_sheet_rows() {
        let store = store();
        assert_eq!(store.row_range(0), "Payments!A2:O2");
        assert_eq!(store.row_range(9), "Payments!A11:O11");
    }

    #[test]
    fn sheets_errors_make_store_unavailable() {
        let err: StoreError = SheetsError::CircuitBreakerOpen("open".to_string()).into();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
