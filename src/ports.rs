//! Collaborator interfaces: the record store holding expense rows and the
//! identity provider verifying bearer tokens.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// One spreadsheet row, one cell per [`Column`].
pub type Row = Vec<String>;

/// Column layout of the payments sheet, A through O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Name,
    TotalAmount,
    InstallmentCount,
    SplitPercentA,
    SplitPercentB,
    CreatedAt,
    Active,
    FixedExpense,
    ManualAmountA,
    ManualAmountB,
    PaidA,
    PaidB,
    Schedule,
    StartInCurrentMonth,
}

impl Column {
    pub const ALL: [Column; 15] = [
        Column::Id,
        Column::Name,
        Column::TotalAmount,
        Column::InstallmentCount,
        Column::SplitPercentA,
        Column::SplitPercentB,
        Column::CreatedAt,
        Column::Active,
        Column::FixedExpense,
        Column::ManualAmountA,
        Column::ManualAmountB,
        Column::PaidA,
        Column::PaidB,
        Column::Schedule,
        Column::StartInCurrentMonth,
    ];

    /// Letter of the last column, for A1 ranges.
    pub const LAST_LETTER: char = 'O';

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn header(self) -> &'static str {
        match self {
            Column::Id => "ID",
            Column::Name => "Name",
            Column::TotalAmount => "Total Amount",
            Column::InstallmentCount => "Installments",
            Column::SplitPercentA => "Percent A",
            Column::SplitPercentB => "Percent B",
            Column::CreatedAt => "Created At",
            Column::Active => "Active",
            Column::FixedExpense => "Fixed Expense",
            Column::ManualAmountA => "Manual Amount A",
            Column::ManualAmountB => "Manual Amount B",
            Column::PaidA => "Paid A",
            Column::PaidB => "Paid B",
            Column::Schedule => "Schedule",
            Column::StartInCurrentMonth => "Start In Current Month",
        }
    }

    pub fn headers() -> Row {
        Self::ALL.iter().map(|c| c.header().to_string()).collect()
    }
}

/// A partial row update: only the listed cells change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPatch {
    cells: Vec<(Column, String)>,
}

impl RowPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: Column, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.cells.iter_mut().find(|(c, _)| *c == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
        self
    }

    pub fn get(&self, column: Column) -> Option<&str> {
        self.cells
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Writes the patched cells into `row`, padding it to full width.
    pub fn apply(&self, row: &mut Row) {
        if row.len() < Column::ALL.len() {
            row.resize(Column::ALL.len(), String::new());
        }
        for (column, value) in &self.cells {
            row[column.index()] = value.clone();
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed record: {0}")]
    Malformed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row-level access to the expense records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Writes the header row when it is missing or incomplete.
    async fn ensure_headers(&self) -> StoreResult<()>;

    async fn list_all(&self) -> StoreResult<Vec<Row>>;

    /// Appends `row` and returns the id the store assigned to it.
    async fn create(&self, row: Row) -> StoreResult<String>;

    /// Returns `false` when no row has `id`.
    async fn update(&self, id: &str, patch: &RowPatch) -> StoreResult<bool>;

    /// Physically removes the row. Returns `false` when no row has `id`.
    async fn delete(&self, id: &str) -> StoreResult<bool>;
}

/// Verified caller identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub subject_id: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}
