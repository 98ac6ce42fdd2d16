//! Minimal Google Sheets v4 client: value ranges and row deletion.

mod client;
mod credentials;

pub use client::{SheetsClient, DEFAULT_SHEETS_API_URL};
pub use credentials::{AccessTokenProvider, ServiceAccountKey, TokenSource};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Sheets API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Invalid Sheets URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid credentials: {0}")]
    Credentials(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}
