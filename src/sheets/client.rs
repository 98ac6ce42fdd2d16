use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use super::{AccessTokenProvider, SheetsError};

pub const DEFAULT_SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4";

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// HTTP client for one spreadsheet.
#[derive(Clone)]
pub struct SheetsClient {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    tokens: AccessTokenProvider,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl SheetsClient {
    pub fn new(base_url: String, spreadsheet_id: String, tokens: AccessTokenProvider) -> Self {
        Self::with_circuit_breaker(base_url, spreadsheet_id, tokens, 3, 60)
    }

    pub fn with_circuit_breaker(
        base_url: String,
        spreadsheet_id: String,
        tokens: AccessTokenProvider,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        SheetsClient {
            client,
            base_url,
            spreadsheet_id,
            tokens,
            circuit_breaker,
        }
    }

    /// Returns the current state of the circuit breaker
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    /// Reads a range. Every cell comes back as a string; empty trailing
    /// cells are omitted by the API, so rows may be ragged.
    pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.url(&["values", range])?;
        let request = self.client.get(url);

        let body: ValueRange = self.execute(request).await?.json().await?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    /// Overwrites a range with raw (unparsed) values.
    pub async fn update_values(
        &self,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), SheetsError> {
        let url = self.url(&["values", range])?;
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": values }));

        self.execute(request).await.map(|_| ())
    }

    /// Appends rows after the last row of the table found in `range`.
    pub async fn append_values(
        &self,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), SheetsError> {
        let segment = format!("{}:append", range);
        let url = self.url(&["values", segment.as_str()])?;
        let request = self
            .client
            .post(url)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "majorDimension": "ROWS", "values": values }));

        self.execute(request).await.map(|_| ())
    }

    /// Deletes rows `[start, end)` (zero-based) from the tab `sheet_id`.
    pub async fn delete_rows(
        &self,
        sheet_id: i64,
        start: usize,
        end: usize,
    ) -> Result<(), SheetsError> {
        let batch = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.spreadsheets_url(&[batch.as_str()])?;

        let request = self.client.post(url).json(&json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": end,
                    }
                }
            }]
        }));

        self.execute(request).await.map(|_| ())
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut path = vec![self.spreadsheet_id.as_str()];
        path.extend_from_slice(segments);
        self.spreadsheets_url(&path)
    }

    fn spreadsheets_url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SheetsError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push("spreadsheets")
            .extend(segments);
        Ok(url)
    }

    /// Authorizes `request` and sends it through the circuit breaker.
    /// Non-2xx answers count as failures.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, SheetsError> {
        let token = self.tokens.token(&self.client).await?;
        let request = request.bearer_auth(token);

        let result = self
            .circuit_breaker
            .call(async move {
                let response = request.send().await?;
                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return Err(SheetsError::Api { status, body });
                }
                Ok(response)
            })
            .await;

        match result {
            Ok(response) => Ok(response),
            Err(FailsafeError::Rejected) => Err(SheetsError::CircuitBreakerOpen(
                "Sheets API circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
