use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use url::Url;

use crate::sheets::DEFAULT_SHEETS_API_URL;

#[derive(Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub store: StoreConfig,
    pub identity: IdentityConfig,
    pub allowed_origins: AllowedOrigins,
    pub person_a_name: String,
    pub person_b_name: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    Memory,
    Sheets(SheetsConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub sheet_tab_id: i64,
    pub api_url: String,
    pub credentials: CredentialsSource,
}

/// Where the service-account key comes from. The inline variant is not
/// printed anywhere.
#[derive(Clone, PartialEq)]
pub enum CredentialsSource {
    File(PathBuf),
    Base64(String),
}

impl std::fmt::Debug for CredentialsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialsSource::File(path) => write!(f, "File({})", path.display()),
            CredentialsSource::Base64(_) => write!(f, "Base64(****)"),
        }
    }
}

#[derive(Clone, PartialEq)]
pub enum IdentityConfig {
    Firebase { project_id: String },
    SharedSecret { secret: String },
}

impl IdentityConfig {
    pub fn describe(&self) -> String {
        match self {
            IdentityConfig::Firebase { project_id } => format!("firebase ({})", project_id),
            IdentityConfig::SharedSecret { .. } => "shared secret (HS256)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from a variable lookup, so tests do not
    /// have to touch the process environment.
    pub fn from_vars<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let server_port = match var("SERVER_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("SERVER_PORT is not a port number: '{}'", raw))?,
            None => 8000,
        };

        let store = match var("STORE_BACKEND")
            .unwrap_or_else(|| "sheets".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StoreConfig::Memory,
            "sheets" => StoreConfig::Sheets(sheets_config(&var)?),
            other => anyhow::bail!("STORE_BACKEND must be 'sheets' or 'memory', got '{}'", other),
        };

        let identity = match (var("FIREBASE_PROJECT_ID"), var("AUTH_JWT_SECRET")) {
            (Some(project_id), _) => IdentityConfig::Firebase { project_id },
            (None, Some(secret)) => IdentityConfig::SharedSecret { secret },
            (None, None) => {
                anyhow::bail!("either FIREBASE_PROJECT_ID or AUTH_JWT_SECRET must be set")
            }
        };

        let log_format = match var("LOG_FORMAT").as_deref() {
            Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Config {
            server_host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port,
            store,
            identity,
            allowed_origins: parse_allowed_origins(
                &var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string()),
            )?,
            person_a_name: var("PERSON_A_NAME").unwrap_or_else(|| "Person A".to_string()),
            person_b_name: var("PERSON_B_NAME").unwrap_or_else(|| "Person B".to_string()),
            log_format,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn sheets_config(var: &dyn Fn(&str) -> Option<String>) -> Result<SheetsConfig> {
    let sheet_url = var("GOOGLE_SHEETS_URL");
    let spreadsheet_id = match (var("GOOGLE_SHEETS_ID"), &sheet_url) {
        (Some(id), _) => id,
        (None, Some(url)) => spreadsheet_id_from_url(url)?,
        (None, None) => {
            anyhow::bail!("GOOGLE_SHEETS_URL or GOOGLE_SHEETS_ID is required for the sheets store")
        }
    };

    let sheet_tab_id = match var("SHEET_TAB_ID") {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("SHEET_TAB_ID is not an integer: '{}'", raw))?,
        None => sheet_url.as_deref().and_then(tab_id_from_url).unwrap_or(0),
    };

    let credentials = match (
        var("GOOGLE_SERVICE_ACCOUNT_FILE"),
        var("GOOGLE_SERVICE_ACCOUNT_BASE64"),
    ) {
        (Some(path), _) => CredentialsSource::File(PathBuf::from(path)),
        (None, Some(encoded)) => CredentialsSource::Base64(encoded),
        (None, None) => anyhow::bail!(
            "GOOGLE_SERVICE_ACCOUNT_FILE or GOOGLE_SERVICE_ACCOUNT_BASE64 is required for the sheets store"
        ),
    };

    let api_url = var("SHEETS_API_URL").unwrap_or_else(|| DEFAULT_SHEETS_API_URL.to_string());
    Url::parse(&api_url).context("SHEETS_API_URL is not a valid URL")?;

    Ok(SheetsConfig {
        spreadsheet_id,
        sheet_name: var("SHEET_NAME").unwrap_or_else(|| "Sheet1".to_string()),
        sheet_tab_id,
        api_url,
        credentials,
    })
}

/// Extracts the id from a `https://docs.google.com/spreadsheets/d/<id>/...`
/// link.
pub fn spreadsheet_id_from_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw).context("GOOGLE_SHEETS_URL is not a valid URL")?;
    let mut segments = url
        .path_segments()
        .context("GOOGLE_SHEETS_URL has no path")?;

    while let Some(segment) = segments.next() {
        if segment == "d" {
            if let Some(id) = segments.next().filter(|id| !id.is_empty()) {
                return Ok(id.to_string());
            }
        }
    }
    anyhow::bail!("GOOGLE_SHEETS_URL does not contain a spreadsheet id: {}", raw)
}

/// The `gid` of the tab a sheet link points at, if any.
fn tab_id_from_url(raw: &str) -> Option<i64> {
    let url = Url::parse(raw).ok()?;
    let from_fragment = url
        .fragment()
        .and_then(|fragment| fragment.split('&').find_map(|part| part.strip_prefix("gid=")))
        .map(str::to_string);
    let from_query = url
        .query_pairs()
        .find(|(key, _)| key == "gid")
        .map(|(_, value)| value.into_owned());

    from_fragment.or(from_query)?.parse().ok()
}

fn parse_allowed_origins(raw: &str) -> Result<AllowedOrigins> {
    let value = raw.trim();
    if value == "*" {
        return Ok(AllowedOrigins::Any);
    }

    let origins = value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            Url::parse(entry)
                .map(|_| entry.trim_end_matches('/').to_string())
                .with_context(|| format!("invalid origin in CORS_ALLOWED_ORIGINS: '{}'", entry))
        })
        .collect::<Result<Vec<_>>>()?;

    if origins.is_empty() {
        anyhow::bail!("CORS_ALLOWED_ORIGINS must be '*' or a comma-separated list of origins");
    }

    Ok(AllowedOrigins::List(origins))
}
