use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::adapters::{MemoryRecordStore, SheetsRecordStore};
use crate::config::{AllowedOrigins, Config, CredentialsSource, IdentityConfig, StoreConfig};
use crate::identity::{FirebaseVerifier, SharedSecretVerifier};
use crate::ports::{IdentityProvider, RecordStore};
use crate::services::PaymentService;
use crate::sheets::{AccessTokenProvider, ServiceAccountKey, SheetsClient, TokenSource};
use crate::{AppState, PersonLabels};

pub struct ValidationReport {
    pub environment: bool,
    pub store: bool,
    pub identity: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.environment && self.store && self.identity
    }

    pub fn print(&self) {
        println!("\n=== Startup Validation Report ===");
        println!("Environment Variables: {}", status(self.environment));
        println!("Record Store:          {}", status(self.store));
        println!("Identity Provider:     {}", status(self.identity));

        if !self.errors.is_empty() {
            println!("\nErrors:");
            for error in &self.errors {
                println!("  ❌ {}", error);
            }
        }

        println!("\nOverall Status: {}", if self.is_valid() { "✅ PASS" } else { "❌ FAIL" });
        println!("=================================\n");
    }
}

fn status(ok: bool) -> &'static str {
    if ok { "✅ OK" } else { "❌ FAIL" }
}

pub fn build_record_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match &config.store {
        StoreConfig::Memory => {
            tracing::warn!("Using the in-memory record store; data is lost on restart");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
        StoreConfig::Sheets(sheets) => {
            let key = match &sheets.credentials {
                CredentialsSource::File(path) => ServiceAccountKey::from_file(path),
                CredentialsSource::Base64(encoded) => ServiceAccountKey::from_base64(encoded),
            }
            .context("Failed to load Google service account credentials")?;

            tracing::info!(
                spreadsheet_id = %sheets.spreadsheet_id,
                sheet = %sheets.sheet_name,
                client_email = %key.client_email,
                "Sheets record store configured"
            );

            let client = SheetsClient::new(
                sheets.api_url.clone(),
                sheets.spreadsheet_id.clone(),
                AccessTokenProvider::new(TokenSource::ServiceAccount(key)),
            );
            Ok(Arc::new(SheetsRecordStore::new(
                client,
                sheets.sheet_name.clone(),
                sheets.sheet_tab_id,
            )))
        }
    }
}

pub fn build_identity_provider(config: &Config) -> Arc<dyn IdentityProvider> {
    match &config.identity {
        IdentityConfig::Firebase { project_id } => Arc::new(FirebaseVerifier::new(project_id.clone())),
        IdentityConfig::SharedSecret { secret } => Arc::new(SharedSecretVerifier::new(secret)),
    }
}

pub fn build_state(config: &Config) -> Result<AppState> {
    Ok(AppState {
        payments: PaymentService::new(build_record_store(config)?),
        identity: build_identity_provider(config),
        people: PersonLabels {
            person_a: config.person_a_name.clone(),
            person_b: config.person_b_name.clone(),
        },
    })
}

pub fn cors_layer(origins: &AllowedOrigins) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match origins {
        AllowedOrigins::Any => Ok(layer.allow_origin(Any)),
        AllowedOrigins::List(list) => {
            let values = list
                .iter()
                .map(|origin| {
                    HeaderValue::from_str(origin)
                        .with_context(|| format!("invalid CORS origin '{}'", origin))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(layer.allow_origin(AllowOrigin::list(values)))
        }
    }
}

/// Builds every collaborator and probes the record store once.
pub async fn validate_environment(config: &Config) -> ValidationReport {
    let mut report = ValidationReport {
        environment: true,
        store: true,
        identity: true,
        errors: Vec::new(),
    };

    if let Err(e) = validate_env_vars(config) {
        report.environment = false;
        report.errors.push(format!("Environment: {}", e));
    }

    match build_record_store(config) {
        Ok(store) => {
            if let Err(e) = store.list_all().await {
                report.store = false;
                report.errors.push(format!("Record store: {}", e));
            }
        }
        Err(e) => {
            report.store = false;
            report.errors.push(format!("Record store: {:#}", e));
        }
    }

    if let IdentityConfig::SharedSecret { secret } = &config.identity {
        if secret.len() < 16 {
            report.identity = false;
            report
                .errors
                .push("Identity: AUTH_JWT_SECRET should be at least 16 characters".to_string());
        }
    }

    report
}

fn validate_env_vars(config: &Config) -> Result<()> {
    if config.server_port == 0 {
        anyhow::bail!("SERVER_PORT must be greater than 0");
    }
    if config.person_a_name == config.person_b_name {
        anyhow::bail!("PERSON_A_NAME and PERSON_B_NAME must differ");
    }
    Ok(())
}
