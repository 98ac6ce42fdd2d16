use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::ports::RecordStore;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub dependencies: HashMap<String, DependencyStatus>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyStatus {
    Healthy { status: String, latency_ms: u64 },
    Unhealthy { status: String, error: String },
}

#[async_trait]
pub trait DependencyChecker: Send + Sync {
    async fn check(&self) -> DependencyStatus;
}

/// Probes the record store with a full read.
pub struct RecordStoreChecker {
    store: Arc<dyn RecordStore>,
}

impl RecordStoreChecker {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DependencyChecker for RecordStoreChecker {
    async fn check(&self) -> DependencyStatus {
        let start = Instant::now();
        match self.store.list_all().await {
            Ok(_) => DependencyStatus::Healthy {
                status: "healthy".to_string(),
                latency_ms: start.elapsed().as_millis() as u64,
            },
            Err(e) => DependencyStatus::Unhealthy {
                status: "unhealthy".to_string(),
                error: e.to_string(),
            },
        }
    }
}

/// Runs every named checker, each bounded by a five second timeout.
pub async fn check_health(checkers: &[(&str, &dyn DependencyChecker)]) -> HealthResponse {
    let timeout_duration = Duration::from_secs(5);

    let mut dependencies = HashMap::new();
    for (name, checker) in checkers {
        let result = timeout(timeout_duration, checker.check()).await;
        dependencies.insert(
            name.to_string(),
            result.unwrap_or_else(|_| DependencyStatus::Unhealthy {
                status: "unhealthy".to_string(),
                error: "timeout".to_string(),
            }),
        );
    }

    HealthResponse {
        status: determine_overall_status(&dependencies),
        version: env!("CARGO_PKG_VERSION").to_string(),
        dependencies,
    }
}

fn determine_overall_status(dependencies: &HashMap<String, DependencyStatus>) -> String {
    let any_failure = dependencies
        .values()
        .any(|status| matches!(status, DependencyStatus::Unhealthy { .. }));

    if any_failure {
        "unhealthy".to_string()
    } else {
        "healthy".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryRecordStore;

    struct Failing;

    #[async_trait]
    impl DependencyChecker for Failing {
        async fn check(&self) -> DependencyStatus {
            DependencyStatus::Unhealthy {
                status: "unhealthy".to_string(),
                error: "down".to_string(),
            }
        }
    }

    #[tokio::test]
    async fn reports_store_state() {
        let store = MemoryRecordStore::new();
        let checker = RecordStoreChecker::new(Arc::new(store.clone()));
        let health = check_health(&[("record_store", &checker as &dyn DependencyChecker)]).await;
        assert!(health.is_healthy());

        store.set_offline(true);
        let health = check_health(&[("record_store", &checker as &dyn DependencyChecker)]).await;
        assert!(!health.is_healthy());
        assert!(matches!(
            health.dependencies.get("record_store"),
            Some(DependencyStatus::Unhealthy { .. })
        ));
    }

    #[tokio::test]
    async fn any_failing_dependency_is_unhealthy() {
        let checker = RecordStoreChecker::new(Arc::new(MemoryRecordStore::new()));
        let health = check_health(&[
            ("record_store", &checker as &dyn DependencyChecker),
            ("identity", &Failing as &dyn DependencyChecker),
        ])
        .await;

        assert!(!health.is_healthy());
        assert_eq!(health.dependencies.len(), 2);
        assert!(matches!(
            health.dependencies.get("record_store"),
            Some(DependencyStatus::Healthy { .. })
        ));

        assert!(check_health(&[]).await.is_healthy());
    }
}
