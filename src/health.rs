//! Component health reporting.
//!
//! Probes report a status value; deciding what to do about a failed probe is
//! left to whoever reads the report.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl ComponentHealth {
    pub fn up(message: impl Into<String>, details: BTreeMap<String, String>) -> Self {
        Self {
            status: HealthStatus::Up,
            message: message.into(),
            details,
        }
    }

    pub fn down(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Down,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Key under which this probe appears in the report.
    fn component(&self) -> &'static str;

    async fn probe(&self) -> ComponentHealth;
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Up
    }
}

/// Run every probe concurrently and fold the results into one report.
pub async fn check_all(probes: &[Arc<dyn HealthProbe>]) -> HealthReport {
    let results = futures::future::join_all(probes.iter().map(|p| async move {
        (p.component().to_string(), p.probe().await)
    }))
    .await;

    let status = if results.iter().all(|(_, h)| h.status == HealthStatus::Up) {
        HealthStatus::Up
    } else {
        HealthStatus::Down
    };

    HealthReport {
        status,
        timestamp: Utc::now(),
        components: results.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, HealthStatus);

    #[async_trait]
    impl HealthProbe for Fixed {
        fn component(&self) -> &'static str {
            self.0
        }

        async fn probe(&self) -> ComponentHealth {
            match self.1 {
                HealthStatus::Up => ComponentHealth::up("ok", BTreeMap::new()),
                HealthStatus::Down => ComponentHealth::down("unreachable"),
            }
        }
    }

    #[tokio::test]
    async fn test_all_up() {
        let probes: Vec<Arc<dyn HealthProbe>> = vec![
            Arc::new(Fixed("database", HealthStatus::Up)),
            Arc::new(Fixed("keydb", HealthStatus::Up)),
        ];
        let report = check_all(&probes).await;
        assert!(report.is_healthy());
        assert_eq!(report.components.len(), 2);
    }

    #[tokio::test]
    async fn test_one_down_marks_report_down() {
        let probes: Vec<Arc<dyn HealthProbe>> = vec![
            Arc::new(Fixed("database", HealthStatus::Down)),
            Arc::new(Fixed("keydb", HealthStatus::Up)),
        ];
        let report = check_all(&probes).await;
        assert_eq!(report.status, HealthStatus::Down);
        assert_eq!(report.components["database"].message, "unreachable");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "down");
        assert_eq!(json["components"]["keydb"]["status"], "up");
    }
}
