//! Read-only view of the scrape subsystem, plus the optional registries the
//! diagnostics routes render.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetHealth {
    Unknown,
    Up,
    Down,
}

/// State of one scrape target at the moment it was read.
#[derive(Debug, Clone)]
pub struct TargetHealthSnapshot {
    pub job: String,
    pub url: String,
    pub discovered_labels: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub health: TargetHealth,
    pub last_scrape: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_scrape_duration: Duration,
}

/// Source of the currently active scrape targets.
pub trait TargetSource: Send + Sync {
    fn active_targets(&self) -> Vec<TargetHealthSnapshot>;
}

/// Registry of metrics derived from ingested profiles.
pub trait ExportedMetrics: Send + Sync {
    /// Prometheus text exposition.
    fn render(&self) -> String;
}

/// Runtime profile provider behind `/debug/pprof/{profile}`.
pub trait RuntimeProfiler: Send + Sync {
    /// Names of the profiles this process can produce.
    fn available(&self) -> Vec<String>;

    /// Encoded profile, or `None` when `name` is not available.
    fn collect(&self, name: &str) -> Option<Vec<u8>>;
}
