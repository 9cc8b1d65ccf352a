//! `/targets`: the scrape subsystem's current view, projected as JSON.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::{TargetHealth, TargetHealthSnapshot, TargetSource};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetResponse {
    pub job: String,
    pub url: String,
    pub discovered_labels: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub health: TargetHealth,
    pub last_scrape: Option<DateTime<Utc>>,
    /// Empty when the last scrape succeeded.
    pub last_error: String,
    pub last_scrape_duration: String,
}

impl From<TargetHealthSnapshot> for TargetResponse {
    fn from(t: TargetHealthSnapshot) -> Self {
        Self {
            job: t.job,
            url: t.url,
            discovered_labels: t.discovered_labels,
            labels: t.labels,
            health: t.health,
            last_scrape: t.last_scrape,
            last_error: t.last_error.unwrap_or_default(),
            last_scrape_duration: format!("{:?}", t.last_scrape_duration),
        }
    }
}

pub async fn active_targets(State(source): State<Arc<dyn TargetSource>>) -> Json<Vec<TargetResponse>> {
    Json(
        source
            .active_targets()
            .into_iter()
            .map(TargetResponse::from)
            .collect(),
    )
}
