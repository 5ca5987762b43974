//! In-memory, append-only audit store. Nothing survives a restart.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::audit::scoring::display_score;
use crate::audit::summary::Summary;

/// A persisted audit: the generated summary plus identity and creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub created: DateTime<Utc>,
    /// `sustainability_score` (0–100) rescaled to 0–10 for display.
    pub display_score: f64,
    #[serde(flatten)]
    pub summary: Summary,
}

impl AuditRecord {
    pub fn new(summary: Summary) -> Self {
        Self {
            id: Uuid::new_v4(),
            created: Utc::now(),
            display_score: display_score(summary.sustainability_score),
            summary,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    BusinessName,
    #[default]
    Created,
    SustainabilityScore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Clone, Default)]
pub struct AuditStore {
    audits: Arc<RwLock<Vec<AuditRecord>>>,
}

impl AuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, record: AuditRecord) {
        self.audits.write().await.push(record);
    }

    pub async fn get(&self, id: Uuid) -> Option<AuditRecord> {
        self.audits
            .read()
            .await
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Snapshot of every audit, sorted. Ties keep insertion order.
    pub async fn list(&self, sort_by: SortBy, order: SortOrder) -> Vec<AuditRecord> {
        let mut audits = self.audits.read().await.clone();
        audits.sort_by(|a, b| {
            let ordering = compare(a, b, sort_by);
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        audits
    }
}

fn compare(a: &AuditRecord, b: &AuditRecord, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::BusinessName => a.summary.business_name.cmp(&b.summary.business_name),
        SortBy::Created => a.created.cmp(&b.created),
        SortBy::SustainabilityScore => a
            .summary
            .sustainability_score
            .total_cmp(&b.summary.sustainability_score),
    }
}
