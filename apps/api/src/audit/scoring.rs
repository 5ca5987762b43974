//! Score Calculator: folds comparable-business records into one 0–100 composite.
//!
//! Algorithm, per record (each component weighted to 25):
//! - tag:        Σ weight of record tags in the taxonomy / Σ all record tag weights
//! - affinity:   affinity (may be negative)
//! - popularity: popularity
//! - keyword:    record keywords in the taxonomy / record keyword count
//!
//! Record totals are averaged together with one buffer sample of 60, so the
//! average is over `n + 1` samples. No records → `DEFAULT_SCORE`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::insights::entities::InsightRecord;

pub const COMPONENT_WEIGHT: f64 = 25.0;
/// Extra sample folded into every average; softens scores built on few records.
pub const BUFFER_SAMPLE: f64 = 60.0;
pub const DEFAULT_SCORE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub tag_score: f64,
    pub affinity_score: f64,
    pub popularity_score: f64,
    pub keyword_score: f64,
}

impl ScoreComponents {
    /// Not clamped: a negative affinity pulls the total down.
    pub fn total(&self) -> f64 {
        self.tag_score + self.affinity_score + self.popularity_score + self.keyword_score
    }
}

/// Lower-cased taxonomy used for membership checks.
struct Taxonomy(HashSet<String>);

impl Taxonomy {
    fn new(base_tags: &[String]) -> Self {
        Self(base_tags.iter().map(|t| t.trim().to_lowercase()).collect())
    }

    fn contains(&self, candidate: &str) -> bool {
        self.0.contains(&candidate.trim().to_lowercase())
    }
}

/// Computes the composite sustainability score.
pub fn compute_score(records: &[InsightRecord], base_tags: &[String]) -> u32 {
    if records.is_empty() {
        return DEFAULT_SCORE;
    }

    let taxonomy = Taxonomy::new(base_tags);
    let record_total: f64 = records
        .iter()
        .map(|record| components_for(record, &taxonomy).total())
        .sum();

    let samples = (records.len() + 1) as f64;
    ((record_total + BUFFER_SAMPLE) / samples)
        .round()
        .clamp(0.0, 100.0) as u32
}

/// Composite rescaled to the 0–10 scale shown to users, one decimal place.
pub fn display_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0).round() / 10.0
}

fn components_for(record: &InsightRecord, taxonomy: &Taxonomy) -> ScoreComponents {
    let total_weight: f64 = record.tags.values().sum();
    let tag_score = if total_weight > 0.0 {
        let matched_weight: f64 = record
            .tags
            .iter()
            .filter(|(name, _)| taxonomy.contains(name))
            .map(|(_, weight)| weight)
            .sum();
        matched_weight / total_weight * COMPONENT_WEIGHT
    } else {
        0.0
    };

    let keyword_score = if record.keywords.is_empty() {
        0.0
    } else {
        let matched = record
            .keywords
            .iter()
            .filter(|kw| taxonomy.contains(kw))
            .count();
        matched as f64 / record.keywords.len() as f64 * COMPONENT_WEIGHT
    };

    ScoreComponents {
        tag_score,
        affinity_score: record.affinity * COMPONENT_WEIGHT,
        popularity_score: record.popularity * COMPONENT_WEIGHT,
        keyword_score,
    }
}
