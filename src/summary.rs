//! Run Summary
//!
//! Structured report of one import run, written as JSON with `--report`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Why a record produced no node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// No scalar `id` field.
    MissingId,
    /// The store refused the property set.
    NodeRejected(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecord {
    pub object_type: String,
    pub index: usize,
    pub name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub label: String,
    pub object_type: String,
    pub records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub batches: Vec<BatchSummary>,
    pub nodes_created: usize,
    pub stubs_created: usize,
    pub stubs_merged: usize,
    pub skipped: Vec<SkippedRecord>,
    pub fields_serialized_fallback: usize,
    pub fields_dropped: usize,
    pub relationships_queued: usize,
    pub relationships_created: usize,
    pub relationships_dropped: usize,
    pub commits: usize,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            batches: Vec::new(),
            nodes_created: 0,
            stubs_created: 0,
            stubs_merged: 0,
            skipped: Vec::new(),
            fields_serialized_fallback: 0,
            fields_dropped: 0,
            relationships_queued: 0,
            relationships_created: 0,
            relationships_dropped: 0,
            commits: 0,
        }
    }

    pub fn records_seen(&self) -> usize {
        self.batches.iter().map(|b| b.records).sum()
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn log(&self) {
        info!("📊 Run {} summary:", self.run_id);
        info!(
            "   {} batches, {} records, {} nodes created ({} stubs, {} merged)",
            self.batches.len(),
            self.records_seen(),
            self.nodes_created,
            self.stubs_created,
            self.stubs_merged
        );
        info!(
            "   {} relationships created, {} dropped of {} queued",
            self.relationships_created, self.relationships_dropped, self.relationships_queued
        );
        if self.fields_serialized_fallback > 0 || self.fields_dropped > 0 {
            warn!(
                "   {} fields serialized by fallback, {} fields dropped",
                self.fields_serialized_fallback, self.fields_dropped
            );
        }
        if !self.skipped.is_empty() {
            warn!("   {} records skipped", self.skipped.len());
        }
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}
