use super::images::ImageStats;
use super::reconcile::{FieldChange, SkipReason};
use super::tickets::TicketOutcome;
use crate::event::normalizer::Fallback;
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Created,
    Updated,
    Skipped,
    Failed,
}

/// What happened to one sheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub row: usize,
    pub title: Option<String>,
    pub key: Option<String>,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<TicketOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<Fallback>,
    /// Problems that didn't stop the record, like a failed ticket or image
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RecordOutcome {
    pub fn new(row: usize, status: RecordStatus) -> Self {
        Self {
            row,
            title: None,
            key: None,
            status,
            event_id: None,
            skip: None,
            error: None,
            changes: Vec::new(),
            ticket: None,
            fallbacks: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn failed(row: usize, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(row, RecordStatus::Failed)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub counts: SummaryCounts,
    pub records: Vec<RecordOutcome>,
    pub images: ImageStats,
}

impl SyncSummary {
    pub fn push(&mut self, outcome: RecordOutcome) {
        match outcome.status {
            RecordStatus::Created => self.counts.created += 1,
            RecordStatus::Updated => self.counts.updated += 1,
            RecordStatus::Skipped => self.counts.skipped += 1,
            RecordStatus::Failed => self.counts.failed += 1,
        }
        self.counts.warnings += outcome.warnings.len() + outcome.fallbacks.len();

        self.records.push(outcome);
    }

    pub fn has_failures(&self) -> bool {
        self.counts.failed > 0
    }

    pub fn log(&self) {
        for record in &self.records {
            let title = record.title.as_deref().unwrap_or("<untitled>");

            match record.status {
                RecordStatus::Failed => error!(
                    "Row {} '{}': failed: {}",
                    record.row,
                    title,
                    record.error.as_deref().unwrap_or_default()
                ),
                status => info!(
                    "Row {} '{}': {}{}",
                    record.row,
                    title,
                    status,
                    record
                        .event_id
                        .as_deref()
                        .map(|id| format!(" ({})", id))
                        .unwrap_or_default()
                ),
            }

            for fallback in &record.fallbacks {
                warn!(
                    "Row {}: {} '{}' is invalid, used {}",
                    record.row, fallback.field, fallback.value, fallback.replaced_with
                );
            }
            for warning in &record.warnings {
                warn!("Row {}: {}", record.row, warning);
            }
        }

        info!(
            "Created {}, updated {}, skipped {}, failed {} ({} warnings)",
            self.counts.created,
            self.counts.updated,
            self.counts.skipped,
            self.counts.failed,
            self.counts.warnings
        );
        info!(
            "Images: {} uploaded, {} reused, {} compressed, {} failed",
            self.images.uploaded, self.images.cache_hits, self.images.compressed, self.images.failed
        );
    }
}
