use super::existing::{fetch_existing, ExistingEvents, DEFAULT_PAGE_SIZE};
use super::images::ImageAttacher;
use super::reconcile::{build_create_payload, build_patch, reconcile, Decision, FieldChange, SkipReason};
use super::summary::{RecordOutcome, RecordStatus, SyncSummary};
use super::tickets::{TicketOutcome, TicketProvisioner};
use crate::config::model::SyncConfig;
use crate::drive::api::AssetFetcher;
use crate::error::SyncError;
use crate::event::model::{EventRecord, IdentityKey, RawRow, RecordField};
use crate::event::normalizer::normalize_row;
use crate::platform::EventPlatform;
use crate::sheets::api::SheetSource;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{info, info_span, instrument, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub create_tickets: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            create_tickets: true,
        }
    }
}

/// Spaces out writes to the platform. The first write of a run goes out immediately.
struct Pacer {
    delay: Duration,
    has_written: bool,
}

impl Pacer {
    async fn before_write(&mut self) {
        if self.has_written && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.has_written = true;
    }
}

/// Drives one sync run: sheet snapshot, platform snapshot, then every row in
/// sheet order, one at a time.
pub struct SyncOrchestrator<'a> {
    sheet: &'a dyn SheetSource,
    platform: &'a dyn EventPlatform,
    assets: &'a dyn AssetFetcher,
    config: &'a SyncConfig,
    options: SyncOptions,
}

struct RunState<'a> {
    existing: ExistingEvents,
    /// First row seen for each key in this run
    seen: HashMap<IdentityKey, usize>,
    /// Rows whose create or update was rejected
    failed_rows: HashSet<usize>,
    images: ImageAttacher<'a>,
    tickets: TicketProvisioner<'a>,
    pacer: Pacer,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        sheet: &'a dyn SheetSource,
        platform: &'a dyn EventPlatform,
        assets: &'a dyn AssetFetcher,
        config: &'a SyncConfig,
        options: SyncOptions,
    ) -> Self {
        Self {
            sheet,
            platform,
            assets,
            config,
            options,
        }
    }

    /// Only the sheet read and the existing-events listing can fail the run,
    /// and both happen before any write. Everything after is reported per row.
    #[instrument(skip(self), fields(tickets = self.options.create_tickets))]
    pub async fn run(&self) -> Result<SyncSummary, SyncError> {
        let rows = self.sheet.read_rows().await?;
        let existing = fetch_existing(
            self.platform,
            self.config.timezone,
            DEFAULT_PAGE_SIZE,
            self.config.existing_events_cap,
        )
        .await?;

        info!("Syncing {} rows against {} existing events", rows.len(), existing.len());

        let mut state = RunState {
            existing,
            seen: HashMap::new(),
            failed_rows: HashSet::new(),
            images: ImageAttacher::new(self.platform, self.assets, self.config.max_image_bytes),
            tickets: TicketProvisioner::new(
                self.platform,
                &self.config.ticket_currency,
                self.options.create_tickets,
            ),
            pacer: Pacer {
                delay: self.config.write_delay,
                has_written: false,
            },
        };
        let mut summary = SyncSummary::default();

        for row in &rows {
            let outcome = self
                .process_row(row, &mut state)
                .instrument(info_span!("row", number = row.number))
                .await;

            summary.push(outcome);
        }

        summary.images = state.images.stats().clone();
        Ok(summary)
    }

    async fn process_row(&self, row: &RawRow, state: &mut RunState<'a>) -> RecordOutcome {
        let normalized = match normalize_row(row, self.config.timezone) {
            Ok(normalized) => normalized,
            Err(err) => {
                warn!("Skipping invalid row: {}", err);
                let mut outcome = RecordOutcome::failed(row.number, err.to_string());
                outcome.title = row.get(RecordField::Title).map(str::to_string);
                return outcome;
            }
        };
        let record = normalized.record;
        let key = record.identity_key();

        let mut outcome = RecordOutcome::new(record.row, RecordStatus::Skipped);
        outcome.title = Some(record.title.clone());
        outcome.key = Some(key.to_string());
        outcome.fallbacks = normalized.fallbacks;

        if let Some(first_row) = state.seen.get(&key) {
            warn!("Same event as row {}, skipping", first_row);
            if state.failed_rows.contains(first_row) {
                outcome
                    .warnings
                    .push(format!("row {} failed, so the platform has no event for it yet", first_row));
            }
            outcome.skip = Some(SkipReason::DuplicateRow {
                first_row: *first_row,
            });
            return outcome;
        }
        state.seen.insert(key, record.row);

        match reconcile(&record, &state.existing) {
            Decision::Skip(reason) => {
                info!("'{}' is up to date", record.title);
                if let SkipReason::Unchanged { id } = &reason {
                    outcome.event_id = Some(id.clone());
                }
                outcome.skip = Some(reason);
            }
            Decision::Create => {
                state.pacer.before_write().await;
                self.create(&record, state, &mut outcome).await;
            }
            Decision::Update { id, changes } => {
                state.pacer.before_write().await;
                self.update(&record, &id, changes, &mut outcome).await;
            }
        }

        if outcome.status == RecordStatus::Failed {
            state.failed_rows.insert(record.row);
        }

        outcome
    }

    /// The image goes in first so it is part of the create call. The ticket
    /// needs the event id, so it comes after.
    async fn create(&self, record: &EventRecord, state: &mut RunState<'a>, outcome: &mut RecordOutcome) {
        let image = match &record.image_ref {
            Some(reference) => match state.images.attach(reference).await {
                Ok(image) => Some(image),
                Err(err) => {
                    outcome.warnings.push(format!("image not attached: {}", err));
                    None
                }
            },
            None => None,
        };

        let created = match self.platform.create_event(&build_create_payload(record, image)).await {
            Ok(created) => created,
            Err(err) => {
                outcome.status = RecordStatus::Failed;
                outcome.error = Some(format!("create failed: {}", err));
                return;
            }
        };

        info!("Created '{}' as {}", record.title, created.id);
        outcome.status = RecordStatus::Created;

        let ticket = state.tickets.provision(&created.id, record).await;
        if let TicketOutcome::Failed { error } = &ticket {
            outcome
                .warnings
                .push(format!("ticket not created, add it from the dashboard: {}", error));
        }
        if ticket != TicketOutcome::NotApplicable {
            outcome.ticket = Some(ticket);
        }
        outcome.event_id = Some(created.id);
    }

    async fn update(
        &self,
        record: &EventRecord,
        id: &str,
        changes: Vec<FieldChange>,
        outcome: &mut RecordOutcome,
    ) {
        outcome.event_id = Some(id.to_string());
        let patch = build_patch(record, &changes);

        match self.platform.update_event(id, &patch).await {
            Ok(_) => {
                info!(
                    "Updated '{}' ({})",
                    record.title,
                    changes.iter().map(|change| change.field.to_string()).collect::<Vec<_>>().join(", ")
                );
                outcome.status = RecordStatus::Updated;
                outcome.changes = changes;
            }
            Err(err) => {
                outcome.status = RecordStatus::Failed;
                outcome.error = Some(format!("update failed: {}", err));
                outcome.changes = changes;
            }
        }
    }
}
