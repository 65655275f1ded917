#![allow(dead_code)]

use async_trait::async_trait;
use eventsync::config::model::SyncConfig;
use eventsync::drive::api::{Asset, AssetFetcher, AssetReference};
use eventsync::error::{AssetError, RemoteError, SheetError};
use eventsync::event::model::{RawRow, RecordField};
use eventsync::platform::EventPlatform;
use eventsync::sheets::api::SheetSource;
use eventsync::wix::dto::{EventPayload, EventResponse};
use eventsync::wix::model::{EventsPage, PageCursor, RemoteEvent, TicketRequest, UploadedFile};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

pub fn sync_config() -> SyncConfig {
    SyncConfig {
        write_delay: Duration::ZERO,
        ..SyncConfig::default()
    }
}

pub fn movie_night_row(number: usize) -> RawRow {
    RawRow::new(number)
        .with(RecordField::Title, "Movie Night")
        .with(RecordField::EventType, "Screening")
        .with(RecordField::StartDate, "2025-11-01")
        .with(RecordField::StartTime, "19:00")
        .with(RecordField::EndDate, "2025-11-01")
        .with(RecordField::EndTime, "22:00")
        .with(RecordField::Location, "123 Fake St")
        .with(RecordField::TicketPrice, "15.00")
        .with(RecordField::Capacity, "50")
        .with(RecordField::RegistrationType, "TICKETS")
}

pub fn rsvp_row(number: usize, title: &str, date: &str) -> RawRow {
    RawRow::new(number)
        .with(RecordField::Title, title)
        .with(RecordField::StartDate, date)
        .with(RecordField::StartTime, "18:30")
        .with(RecordField::Location, "Community Hall, 1 Main St")
        .with(RecordField::Description, "Doors open at 6.\n\n- Free entry\n- Snacks")
}

pub struct FakeSheet {
    pub rows: Vec<RawRow>,
    pub fail: bool,
}

impl FakeSheet {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows, fail: false }
    }
}

#[async_trait]
impl SheetSource for FakeSheet {
    async fn read_rows(&self) -> Result<Vec<RawRow>, SheetError> {
        if self.fail {
            return Err(SheetError::Remote(unavailable()));
        }
        Ok(self.rows.clone())
    }
}

fn unavailable() -> RemoteError {
    RemoteError::Status {
        status: 503,
        body: "unavailable".to_string(),
    }
}

#[derive(Default)]
pub struct PlatformState {
    /// Stored the way the platform would echo them back
    pub events: Vec<Value>,
    pub created: Vec<EventPayload>,
    pub updated: Vec<(String, EventPayload)>,
    pub tickets: Vec<TicketRequest>,
    pub upload_urls: Vec<(String, String)>,
    pub uploads: Vec<(String, usize)>,
}

/// In-memory platform. Payloads are turned into stored events by going
/// through their JSON form, like the real API does.
#[derive(Default)]
pub struct FakePlatform {
    pub state: Mutex<PlatformState>,
    pub fail_listing: bool,
    pub fail_tickets: bool,
    pub fail_create_titles: HashSet<String>,
}

impl FakePlatform {
    pub fn created_count(&self) -> usize {
        self.state.lock().unwrap().created.len()
    }

    pub fn updated_count(&self) -> usize {
        self.state.lock().unwrap().updated.len()
    }

    pub fn remote_events(&self) -> Vec<RemoteEvent> {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .map(to_remote)
            .collect()
    }
}

fn to_remote(stored: &Value) -> RemoteEvent {
    serde_json::from_value::<EventResponse>(stored.clone())
        .unwrap()
        .to_model()
        .unwrap()
}

fn merge(target: &mut Value, patch: Value) {
    if let (Some(target), Value::Object(patch)) = (target.as_object_mut(), patch) {
        for (key, value) in patch {
            target.insert(key, value);
        }
    }
}

/// The platform reports the current registration type as `type` next to `initialType`.
fn echo_registration(stored: &mut Value) {
    if let Some(initial) = stored.pointer("/registration/initialType").cloned() {
        stored["registration"]["type"] = initial;
    }
}

#[async_trait]
impl EventPlatform for FakePlatform {
    async fn query_events(&self, limit: usize, page: &PageCursor) -> Result<EventsPage, RemoteError> {
        if self.fail_listing {
            return Err(unavailable());
        }

        let offset = match page {
            PageCursor::Offset(offset) => *offset,
            PageCursor::Cursor(_) => panic!("The fake platform never hands out cursors"),
        };
        let state = self.state.lock().unwrap();
        let events: Vec<RemoteEvent> = state.events.iter().skip(offset).take(limit).map(to_remote).collect();

        Ok(EventsPage {
            received: events.len(),
            events,
            next_cursor: None,
        })
    }

    async fn create_event(&self, event: &EventPayload) -> Result<RemoteEvent, RemoteError> {
        let title = event.title.clone().unwrap_or_default();
        if self.fail_create_titles.contains(&title) {
            return Err(RemoteError::Status {
                status: 400,
                body: json!({ "message": "invalid event" }).to_string(),
            });
        }

        let mut state = self.state.lock().unwrap();
        let mut stored = serde_json::to_value(event).unwrap();
        stored["id"] = json!(format!("evt-{}", state.events.len() + 1));
        echo_registration(&mut stored);

        state.created.push(event.clone());
        state.events.push(stored.clone());

        Ok(to_remote(&stored))
    }

    async fn update_event(&self, id: &str, patch: &EventPayload) -> Result<RemoteEvent, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.updated.push((id.to_string(), patch.clone()));

        let stored = state
            .events
            .iter_mut()
            .find(|event| event["id"] == id)
            .ok_or_else(|| RemoteError::Status {
                status: 404,
                body: "not found".to_string(),
            })?;
        merge(stored, serde_json::to_value(patch).unwrap());
        echo_registration(stored);

        Ok(to_remote(stored))
    }

    async fn create_ticket_definition(&self, ticket: &TicketRequest) -> Result<String, RemoteError> {
        if self.fail_tickets {
            return Err(unavailable());
        }

        let mut state = self.state.lock().unwrap();
        state.tickets.push(ticket.clone());
        Ok(format!("ticket-{}", state.tickets.len()))
    }

    async fn generate_upload_url(&self, mime_type: &str, file_name: &str) -> Result<String, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state
            .upload_urls
            .push((mime_type.to_string(), file_name.to_string()));
        Ok(format!("https://upload.example.com/{}", state.upload_urls.len()))
    }

    async fn upload_bytes(
        &self,
        upload_url: &str,
        _mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.uploads.push((upload_url.to_string(), bytes.len()));

        Ok(UploadedFile {
            id: format!("media-{}", state.uploads.len()),
            width: Some(1200),
            height: Some(800),
        })
    }
}

/// Serves the same small image for every reference.
#[derive(Default)]
pub struct FakeAssets {
    pub fetched: Mutex<Vec<AssetReference>>,
    pub fail: bool,
}

#[async_trait]
impl AssetFetcher for FakeAssets {
    async fn fetch(&self, reference: &AssetReference) -> Result<Asset, AssetError> {
        self.fetched.lock().unwrap().push(reference.clone());

        if self.fail {
            return Err(AssetError::NotAnImage("application/pdf".to_string()));
        }

        Ok(Asset {
            bytes: vec![0; 64],
            file_name: "poster.png".to_string(),
            mime_type: "image/png".to_string(),
        })
    }
}
