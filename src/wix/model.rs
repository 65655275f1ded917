use crate::event::model::{IdentityKey, Price};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// An event as it currently exists on the platform, in the platform's own terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEvent {
    pub id: String,
    pub title: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub time_zone_id: Option<String>,
    pub location: Option<String>,
    /// Raw wire value, e.g. `TICKETING`
    pub registration_type: Option<String>,
    pub teaser: Option<String>,
    pub description_html: Option<String>,
}

impl RemoteEvent {
    /// Keyed in the run's timezone, never the event's own `time_zone_id`, so
    /// it lines up with [`crate::event::model::EventRecord::identity_key`].
    /// A timezone change is caught by the diff instead.
    pub fn identity_key(&self, timezone: Tz) -> Option<IdentityKey> {
        self.start
            .map(|start| IdentityKey::new(&self.title, start, timezone))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    Offset(usize),
    Cursor(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventsPage {
    pub events: Vec<RemoteEvent>,
    /// Events on the page before dropping the unusable ones, for short-page detection
    pub received: usize,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRequest {
    pub event_id: String,
    pub name: String,
    pub price: Price,
    pub currency: String,
    pub quantity: u32,
    pub limit_per_checkout: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}
