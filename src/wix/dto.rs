use super::model::{RemoteEvent, UploadedFile};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Sections the listing must carry for the diff: the platform leaves them out unless asked.
pub const REQUESTED_FIELDS: [&str; 3] = ["DETAILS", "TEXTS", "REGISTRATION"];

#[derive(Debug, Serialize)]
pub struct QueryEventsRequest {
    pub query: EventsQuery,
    pub fields: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct EventsQuery {
    pub paging: Paging,
}

/// Either an offset or a cursor page. The platform prefers cursors once it hands one out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Paging {
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEventsResponse {
    #[serde(default)]
    pub events: Vec<EventResponse>,
    #[serde(default)]
    pub paging_metadata: Option<PagingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingMetadata {
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub cursors: Option<Cursors>,
}

#[derive(Debug, Deserialize)]
pub struct Cursors {
    #[serde(default)]
    pub next: Option<String>,
}

impl PagingMetadata {
    pub fn next_cursor(&self) -> Option<String> {
        self.next_cursor
            .clone()
            .or_else(|| self.cursors.as_ref().and_then(|cursors| cursors.next.clone()))
            .filter(|cursor| !cursor.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    pub event: T,
}

/// Event body for both create and partial update. Unset fields are left out of the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_and_time_settings: Option<DateAndTimeSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<RegistrationPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_image: Option<MainImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateAndTimeSettings {
    pub date_and_time_tbd: bool,
    pub start_date: String,
    pub end_date: String,
    pub time_zone_id: String,
}

impl DateAndTimeSettings {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, time_zone_id: &str) -> Self {
        Self {
            date_and_time_tbd: false,
            start_date: wire_timestamp(start),
            end_date: wire_timestamp(end),
            time_zone_id: time_zone_id.to_string(),
        }
    }
}

/// `2025-11-01T23:00:00Z`
pub fn wire_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationPayload {
    #[serde(rename = "type")]
    pub location_type: &'static str,
    pub address: AddressPayload,
}

impl LocationPayload {
    pub fn venue(formatted_address: &str) -> Self {
        Self {
            location_type: "VENUE",
            address: AddressPayload {
                formatted_address: formatted_address.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPayload {
    pub formatted_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    pub initial_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MainImage {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

// Note: the listing endpoint omits whatever isn't set, hence all the defaults
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date_and_time_settings: Option<ResponseDateAndTime>,
    #[serde(default)]
    pub location: Option<ResponseLocation>,
    #[serde(default)]
    pub registration: Option<ResponseRegistration>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub detailed_description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDateAndTime {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub time_zone_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseLocation {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<ResponseAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseAddress {
    #[serde(default)]
    pub formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRegistration {
    #[serde(default, rename = "type")]
    pub registration_type: Option<String>,
    #[serde(default)]
    pub initial_type: Option<String>,
}

impl EventResponse {
    /// `None` when the platform sent an event without an id, which can't be matched or patched.
    #[tracing::instrument(skip(self), fields(title = %self.title))]
    pub fn to_model(&self) -> Option<RemoteEvent> {
        let id = self.id.clone().filter(|id| !id.is_empty())?;
        let schedule = self.date_and_time_settings.as_ref();

        Some(RemoteEvent {
            id,
            title: self.title.clone(),
            start: schedule
                .and_then(|s| s.start_date.as_deref())
                .and_then(parse_timestamp),
            end: schedule
                .and_then(|s| s.end_date.as_deref())
                .and_then(parse_timestamp),
            time_zone_id: schedule.and_then(|s| s.time_zone_id.clone()),
            location: self.location.as_ref().and_then(|location| {
                location
                    .address
                    .as_ref()
                    .and_then(|address| address.formatted_address.clone())
                    .or_else(|| location.name.clone())
            }),
            registration_type: self.registration.as_ref().and_then(|registration| {
                registration
                    .registration_type
                    .clone()
                    .or_else(|| registration.initial_type.clone())
            }),
            teaser: self.short_description.clone(),
            description_html: self.detailed_description.clone(),
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Utc))
        .inspect_err(|err| tracing::warn!("Failed to parse timestamp '{}': {}", raw, err))
        .ok()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDefinitionRequest {
    pub ticket_definition: TicketDefinitionPayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDefinitionPayload {
    pub event_id: String,
    pub name: String,
    pub limit_per_checkout: u32,
    pub pricing_method: PricingMethod,
    pub fee_type: &'static str,
    pub limited: bool,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingMethod {
    pub fixed_price: Money,
}

#[derive(Debug, Serialize)]
pub struct Money {
    pub value: String,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDefinitionResponse {
    #[serde(default)]
    pub ticket_definition: Option<CreatedTicketDefinition>,
}

#[derive(Debug, Deserialize)]
pub struct CreatedTicketDefinition {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateUploadUrlRequest {
    pub mime_type: String,
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateUploadUrlResponse {
    pub upload_url: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub file: FileDescriptor,
}

#[derive(Debug, Deserialize)]
pub struct FileDescriptor {
    pub id: String,
    #[serde(default)]
    pub media: Option<FileMedia>,
}

#[derive(Debug, Deserialize)]
pub struct FileMedia {
    #[serde(default)]
    pub image: Option<ImageMedia>,
}

#[derive(Debug, Deserialize)]
pub struct ImageMedia {
    #[serde(default)]
    pub image: Option<ImageInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ImageInfo {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl FileDescriptor {
    pub fn to_model(&self) -> UploadedFile {
        let info = self
            .media
            .as_ref()
            .and_then(|media| media.image.as_ref())
            .and_then(|image| image.image.as_ref());

        UploadedFile {
            id: self.id.clone(),
            width: info.and_then(|info| info.width),
            height: info.and_then(|info| info.height),
        }
    }
}
