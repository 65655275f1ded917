use super::existing::ExistingEvents;
use crate::event::description::format_description_as_html;
use crate::event::model::EventRecord;
use crate::event::normalizer::normalize_registration_type;
use crate::wix::dto::{
    wire_timestamp, DateAndTimeSettings, EventPayload, LocationPayload, MainImage,
    RegistrationPayload,
};
use crate::wix::model::RemoteEvent;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;

/// What to do with one desired record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Create,
    Update { id: String, changes: Vec<FieldChange> },
    Skip(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    Unchanged { id: String },
    DuplicateRow { first_row: usize },
}

/// Event fields the sync keeps in line with the sheet.
///
/// No title: it is part of the identity key, so a
/// renamed row is a different event and gets created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventField {
    Start,
    End,
    TimeZone,
    Location,
    RegistrationType,
    Teaser,
    Description,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: EventField,
    pub from: Option<String>,
    pub to: String,
}

pub fn reconcile(record: &EventRecord, existing: &ExistingEvents) -> Decision {
    let Some(remote) = existing.get(&record.identity_key()) else {
        return Decision::Create;
    };

    let changes = diff(record, remote);

    if changes.is_empty() {
        Decision::Skip(SkipReason::Unchanged {
            id: remote.id.clone(),
        })
    } else {
        Decision::Update {
            id: remote.id.clone(),
            changes,
        }
    }
}

/// Field-level differences between the sheet and the platform, ignoring
/// anything that is only formatting: timestamps are compared as instants,
/// addresses with whitespace collapsed, registration types through the same
/// alias table as the sheet. Teaser and description are only compared when the
/// sheet sets them. A remote event without a registration block is taken as
/// not reporting it.
pub fn diff(record: &EventRecord, remote: &RemoteEvent) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    let mut check = |field: EventField, from: Option<String>, to: String, same: bool| {
        if !same {
            changes.push(FieldChange { field, from, to });
        }
    };

    check(
        EventField::Start,
        remote.start.map(wire_timestamp),
        wire_timestamp(record.start),
        same_instant(remote.start, record.start),
    );
    check(
        EventField::End,
        remote.end.map(wire_timestamp),
        wire_timestamp(record.end),
        same_instant(remote.end, record.end),
    );

    let time_zone_id = record.timezone.name();
    check(
        EventField::TimeZone,
        remote.time_zone_id.clone(),
        time_zone_id.to_string(),
        remote.time_zone_id.as_deref() == Some(time_zone_id),
    );

    check(
        EventField::Location,
        remote.location.clone(),
        record.location.clone(),
        remote
            .location
            .as_deref()
            .is_some_and(|location| collapse_whitespace(location) == collapse_whitespace(&record.location)),
    );

    // Every platform event has a registration, so a missing one was just not reported
    if let Some(remote_type) = remote.registration_type.as_deref() {
        check(
            EventField::RegistrationType,
            Some(remote_type.to_string()),
            record.registration_type.to_string(),
            normalize_registration_type(Some(remote_type)).ok() == Some(record.registration_type),
        );
    }

    if let Some(teaser) = &record.teaser {
        check(
            EventField::Teaser,
            remote.teaser.clone(),
            teaser.clone(),
            remote.teaser.as_deref().map(str::trim) == Some(teaser.trim()),
        );
    }

    if let Some(description) = &record.description {
        let html = format_description_as_html(description);

        check(
            EventField::Description,
            remote.description_html.clone(),
            html.clone(),
            remote.description_html.as_deref().map(str::trim) == Some(html.trim()),
        );
    }

    changes
}

fn same_instant(remote: Option<DateTime<Utc>>, desired: DateTime<Utc>) -> bool {
    remote == Some(desired)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().join(" ")
}

fn schedule(record: &EventRecord) -> DateAndTimeSettings {
    DateAndTimeSettings::new(record.start, record.end, record.timezone.name())
}

/// Full event body for a new event.
pub fn build_create_payload(record: &EventRecord, image: Option<MainImage>) -> EventPayload {
    EventPayload {
        title: Some(record.title.clone()),
        date_and_time_settings: Some(schedule(record)),
        location: Some(LocationPayload::venue(&record.location)),
        registration: Some(RegistrationPayload {
            initial_type: record.registration_type.to_string(),
        }),
        short_description: record.teaser.clone(),
        detailed_description: record.description.as_deref().map(format_description_as_html),
        main_image: image,
    }
}

/// Patch carrying only what changed. Start, end and timezone travel together
/// because the platform stores them as one block.
pub fn build_patch(record: &EventRecord, changes: &[FieldChange]) -> EventPayload {
    let changed = |field: EventField| changes.iter().any(|change| change.field == field);
    let mut patch = EventPayload::default();

    if changed(EventField::Start) || changed(EventField::End) || changed(EventField::TimeZone) {
        patch.date_and_time_settings = Some(schedule(record));
    }
    if changed(EventField::Location) {
        patch.location = Some(LocationPayload::venue(&record.location));
    }
    if changed(EventField::RegistrationType) {
        patch.registration = Some(RegistrationPayload {
            initial_type: record.registration_type.to_string(),
        });
    }
    if changed(EventField::Teaser) {
        patch.short_description = record.teaser.clone();
    }
    if changed(EventField::Description) {
        patch.detailed_description = record.description.as_deref().map(format_description_as_html);
    }

    patch
}
