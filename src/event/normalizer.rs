use crate::error::{ValidationError, ValidationErrorKind};
use crate::event::model::*;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

const DATE_FORMATS: [&str; 4] = ["%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y", "%d/%m/%Y"];
const TIME_FORMATS: [&str; 4] = ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];

/// Used when a row has no end time.
pub const DEFAULT_EVENT_DURATION_HOURS: i64 = 2;

/// Sheet labels that differ from the platform's wire enum. The only place this rewrite happens.
const REGISTRATION_ALIASES: [(&str, RegistrationType); 1] = [("TICKETS", RegistrationType::Ticketing)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub record: EventRecord,
    /// Cells that were filled in but unusable and got replaced by a default
    pub fallbacks: Vec<Fallback>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fallback {
    pub field: RecordField,
    pub value: String,
    pub replaced_with: String,
}

#[instrument(skip(row, timezone), fields(row = row.number))]
pub fn normalize_row(row: &RawRow, timezone: Tz) -> Result<NormalizedRow, ValidationError> {
    let number = row.number;
    let invalid = |field: RecordField, kind: ValidationErrorKind| ValidationError::new(number, field, kind);

    let title = row
        .get(RecordField::Title)
        .ok_or_else(|| invalid(RecordField::Title, ValidationErrorKind::Missing))?
        .to_string();
    let location = row
        .get(RecordField::Location)
        .ok_or_else(|| invalid(RecordField::Location, ValidationErrorKind::Missing))?
        .to_string();

    let (start_date_raw, start_time_raw) = split_date_and_time(
        row.get(RecordField::StartDate),
        row.get(RecordField::StartTime),
    );
    let (end_date_raw, end_time_raw) =
        split_date_and_time(row.get(RecordField::EndDate), row.get(RecordField::EndTime));

    let start_date = parse_date(start_date_raw)
        .map_err(|kind| invalid(RecordField::StartDate, kind))?;
    let start_time = parse_time(start_time_raw)
        .map_err(|kind| invalid(RecordField::StartTime, kind))?;
    let start = to_instant(start_date.and_time(start_time), timezone)
        .map_err(|kind| invalid(RecordField::StartTime, kind))?;

    let end_date = match end_date_raw {
        Some(raw) => parse_date(Some(raw)).map_err(|kind| invalid(RecordField::EndDate, kind))?,
        None => start_date,
    };
    let (end, end_field) = match end_time_raw {
        Some(raw) => {
            let end_time = parse_time(Some(raw)).map_err(|kind| invalid(RecordField::EndTime, kind))?;
            let end = to_instant(end_date.and_time(end_time), timezone)
                .map_err(|kind| invalid(RecordField::EndTime, kind))?;
            (end, RecordField::EndTime)
        }
        None => {
            debug!("No end time, assuming {} hours", DEFAULT_EVENT_DURATION_HOURS);
            let end_start = to_instant(end_date.and_time(start_time), timezone)
                .map_err(|kind| invalid(RecordField::EndDate, kind))?;
            (end_start + TimeDelta::hours(DEFAULT_EVENT_DURATION_HOURS), RecordField::EndDate)
        }
    };

    if end <= start {
        return Err(invalid(
            end_field,
            ValidationErrorKind::EndNotAfterStart {
                start: format_local(start, timezone),
                end: format_local(end, timezone),
            },
        ));
    }

    let registration_type = normalize_registration_type(row.get(RecordField::RegistrationType))
        .map_err(|kind| invalid(RecordField::RegistrationType, kind))?;

    let mut fallbacks = Vec::new();
    let ticket_price = parse_with_fallback(
        row,
        RecordField::TicketPrice,
        Price::ZERO,
        Price::parse,
        &mut fallbacks,
    );
    let capacity = parse_with_fallback(
        row,
        RecordField::Capacity,
        DEFAULT_CAPACITY,
        parse_capacity,
        &mut fallbacks,
    );

    let optional = |field: RecordField| row.get(field).map(str::to_string);

    Ok(NormalizedRow {
        record: EventRecord {
            row: number,
            title,
            event_type: optional(RecordField::EventType),
            start,
            end,
            timezone,
            location,
            teaser: optional(RecordField::Teaser),
            description: optional(RecordField::Description),
            ticket_price,
            capacity,
            registration_type,
            image_ref: optional(RecordField::ImageRef),
        },
        fallbacks,
    })
}

/// Uppercases and trims the label, then resolves aliases. Blank means RSVP.
pub fn normalize_registration_type(raw: Option<&str>) -> Result<RegistrationType, ValidationErrorKind> {
    let Some(raw) = raw else {
        return Ok(RegistrationType::Rsvp);
    };

    let normalized = raw.trim().to_uppercase().replace([' ', '-'], "_");

    if let Some((_, alias)) = REGISTRATION_ALIASES
        .iter()
        .find(|(label, _)| *label == normalized)
    {
        info!("Registration type '{}' is sent as {}", raw, alias);
        return Ok(*alias);
    }

    RegistrationType::from_str(&normalized)
        .map_err(|_| ValidationErrorKind::UnknownRegistrationType(raw.to_string()))
}

/// A date cell may carry the time too (`2025-11-01 19:00`) when the time column is empty.
fn split_date_and_time<'a>(
    date: Option<&'a str>,
    time: Option<&'a str>,
) -> (Option<&'a str>, Option<&'a str>) {
    match (date, time) {
        (Some(date), None) => match date.split_once([' ', 'T']) {
            Some((date_part, time_part)) if !time_part.trim().is_empty() => {
                (Some(date_part.trim()), Some(time_part.trim()))
            }
            _ => (Some(date), None),
        },
        other => other,
    }
}

fn parse_date(raw: Option<&str>) -> Result<NaiveDate, ValidationErrorKind> {
    let raw = raw.ok_or(ValidationErrorKind::Missing)?;

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .ok_or_else(|| ValidationErrorKind::MalformedDate(raw.to_string()))
}

fn parse_time(raw: Option<&str>) -> Result<NaiveTime, ValidationErrorKind> {
    let raw = raw.ok_or(ValidationErrorKind::Missing)?;
    let upper = raw.to_uppercase();

    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&upper, format).ok())
        .ok_or_else(|| ValidationErrorKind::MalformedTime(raw.to_string()))
}

/// Ambiguous wall times (DST fall-back) resolve to the earlier instant.
fn to_instant(local: NaiveDateTime, timezone: Tz) -> Result<DateTime<Utc>, ValidationErrorKind> {
    timezone
        .from_local_datetime(&local)
        .earliest()
        .map(|instant| instant.with_timezone(&Utc))
        .ok_or_else(|| ValidationErrorKind::NonexistentLocalTime(local.format("%Y-%m-%d %H:%M").to_string()))
}

fn format_local(instant: DateTime<Utc>, timezone: Tz) -> String {
    instant
        .with_timezone(&timezone)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Thousands separators are dropped, like in prices: `1,000` is a thousand seats.
fn parse_capacity(raw: &str) -> Option<u32> {
    u32::from_str(&raw.replace(',', ""))
        .ok()
        .filter(|capacity| *capacity > 0)
}

fn parse_with_fallback<T, P>(
    row: &RawRow,
    field: RecordField,
    default: T,
    parse: P,
    fallbacks: &mut Vec<Fallback>,
) -> T
where
    T: ToString,
    P: Fn(&str) -> Option<T>,
{
    match row.get(field) {
        None => {
            debug!("No {}, using {}", field, default.to_string());
            default
        }
        Some(raw) => parse(raw).unwrap_or_else(|| {
            warn!(
                "Row {} has an invalid {} '{}', using {} instead",
                row.number,
                field,
                raw,
                default.to_string()
            );
            fallbacks.push(Fallback {
                field,
                value: raw.to_string(),
                replaced_with: default.to_string(),
            });
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const TORONTO: Tz = chrono_tz::America::Toronto;

    fn build_row() -> RawRow {
        RawRow::new(2)
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

    fn normalize(row: &RawRow) -> Result<NormalizedRow, ValidationError> {
        normalize_row(row, TORONTO)
    }

    #[test_log::test]
    fn should_normalize_a_complete_row() {
        let normalized = normalize(&build_row()).unwrap();
        let record = normalized.record;

        assert_eq!(record.title, "Movie Night");
        assert_eq!(record.start, Utc.with_ymd_and_hms(2025, 11, 1, 23, 0, 0).unwrap());
        assert_eq!(record.end, Utc.with_ymd_and_hms(2025, 11, 2, 2, 0, 0).unwrap());
        assert_eq!(record.ticket_price, Price::from_cents(1500));
        assert_eq!(record.capacity, 50);
        assert_eq!(record.registration_type, RegistrationType::Ticketing);
        assert!(normalized.fallbacks.is_empty());
    }

    #[test_log::test]
    fn tickets_in_any_case_or_spacing_should_become_ticketing() {
        for label in ["TICKETS", "tickets", "  Tickets ", "tIcKeTs"] {
            let row = build_row().with(RecordField::RegistrationType, label);

            assert_eq!(
                normalize(&row).unwrap().record.registration_type,
                RegistrationType::Ticketing,
                "{label}"
            );
        }
    }

    #[test_log::test]
    fn should_accept_wire_labels_and_separators() {
        assert_eq!(normalize_registration_type(Some("rsvp")), Ok(RegistrationType::Rsvp));
        assert_eq!(
            normalize_registration_type(Some("no registration")),
            Ok(RegistrationType::NoRegistration)
        );
        assert_eq!(
            normalize_registration_type(Some("External")),
            Ok(RegistrationType::External)
        );
        assert_eq!(normalize_registration_type(None), Ok(RegistrationType::Rsvp));
    }

    #[test_log::test]
    fn when_registration_type_is_unknown_should_fail() {
        let row = build_row().with(RecordField::RegistrationType, "WALK-IN");

        let err = normalize(&row).unwrap_err();

        assert_eq!(err.field, RecordField::RegistrationType);
        assert_eq!(err.row, 2);
    }

    #[test_log::test]
    fn empty_price_and_capacity_should_use_defaults_silently() {
        let row = build_row()
            .with(RecordField::TicketPrice, "")
            .with(RecordField::Capacity, " ");

        let normalized = normalize(&row).unwrap();

        assert_eq!(normalized.record.ticket_price, Price::ZERO);
        assert_eq!(normalized.record.capacity, DEFAULT_CAPACITY);
        assert!(normalized.fallbacks.is_empty());
    }

    #[test_log::test]
    fn invalid_price_and_capacity_should_fall_back_and_be_reported() {
        let row = build_row()
            .with(RecordField::TicketPrice, "abc")
            .with(RecordField::Capacity, "0");

        let normalized = normalize(&row).unwrap();

        assert_eq!(normalized.record.ticket_price, Price::ZERO);
        assert_eq!(normalized.record.capacity, 100);
        assert_eq!(
            normalized.fallbacks,
            vec![
                Fallback {
                    field: RecordField::TicketPrice,
                    value: "abc".to_string(),
                    replaced_with: "0.00".to_string(),
                },
                Fallback {
                    field: RecordField::Capacity,
                    value: "0".to_string(),
                    replaced_with: "100".to_string(),
                },
            ]
        );
    }

    #[test_log::test]
    fn capacity_with_thousands_separators_should_be_read_in_full() {
        let row = build_row().with(RecordField::Capacity, "1,000");

        let normalized = normalize(&row).unwrap();

        assert_eq!(normalized.record.capacity, 1000);
        assert!(normalized.fallbacks.is_empty());
    }

    #[test_log::test]
    fn should_accept_us_dates_and_12_hour_times() {
        let row = build_row()
            .with(RecordField::StartDate, "11/01/2025")
            .with(RecordField::StartTime, "7:00 pm")
            .with(RecordField::EndDate, "11/01/2025")
            .with(RecordField::EndTime, "10:00 PM");

        assert_eq!(normalize(&row).unwrap().record, normalize(&build_row()).unwrap().record);
    }

    #[test_log::test]
    fn should_split_a_combined_start_cell() {
        let row = build_row()
            .with(RecordField::StartDate, "2025-11-01 19:00")
            .with(RecordField::StartTime, "");

        assert_eq!(
            normalize(&row).unwrap().record.start,
            Utc.with_ymd_and_hms(2025, 11, 1, 23, 0, 0).unwrap()
        );
    }

    #[test_log::test]
    fn when_start_time_is_malformed_should_cite_start_time() {
        let row = build_row().with(RecordField::StartTime, "25:00");

        let err = normalize(&row).unwrap_err();

        assert_eq!(err.field, RecordField::StartTime);
        assert_eq!(err.kind, ValidationErrorKind::MalformedTime("25:00".to_string()));
    }

    #[test_log::test]
    fn when_end_date_is_malformed_should_cite_end_date() {
        let row = build_row().with(RecordField::EndDate, "someday");

        let err = normalize(&row).unwrap_err();

        assert_eq!(err.field, RecordField::EndDate);
        assert!(matches!(err.kind, ValidationErrorKind::MalformedDate(_)));
    }

    #[test_log::test]
    fn when_end_is_missing_should_default_to_two_hours_after_start() {
        let row = build_row()
            .with(RecordField::EndDate, "")
            .with(RecordField::EndTime, "");

        let record = normalize(&row).unwrap().record;

        assert_eq!(record.end - record.start, TimeDelta::hours(DEFAULT_EVENT_DURATION_HOURS));
    }

    #[test_log::test]
    fn when_only_end_date_is_missing_should_use_start_date() {
        let row = build_row().with(RecordField::EndDate, "");

        let record = normalize(&row).unwrap().record;

        assert_eq!(record.end, Utc.with_ymd_and_hms(2025, 11, 2, 2, 0, 0).unwrap());
    }

    #[test_log::test]
    fn when_end_is_before_start_should_fail() {
        let row = build_row().with(RecordField::EndTime, "18:00");

        let err = normalize(&row).unwrap_err();

        assert_eq!(err.field, RecordField::EndTime);
        assert!(matches!(err.kind, ValidationErrorKind::EndNotAfterStart { .. }));
    }

    #[test_log::test]
    fn when_local_time_falls_in_dst_gap_should_fail() {
        let row = build_row()
            .with(RecordField::StartDate, "2025-03-09")
            .with(RecordField::StartTime, "02:30")
            .with(RecordField::EndDate, "2025-03-09");

        let err = normalize(&row).unwrap_err();

        assert_eq!(err.field, RecordField::StartTime);
        assert!(matches!(err.kind, ValidationErrorKind::NonexistentLocalTime(_)));
    }

    #[test_log::test]
    fn when_title_or_location_is_blank_should_fail() {
        let no_title = build_row().with(RecordField::Title, "  ");
        let no_location = build_row().with(RecordField::Location, "");

        assert_eq!(normalize(&no_title).unwrap_err().field, RecordField::Title);
        assert_eq!(normalize(&no_location).unwrap_err().field, RecordField::Location);
    }

    #[test_log::test]
    fn blank_optional_fields_should_be_none() {
        let row = build_row()
            .with(RecordField::Description, "   ")
            .with(RecordField::ImageRef, "");

        let record = normalize(&row).unwrap().record;

        assert_eq!(record.description, None);
        assert_eq!(record.image_ref, None);
        assert_eq!(record.teaser, None);
    }
}
