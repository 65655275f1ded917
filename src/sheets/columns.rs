use crate::error::SheetError;
use crate::event::model::{RawRow, RecordField};
use itertools::Itertools;
use std::collections::HashMap;
use tracing::{debug, info};

/// Header spellings accepted for each field, in order of preference.
///
/// A bare `type` header is read as the event type only. Registration type
/// needs an explicit `registration type` / `reg type` column.
const COLUMN_ALIASES: [(RecordField, &[&str]); 13] = [
    (RecordField::Title, &["event_name", "event name", "name", "title"]),
    (RecordField::EventType, &["event_type", "event type", "type", "category"]),
    (RecordField::StartDate, &["start_date", "start date", "date", "event date"]),
    (RecordField::StartTime, &["start_time", "start time", "time"]),
    (RecordField::EndDate, &["end_date", "end date"]),
    (RecordField::EndTime, &["end_time", "end time"]),
    (RecordField::Location, &["location", "venue", "place", "address"]),
    (RecordField::TicketPrice, &["ticket_price", "ticket price", "price", "cost"]),
    (RecordField::Capacity, &["capacity", "max capacity", "seats"]),
    (RecordField::RegistrationType, &["registration_type", "registration type", "reg type"]),
    (RecordField::ImageRef, &["image_url", "image url", "image", "photo", "picture"]),
    (RecordField::Teaser, &["short_description", "short description", "teaser", "summary"]),
    (RecordField::Description, &["detailed_description", "detailed description", "description", "desc", "details"]),
];

pub const REQUIRED_COLUMNS: [RecordField; 4] = [
    RecordField::Title,
    RecordField::StartDate,
    RecordField::StartTime,
    RecordField::Location,
];

/// `" Event-Name "` → `"event_name"`
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .join("_")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    indices: HashMap<RecordField, usize>,
}

impl ColumnMap {
    pub fn from_headers(headers: &[String]) -> Result<Self, SheetError> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        let indices: HashMap<RecordField, usize> = COLUMN_ALIASES
            .iter()
            .filter_map(|(field, aliases)| {
                aliases
                    .iter()
                    .find_map(|alias| {
                        let alias = normalize_header(alias);
                        normalized.iter().position(|header| *header == alias)
                    })
                    .map(|index| (*field, index))
            })
            .collect();

        let missing: Vec<RecordField> = REQUIRED_COLUMNS
            .into_iter()
            .filter(|field| !indices.contains_key(field))
            .collect();

        if !missing.is_empty() {
            return Err(SheetError::MissingColumns(missing.iter().join(", ")));
        }

        info!("Found {} recognized columns", indices.len());
        Ok(Self { indices })
    }

    /// Short rows count as blank on the missing cells.
    pub fn to_row(&self, number: usize, cells: &[String]) -> RawRow {
        let mut row = RawRow::new(number);

        for (field, index) in &self.indices {
            if let Some(value) = cells.get(*index) {
                row.cells.insert(*field, value.clone());
            }
        }

        row
    }
}

/// Splits a header line and data lines into rows. Row numbers are 1-based with
/// the header on row 1, as the sheet shows them when the range starts at `A1`.
pub fn rows_from_values(values: &[Vec<String>]) -> Result<Vec<RawRow>, SheetError> {
    let Some((headers, data)) = values.split_first() else {
        info!("Spreadsheet is empty");
        return Ok(Vec::new());
    };

    let columns = ColumnMap::from_headers(headers)?;

    Ok(data
        .iter()
        .enumerate()
        .filter_map(|(index, cells)| {
            let number = index + 2;

            if cells.iter().all(|cell| cell.trim().is_empty()) {
                debug!("Skipping blank row {}", number);
                return None;
            }

            Some(columns.to_row(number, cells))
        })
        .collect())
}
