use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

pub const DEFAULT_CAPACITY: u32 = 100;

/// Desired state of one event, built from a spreadsheet row. Never mutated after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub row: usize,
    pub title: String,
    pub event_type: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: Tz,
    pub location: String,
    pub teaser: Option<String>,
    pub description: Option<String>,
    pub ticket_price: Price,
    pub capacity: u32,
    pub registration_type: RegistrationType,
    pub image_ref: Option<String>,
}

impl EventRecord {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(&self.title, self.start, self.timezone)
    }

    pub fn wants_ticket(&self) -> bool {
        self.registration_type == RegistrationType::Ticketing && !self.ticket_price.is_zero()
    }
}

/// Matches a desired record to an existing remote event.
///
/// Both sides must build it through [`IdentityKey::new`]: the start instant is
/// viewed in the event timezone and truncated to the minute, so a record and
/// the event created from it always produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub title: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
}

impl IdentityKey {
    pub fn new(title: &str, start: DateTime<Utc>, timezone: Tz) -> Self {
        let local = start.with_timezone(&timezone).naive_local();
        let start_time = NaiveTime::from_hms_opt(local.hour(), local.minute(), 0)
            .unwrap_or(NaiveTime::MIN);

        Self {
            title: title.trim().to_string(),
            start_date: local.date(),
            start_time,
        }
    }
}

impl Display for IdentityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.title,
            self.start_date.format("%Y-%m-%d"),
            self.start_time.format("%H:%M")
        )
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    Serialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationType {
    Rsvp,
    Ticketing,
    External,
    NoRegistration,
}

/// A non-negative amount of money held in cents, so `"25.00"` and `"25.0"` are the same price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    cents: u64,
}

impl Price {
    pub const ZERO: Price = Price { cents: 0 };

    pub fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub fn cents(&self) -> u64 {
        self.cents
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Accepts things like `15`, `15.5`, `15.00`, `$1,250.00`. Negative or garbage input gives `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .trim()
            .trim_start_matches('$')
            .chars()
            .filter(|c| *c != ',')
            .collect();

        let (whole, fraction) = match cleaned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (cleaned.as_str(), ""),
        };

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
        {
            return None;
        }

        let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut fraction_digits = fraction.chars().map(|c| u64::from(c as u8 - b'0'));
        let tens = fraction_digits.next().unwrap_or(0);
        let ones = fraction_digits.next().unwrap_or(0);
        let round_up = fraction_digits.next().is_some_and(|digit| digit >= 5);

        let cents = whole
            .checked_mul(100)?
            .checked_add(tens * 10 + ones + u64::from(round_up))?;

        Some(Self { cents })
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Columns of a spreadsheet row that end up in an [`EventRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    Title,
    EventType,
    StartDate,
    StartTime,
    EndDate,
    EndTime,
    Location,
    TicketPrice,
    Capacity,
    RegistrationType,
    ImageRef,
    Teaser,
    Description,
}

/// One spreadsheet row with its cells keyed by the field their column maps to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based row number as shown in the spreadsheet
    pub number: usize,
    pub cells: HashMap<RecordField, String>,
}

impl RawRow {
    pub fn new(number: usize) -> Self {
        Self {
            number,
            cells: HashMap::new(),
        }
    }

    pub fn with(mut self, field: RecordField, value: &str) -> Self {
        self.cells.insert(field, value.to_string());
        self
    }

    /// Trimmed cell value, `None` when the cell is absent or blank.
    pub fn get(&self, field: RecordField) -> Option<&str> {
        self.cells
            .get(&field)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}
