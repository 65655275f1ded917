use crate::event::model::RecordField;
use thiserror::Error;

/// Fatal before any network call happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is missing")]
    MissingKey(String),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: String, reason: String },
}

/// A spreadsheet row that could not be turned into an event record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("row {row}: {field}: {kind}")]
pub struct ValidationError {
    pub row: usize,
    pub field: RecordField,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(row: usize, field: RecordField, kind: ValidationErrorKind) -> Self {
        Self { row, field, kind }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    #[error("value is required")]
    Missing,

    #[error("'{0}' is not a recognized date (expected MM/DD/YYYY or YYYY-MM-DD)")]
    MalformedDate(String),

    #[error("'{0}' is not a recognized time (expected HH:MM)")]
    MalformedTime(String),

    #[error("'{0}' is not a registration type (expected one of RSVP, TICKETING, EXTERNAL, NO_REGISTRATION)")]
    UnknownRegistrationType(String),

    #[error("local time {0} does not exist in the event timezone")]
    NonexistentLocalTime(String),

    #[error("end ({end}) must be after start ({start})")]
    EndNotAfterStart { start: String, end: String },
}

/// A call to the event platform that failed for good, retries included.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest_middleware::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Request(reqwest_middleware::Error::Reqwest(err))
    }
}

/// Existing remote state could not be read. Always fatal to the run.
#[derive(Error, Debug)]
pub enum StateFetchError {
    #[error("could not list existing events: {0}")]
    Remote(#[from] RemoteError),

    #[error("more than {cap} existing events, refusing to sync against a partial snapshot")]
    TooManyEvents { cap: usize },
}

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("could not read spreadsheet: {0}")]
    Remote(#[from] RemoteError),

    #[error("missing required columns: {0}")]
    MissingColumns(String),

    #[error("'{0}' is not a usable spreadsheet API URL")]
    InvalidUrl(String),
}

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("'{0}' is not a supported image reference")]
    UnsupportedReference(String),

    #[error("unsupported file type {0}")]
    NotAnImage(String),

    #[error("download failed: {0}")]
    Remote(#[from] RemoteError),
}

#[derive(Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("could not process image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image is {size} bytes and could not be compressed below {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("upload failed: {0}")]
    Upload(#[from] RemoteError),

    #[error("uploaded file has no usable dimensions")]
    MissingDimensions,
}

/// Errors that abort a sync run before any write happened.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    StateFetch(#[from] StateFetchError),
}
