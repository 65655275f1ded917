use crate::error::{AssetError, RemoteError};
use crate::http::client::{send, send_json};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use tracing::{debug, info, instrument};

pub const GOOGLE_APIS_URL: &str = "https://www.googleapis.com";
const DEFAULT_FILE_NAME: &str = "event_image";

lazy_static! {
    static ref DRIVE_URL_ID_PATTERNS: [Regex; 2] = [
        Regex::new(r"/file/d/([a-zA-Z0-9_-]+)").expect("Failed to create file path regex"),
        Regex::new(r"[?&]id=([a-zA-Z0-9_-]+)").expect("Failed to create id query regex"),
    ];
    static ref BARE_DRIVE_ID: Regex =
        Regex::new(r"^[a-zA-Z0-9_-]{10,}$").expect("Failed to create drive id regex");
}

/// Where a sheet's image cell points to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetReference {
    Drive(String),
    Url(Url),
}

impl AssetReference {
    /// Drive share links, `open?id=` links and bare file ids resolve to the same Drive file.
    /// Any other http(s) link is downloaded as is.
    pub fn parse(reference: &str) -> Result<Self, AssetError> {
        let reference = reference.trim();
        let unsupported = || AssetError::UnsupportedReference(reference.to_string());

        if reference.starts_with("http://") || reference.starts_with("https://") {
            let url = Url::parse(reference).map_err(|_| unsupported())?;
            let is_google = url
                .host_str()
                .is_some_and(|host| host == "google.com" || host.ends_with(".google.com"));

            if is_google {
                if let Some(id) = DRIVE_URL_ID_PATTERNS
                    .iter()
                    .find_map(|pattern| pattern.captures(reference))
                    .and_then(|captures| captures.get(1))
                {
                    return Ok(AssetReference::Drive(id.as_str().to_string()));
                }
            }

            return Ok(AssetReference::Url(url));
        }

        if BARE_DRIVE_ID.is_match(reference) {
            return Ok(AssetReference::Drive(reference.to_string()));
        }

        Err(unsupported())
    }
}

impl Display for AssetReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetReference::Drive(id) => write!(f, "drive:{}", id),
            AssetReference::Url(url) => write!(f, "{}", url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Only ever returns `image/*` assets.
    async fn fetch(&self, reference: &AssetReference) -> Result<Asset, AssetError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileMetadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

pub struct DriveAPI {
    client: ClientWithMiddleware,
    base_url: String,
    access_token: String,
}

impl DriveAPI {
    pub fn new(access_token: &str, client: ClientWithMiddleware) -> Self {
        Self {
            client,
            base_url: GOOGLE_APIS_URL.to_string(),
            access_token: access_token.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn file_url(&self, id: &str) -> String {
        format!("{}/drive/v3/files/{}", self.base_url, id)
    }

    #[instrument(skip(self))]
    async fn fetch_drive_file(&self, id: &str) -> Result<Asset, AssetError> {
        let metadata: DriveFileMetadata = send_json(
            self.client
                .get(self.file_url(id))
                .query(&[("fields", "name,mimeType"), ("supportsAllDrives", "true")])
                .bearer_auth(&self.access_token),
        )
        .await?;

        let mime_type = metadata.mime_type.unwrap_or_default();
        ensure_image(&mime_type)?;

        let response = send(
            self.client
                .get(self.file_url(id))
                .query(&[("alt", "media"), ("supportsAllDrives", "true")])
                .bearer_auth(&self.access_token),
        )
        .await?;
        let bytes = response.bytes().await.map_err(RemoteError::from)?;

        info!("Downloaded {} bytes from Drive", bytes.len());

        Ok(Asset {
            bytes: bytes.to_vec(),
            file_name: metadata
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
            mime_type,
        })
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn fetch_url(&self, url: &Url) -> Result<Asset, AssetError> {
        let response = send(self.client.get(url.clone())).await?;

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_lowercase())
            .unwrap_or_default();
        ensure_image(&mime_type)?;

        let bytes = response.bytes().await.map_err(RemoteError::from)?;
        debug!("Downloaded {} bytes", bytes.len());

        Ok(Asset {
            bytes: bytes.to_vec(),
            file_name: file_name_of(url),
            mime_type,
        })
    }
}

fn ensure_image(mime_type: &str) -> Result<(), AssetError> {
    if mime_type.starts_with("image/") {
        Ok(())
    } else {
        Err(AssetError::NotAnImage(if mime_type.is_empty() {
            "unknown".to_string()
        } else {
            mime_type.to_string()
        }))
    }
}

fn file_name_of(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}

#[async_trait]
impl AssetFetcher for DriveAPI {
    async fn fetch(&self, reference: &AssetReference) -> Result<Asset, AssetError> {
        match reference {
            AssetReference::Drive(id) => self.fetch_drive_file(id).await,
            AssetReference::Url(url) => self.fetch_url(url).await,
        }
    }
}
