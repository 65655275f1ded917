use chrono_tz::Tz;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

pub const DEFAULT_WIX_BASE_URL: &str = "https://www.wixapis.com";
pub const DEFAULT_SHEET_RANGE: &str = "Sheet1!A1:Z100";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Toronto;
pub const DEFAULT_TICKET_CURRENCY: &str = "CAD";
pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 25 * 1024 * 1024;
pub const DEFAULT_EXISTING_EVENTS_CAP: usize = 1000;
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;

/// Built once at start-up and handed down by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub wix: WixConfig,
    pub google: GoogleConfig,
    pub sync: SyncConfig,
    pub retry_max_attempts: u32,
}

#[derive(Clone)]
pub struct WixConfig {
    pub api_key: String,
    pub site_id: String,
    pub account_id: Option<String>,
    pub base_url: String,
}

impl Debug for WixConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WixConfig")
            .field("api_key", &"<redacted>")
            .field("site_id", &self.site_id)
            .field("account_id", &self.account_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone)]
pub struct GoogleConfig {
    pub sheet_id: String,
    pub access_token: String,
    pub sheet_range: String,
}

impl Debug for GoogleConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("sheet_id", &self.sheet_id)
            .field("access_token", &"<redacted>")
            .field("sheet_range", &self.sheet_range)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub timezone: Tz,
    pub ticket_currency: String,
    /// Pause after every write so the platform's rate limit is never hit.
    pub write_delay: Duration,
    pub max_image_bytes: usize,
    pub existing_events_cap: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE,
            ticket_currency: DEFAULT_TICKET_CURRENCY.to_string(),
            write_delay: DEFAULT_WRITE_DELAY,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            existing_events_cap: DEFAULT_EXISTING_EVENTS_CAP,
        }
    }
}
