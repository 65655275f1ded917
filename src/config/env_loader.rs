use crate::config::model::*;
use crate::error::ConfigError;
use chrono_tz::Tz;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const REQUIRED_KEYS: [&str; 4] = [
    "WIX_API_KEY",
    "WIX_SITE_ID",
    "GOOGLE_SHEET_ID",
    "GOOGLE_ACCESS_TOKEN",
];

pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(env_lookup)
}

pub fn env_lookup(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Builds the configuration from a flat key-value source, failing on the first problem.
pub fn load_config_from<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let wix = WixConfig {
        api_key: load_required_config(&lookup, "WIX_API_KEY")?,
        site_id: load_required_config(&lookup, "WIX_SITE_ID")?,
        account_id: load_optional_config(&lookup, "WIX_ACCOUNT_ID"),
        base_url: load_optional_config(&lookup, "WIX_API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_WIX_BASE_URL.to_string()),
    };

    let google = GoogleConfig {
        sheet_id: load_required_config(&lookup, "GOOGLE_SHEET_ID")?,
        access_token: load_required_config(&lookup, "GOOGLE_ACCESS_TOKEN")?,
        sheet_range: load_optional_config(&lookup, "SHEET_RANGE")
            .unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
    };

    let sync = SyncConfig {
        timezone: load_parsed_config::<Tz, _>(&lookup, "EVENT_TIMEZONE")?
            .unwrap_or(DEFAULT_TIMEZONE),
        ticket_currency: load_optional_config(&lookup, "TICKET_CURRENCY")
            .map(|currency| currency.to_uppercase())
            .unwrap_or_else(|| DEFAULT_TICKET_CURRENCY.to_string()),
        write_delay: load_parsed_config::<u64, _>(&lookup, "SYNC_WRITE_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_WRITE_DELAY),
        max_image_bytes: load_parsed_config(&lookup, "MAX_IMAGE_BYTES")?
            .unwrap_or(DEFAULT_MAX_IMAGE_BYTES),
        existing_events_cap: load_parsed_config(&lookup, "EXISTING_EVENTS_CAP")?
            .unwrap_or(DEFAULT_EXISTING_EVENTS_CAP),
    };

    let retry_max_attempts = match load_parsed_config::<u32, _>(&lookup, "RETRY_MAX_ATTEMPTS")? {
        Some(0) => {
            return Err(ConfigError::Invalid {
                key: "RETRY_MAX_ATTEMPTS".to_string(),
                reason: "must be at least 1".to_string(),
            })
        }
        Some(attempts) => attempts,
        None => DEFAULT_RETRY_MAX_ATTEMPTS,
    };

    Ok(Config {
        wix,
        google,
        sync,
        retry_max_attempts,
    })
}

/// Every configuration problem at once, for the `validate` command.
pub fn validation_errors<F>(lookup: F) -> Vec<ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors: Vec<ConfigError> = REQUIRED_KEYS
        .iter()
        .filter_map(|key| load_required_config(&lookup, key).err())
        .collect();

    // Optional keys are only checked once the required ones are there
    if errors.is_empty() {
        if let Err(err) = load_config_from(&lookup) {
            errors.push(err);
        }
    }

    errors
}

/// The Loki endpoint, only once the rest of the configuration holds up.
pub fn loki_url<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if !validation_errors(&lookup).is_empty() {
        return None;
    }

    load_optional_config(&lookup, "LOKI_URL")
}

fn load_required_config<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    load_optional_config(lookup, name).ok_or_else(|| ConfigError::MissingKey(name.to_string()))
}

fn load_optional_config<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn load_parsed_config<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
    F: Fn(&str) -> Option<String>,
{
    match load_optional_config(lookup, name) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|err: T::Err| ConfigError::Invalid {
                key: name.to_string(),
                reason: err.to_string(),
            }),
        None => Ok(None),
    }
}
