use super::columns::rows_from_values;
use crate::config::model::GoogleConfig;
use crate::error::SheetError;
use crate::event::model::RawRow;
use crate::http::client::send_json;
use async_trait::async_trait;
use reqwest::Url;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

pub const GOOGLE_SHEETS_URL: &str = "https://sheets.googleapis.com";

/// Point-in-time snapshot of the desired events, in sheet order.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn read_rows(&self) -> Result<Vec<RawRow>, SheetError>;
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

pub struct GoogleSheetsAPI {
    client: ClientWithMiddleware,
    base_url: String,
    sheet_id: String,
    range: String,
    access_token: String,
}

impl GoogleSheetsAPI {
    pub fn new(config: &GoogleConfig, client: ClientWithMiddleware) -> Self {
        Self {
            client,
            base_url: GOOGLE_SHEETS_URL.to_string(),
            sheet_id: config.sheet_id.clone(),
            range: config.sheet_range.clone(),
            access_token: config.access_token.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// The range is sent as one path segment, so `My Sheet!A1:Z` gets escaped properly.
    fn values_url(&self) -> Result<Url, SheetError> {
        let invalid = || SheetError::InvalidUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;

        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.sheet_id.as_str(),
                "values",
                self.range.as_str(),
            ]);

        Ok(url)
    }
}

/// Sheets answers with strings by default but numbers can slip through unformatted cells.
fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsAPI {
    #[instrument(skip(self), fields(range = %self.range))]
    async fn read_rows(&self) -> Result<Vec<RawRow>, SheetError> {
        info!("Fetching events from the spreadsheet");

        let response: ValueRangeResponse = send_json(
            self.client
                .get(self.values_url()?)
                .bearer_auth(&self.access_token),
        )
        .await?;

        if response.values.is_empty() {
            warn!("No data found in spreadsheet");
        }

        let values: Vec<Vec<String>> = response
            .values
            .iter()
            .map(|line| line.iter().map(cell_text).collect())
            .collect();

        let rows = rows_from_values(&values)?;
        info!("Read {} event rows", rows.len());

        Ok(rows)
    }
}
