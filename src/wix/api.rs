use super::dto::*;
use super::model::{EventsPage, PageCursor, RemoteEvent, TicketRequest, UploadedFile};
use crate::config::model::WixConfig;
use crate::error::{ConfigError, RemoteError};
use crate::http::client::send_json;
use crate::platform::EventPlatform;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, info, instrument};

const EVENTS_PATH: &str = "/events/v3/events";
const EVENTS_QUERY_PATH: &str = "/events/v3/events/query";
const TICKET_DEFINITIONS_PATH: &str = "/events-ticket-definitions/v3/ticket-definitions";
const UPLOAD_URL_PATH: &str = "/site-media/v1/files/generate-upload-url";
const FEE_TYPE: &str = "FEE_ADDED_AT_CHECKOUT";

const SITE_ID_HEADER: &str = "wix-site-id";
const ACCOUNT_ID_HEADER: &str = "wix-account-id";

pub struct WixAPI {
    client: ClientWithMiddleware,
    base_url: String,
    headers: HeaderMap,
}

impl WixAPI {
    pub fn new(config: &WixConfig, client: ClientWithMiddleware) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();

        let mut api_key = header_value("WIX_API_KEY", &config.api_key)?;
        api_key.set_sensitive(true);
        headers.insert(AUTHORIZATION, api_key);
        headers.insert(
            HeaderName::from_static(SITE_ID_HEADER),
            header_value("WIX_SITE_ID", &config.site_id)?,
        );
        if let Some(account_id) = &config.account_id {
            headers.insert(
                HeaderName::from_static(ACCOUNT_ID_HEADER),
                header_value("WIX_ACCOUNT_ID", account_id)?,
            );
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn header_value(key: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|err| ConfigError::Invalid {
        key: key.to_string(),
        reason: err.to_string(),
    })
}

fn event_from(response: EventEnvelope<EventResponse>) -> Result<RemoteEvent, RemoteError> {
    response
        .event
        .to_model()
        .ok_or_else(|| RemoteError::InvalidResponse("event without id".to_string()))
}

#[async_trait]
impl EventPlatform for WixAPI {
    #[instrument(skip(self))]
    async fn query_events(&self, limit: usize, page: &PageCursor) -> Result<EventsPage, RemoteError> {
        let paging = match page {
            PageCursor::Offset(offset) => Paging {
                limit,
                offset: Some(*offset),
                cursor: None,
            },
            PageCursor::Cursor(cursor) => Paging {
                limit,
                offset: None,
                cursor: Some(cursor.clone()),
            },
        };

        let response: QueryEventsResponse = send_json(
            self.client
                .post(self.url(EVENTS_QUERY_PATH))
                .headers(self.headers.clone())
                .json(&QueryEventsRequest {
                    query: EventsQuery { paging },
                    fields: &REQUESTED_FIELDS,
                }),
        )
        .await?;

        let received = response.events.len();
        let events: Vec<RemoteEvent> = response
            .events
            .iter()
            .filter_map(EventResponse::to_model)
            .collect();

        debug!("Got {} events ({} usable)", received, events.len());

        Ok(EventsPage {
            events,
            received,
            next_cursor: response
                .paging_metadata
                .as_ref()
                .and_then(PagingMetadata::next_cursor),
        })
    }

    #[instrument(skip_all, fields(title = event.title.as_deref().unwrap_or_default()))]
    async fn create_event(&self, event: &EventPayload) -> Result<RemoteEvent, RemoteError> {
        let response: EventEnvelope<EventResponse> = send_json(
            self.client
                .post(self.url(EVENTS_PATH))
                .headers(self.headers.clone())
                .json(&EventEnvelope { event }),
        )
        .await?;

        let created = event_from(response)?;
        info!("Created event {}", created.id);

        Ok(created)
    }

    #[instrument(skip(self, patch))]
    async fn update_event(&self, id: &str, patch: &EventPayload) -> Result<RemoteEvent, RemoteError> {
        let response: EventEnvelope<EventResponse> = send_json(
            self.client
                .patch(self.url(&format!("{}/{}", EVENTS_PATH, id)))
                .headers(self.headers.clone())
                .json(&EventEnvelope { event: patch }),
        )
        .await?;

        event_from(response)
    }

    #[instrument(skip_all, fields(event_id = %ticket.event_id))]
    async fn create_ticket_definition(&self, ticket: &TicketRequest) -> Result<String, RemoteError> {
        let request = TicketDefinitionRequest {
            ticket_definition: TicketDefinitionPayload {
                event_id: ticket.event_id.clone(),
                name: ticket.name.clone(),
                limit_per_checkout: ticket.limit_per_checkout,
                pricing_method: PricingMethod {
                    fixed_price: Money {
                        value: ticket.price.to_string(),
                        currency: ticket.currency.clone(),
                    },
                },
                fee_type: FEE_TYPE,
                limited: true,
                quantity: ticket.quantity,
            },
        };

        let response: TicketDefinitionResponse = send_json(
            self.client
                .post(self.url(TICKET_DEFINITIONS_PATH))
                .headers(self.headers.clone())
                .json(&request),
        )
        .await?;

        response
            .ticket_definition
            .and_then(|definition| definition.id)
            .ok_or_else(|| RemoteError::InvalidResponse("ticket definition without id".to_string()))
    }

    #[instrument(skip(self))]
    async fn generate_upload_url(&self, mime_type: &str, file_name: &str) -> Result<String, RemoteError> {
        let response: GenerateUploadUrlResponse = send_json(
            self.client
                .post(self.url(UPLOAD_URL_PATH))
                .headers(self.headers.clone())
                .json(&GenerateUploadUrlRequest {
                    mime_type: mime_type.to_string(),
                    file_name: file_name.to_string(),
                }),
        )
        .await?;

        Ok(response.upload_url)
    }

    // The upload URL is pre-signed, so no platform credentials go with it
    #[instrument(skip(self, upload_url, bytes), fields(size = bytes.len()))]
    async fn upload_bytes(
        &self,
        upload_url: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, RemoteError> {
        let response: UploadResponse = send_json(
            self.client
                .put(upload_url)
                .header(CONTENT_TYPE, mime_type)
                .body(bytes),
        )
        .await?;

        Ok(response.file.to_model())
    }
}
