use crate::event::model::EventRecord;
use crate::platform::EventPlatform;
use crate::wix::model::TicketRequest;
use serde::Serialize;
use tracing::{info, instrument, warn};

pub const TICKET_NAME: &str = "General Admission";
pub const LIMIT_PER_CHECKOUT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TicketOutcome {
    /// Not a paid ticketing event
    NotApplicable,
    /// Turned off for this run
    Disabled,
    Created { ticket_id: String },
    Failed { error: String },
}

/// Adds a single fixed-price ticket to freshly created ticketing events.
///
/// A failure here never undoes the event: it is reported as a warning and the
/// record still counts as created.
pub struct TicketProvisioner<'a> {
    platform: &'a dyn EventPlatform,
    currency: String,
    enabled: bool,
}

impl<'a> TicketProvisioner<'a> {
    pub fn new(platform: &'a dyn EventPlatform, currency: &str, enabled: bool) -> Self {
        Self {
            platform,
            currency: currency.to_string(),
            enabled,
        }
    }

    #[instrument(skip(self, record), fields(row = record.row))]
    pub async fn provision(&self, event_id: &str, record: &EventRecord) -> TicketOutcome {
        if !record.wants_ticket() {
            return TicketOutcome::NotApplicable;
        }

        if !self.enabled {
            info!("Ticket creation is turned off, add tickets to '{}' from the dashboard", record.title);
            return TicketOutcome::Disabled;
        }

        let request = TicketRequest {
            event_id: event_id.to_string(),
            name: TICKET_NAME.to_string(),
            price: record.ticket_price,
            currency: self.currency.clone(),
            quantity: record.capacity,
            limit_per_checkout: LIMIT_PER_CHECKOUT,
        };

        match self.platform.create_ticket_definition(&request).await {
            Ok(ticket_id) => {
                info!(
                    "Created ticket {} at {} {} for {} attendees",
                    ticket_id, record.ticket_price, self.currency, record.capacity
                );
                TicketOutcome::Created { ticket_id }
            }
            Err(err) => {
                warn!("Failed to create ticket (event {} still exists): {}", event_id, err);
                TicketOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }
}
