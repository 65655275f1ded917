use crate::error::RemoteError;
use crate::wix::dto::EventPayload;
use crate::wix::model::{EventsPage, PageCursor, RemoteEvent, TicketRequest, UploadedFile};
use async_trait::async_trait;

/// Everything the sync needs from the event platform.
///
/// Implementations retry transient failures themselves; an `Err` here is final.
#[async_trait]
pub trait EventPlatform: Send + Sync {
    async fn query_events(&self, limit: usize, page: &PageCursor) -> Result<EventsPage, RemoteError>;

    async fn create_event(&self, event: &EventPayload) -> Result<RemoteEvent, RemoteError>;

    /// `patch` only carries the fields to change.
    async fn update_event(&self, id: &str, patch: &EventPayload) -> Result<RemoteEvent, RemoteError>;

    /// Returns the new ticket definition's id.
    async fn create_ticket_definition(&self, ticket: &TicketRequest) -> Result<String, RemoteError>;

    async fn generate_upload_url(&self, mime_type: &str, file_name: &str) -> Result<String, RemoteError>;

    async fn upload_bytes(
        &self,
        upload_url: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, RemoteError>;
}
