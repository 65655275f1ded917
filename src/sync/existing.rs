use crate::error::StateFetchError;
use crate::event::model::IdentityKey;
use crate::platform::EventPlatform;
use crate::wix::model::{PageCursor, RemoteEvent};
use chrono_tz::Tz;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Snapshot of the platform's events, looked up by identity key. Read once per run.
pub type ExistingEvents = HashMap<IdentityKey, RemoteEvent>;

/// Pages through every event, following the platform's cursor when it hands one
/// out and falling back to offsets otherwise.
///
/// Going past `cap` is an error, never a truncated list.
#[instrument(skip(platform))]
pub async fn list_all_events(
    platform: &dyn EventPlatform,
    page_size: usize,
    cap: usize,
) -> Result<Vec<RemoteEvent>, StateFetchError> {
    let mut events = Vec::new();
    let mut received = 0;
    let mut page = PageCursor::Offset(0);

    loop {
        let result = platform.query_events(page_size, &page).await?;

        received += result.received;
        events.extend(result.events);
        debug!("{} events received so far", received);

        if received > cap {
            return Err(StateFetchError::TooManyEvents { cap });
        }

        let following_cursors = matches!(page, PageCursor::Cursor(_));

        page = match result.next_cursor {
            _ if result.received == 0 => break,
            Some(cursor) => PageCursor::Cursor(cursor),
            None if following_cursors || result.received < page_size => break,
            None => PageCursor::Offset(received),
        };
    }

    info!("Listed {} existing events", events.len());
    Ok(events)
}

/// Builds the lookup of existing events.
///
/// Events without a start can't be matched and are left out. When two remote
/// events share a key, the first one listed is the one updates go to.
#[instrument(skip(platform))]
pub async fn fetch_existing(
    platform: &dyn EventPlatform,
    timezone: Tz,
    page_size: usize,
    cap: usize,
) -> Result<ExistingEvents, StateFetchError> {
    let events = list_all_events(platform, page_size, cap).await?;
    let mut existing = ExistingEvents::with_capacity(events.len());

    for event in events {
        let Some(key) = event.identity_key(timezone) else {
            warn!("Event '{}' ({}) has no start date, ignoring it", event.title, event.id);
            continue;
        };

        if let Some(first) = existing.get(&key) {
            warn!(
                "Events {} and {} are both '{}', keeping {}",
                first.id, event.id, key, first.id
            );
            continue;
        }

        existing.insert(key, event);
    }

    Ok(existing)
}
