use chrono::{TimeZone, Utc};
use eventsync::config::model::WixConfig;
use eventsync::error::RemoteError;
use eventsync::event::model::Price;
use eventsync::http::client::build_client;
use eventsync::http::retry::RetryPolicy;
use eventsync::platform::EventPlatform;
use eventsync::sync::existing::list_all_events;
use eventsync::wix::api::WixAPI;
use eventsync::wix::dto::{DateAndTimeSettings, EventPayload, LocationPayload, RegistrationPayload};
use eventsync::wix::model::{PageCursor, TicketRequest};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::time::Duration;

fn fast_retries(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(5),
        rate_limit_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        jitter: false,
    }
}

fn build_wix(server: &ServerGuard, max_attempts: u32) -> WixAPI {
    let config = WixConfig {
        api_key: "test-key".to_string(),
        site_id: "site-1".to_string(),
        account_id: Some("account-1".to_string()),
        base_url: server.url(),
    };

    WixAPI::new(&config, build_client(fast_retries(max_attempts)).unwrap()).unwrap()
}

fn listed_event(id: &str, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "dateAndTimeSettings": {
            "startDate": "2025-11-01T23:00:00.000Z",
            "endDate": "2025-11-02T02:00:00.000Z",
            "timeZoneId": "America/Toronto"
        },
        "location": { "type": "VENUE", "address": { "formattedAddress": "123 Fake St" } },
        "registration": { "type": "TICKETING", "initialType": "TICKETING" }
    })
}

#[test_log::test(tokio::test)]
async fn should_query_events_with_platform_headers() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/events/v3/events/query")
        .match_header("authorization", "test-key")
        .match_header("wix-site-id", "site-1")
        .match_header("wix-account-id", "account-1")
        .match_body(Matcher::PartialJson(
            json!({
                "query": { "paging": { "limit": 50, "offset": 0 } },
                "fields": ["DETAILS", "TEXTS", "REGISTRATION"]
            }),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "events": [listed_event("evt-1", "Movie Night")] }).to_string())
        .expect(1)
        .create_async()
        .await;

    let page = build_wix(&server, 3)
        .query_events(50, &PageCursor::Offset(0))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(page.received, 1);
    assert_eq!(page.next_cursor, None);

    let event = &page.events[0];
    assert_eq!(event.id, "evt-1");
    assert_eq!(event.title, "Movie Night");
    assert_eq!(event.start, Some(Utc.with_ymd_and_hms(2025, 11, 1, 23, 0, 0).unwrap()));
    assert_eq!(event.location.as_deref(), Some("123 Fake St"));
    assert_eq!(event.registration_type.as_deref(), Some("TICKETING"));
}

#[test_log::test(tokio::test)]
async fn should_follow_cursors_until_the_last_page() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("POST", "/events/v3/events/query")
        .match_body(Matcher::PartialJson(json!({ "query": { "paging": { "offset": 0 } } })))
        .with_status(200)
        .with_body(
            json!({
                "events": [listed_event("evt-1", "Movie Night"), listed_event("evt-2", "Board Games")],
                "pagingMetadata": { "cursors": { "next": "page-2" } }
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("POST", "/events/v3/events/query")
        .match_body(Matcher::PartialJson(json!({ "query": { "paging": { "cursor": "page-2" } } })))
        .with_status(200)
        .with_body(json!({ "events": [listed_event("evt-3", "Poetry Reading")] }).to_string())
        .expect(1)
        .create_async()
        .await;

    let events = list_all_events(&build_wix(&server, 3), 2, 1_000).await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(
        events.iter().map(|event| event.id.as_str()).collect::<Vec<_>>(),
        vec!["evt-1", "evt-2", "evt-3"]
    );
}

#[test_log::test(tokio::test)]
async fn should_create_events_with_the_ticketing_wire_value() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/events/v3/events")
        .match_body(Matcher::PartialJson(json!({
            "event": {
                "title": "Movie Night",
                "dateAndTimeSettings": {
                    "startDate": "2025-11-01T23:00:00Z",
                    "endDate": "2025-11-02T02:00:00Z",
                    "timeZoneId": "America/Toronto"
                },
                "location": { "type": "VENUE", "address": { "formattedAddress": "123 Fake St" } },
                "registration": { "initialType": "TICKETING" }
            }
        })))
        .with_status(200)
        .with_body(json!({ "event": listed_event("evt-9", "Movie Night") }).to_string())
        .expect(1)
        .create_async()
        .await;

    let payload = EventPayload {
        title: Some("Movie Night".to_string()),
        date_and_time_settings: Some(DateAndTimeSettings::new(
            Utc.with_ymd_and_hms(2025, 11, 1, 23, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 11, 2, 2, 0, 0).unwrap(),
            "America/Toronto",
        )),
        location: Some(LocationPayload::venue("123 Fake St")),
        registration: Some(RegistrationPayload {
            initial_type: "TICKETING".to_string(),
        }),
        ..EventPayload::default()
    };

    let created = build_wix(&server, 3).create_event(&payload).await.unwrap();

    mock.assert_async().await;
    assert_eq!(created.id, "evt-9");
}

#[test_log::test(tokio::test)]
async fn should_patch_only_the_given_fields() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PATCH", "/events/v3/events/evt-1")
        .match_body(Matcher::Json(json!({
            "event": { "location": { "type": "VENUE", "address": { "formattedAddress": "Library" } } }
        })))
        .with_status(200)
        .with_body(json!({ "event": listed_event("evt-1", "Movie Night") }).to_string())
        .expect(1)
        .create_async()
        .await;

    let patch = EventPayload {
        location: Some(LocationPayload::venue("Library")),
        ..EventPayload::default()
    };

    build_wix(&server, 3).update_event("evt-1", &patch).await.unwrap();

    mock.assert_async().await;
}

#[test_log::test(tokio::test)]
async fn should_create_a_fixed_price_ticket_definition() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/events-ticket-definitions/v3/ticket-definitions")
        .match_body(Matcher::Json(json!({
            "ticketDefinition": {
                "eventId": "evt-1",
                "name": "General Admission",
                "limitPerCheckout": 10,
                "pricingMethod": { "fixedPrice": { "value": "15.00", "currency": "CAD" } },
                "feeType": "FEE_ADDED_AT_CHECKOUT",
                "limited": true,
                "quantity": 50
            }
        })))
        .with_status(200)
        .with_body(json!({ "ticketDefinition": { "id": "td-1" } }).to_string())
        .expect(1)
        .create_async()
        .await;

    let ticket = TicketRequest {
        event_id: "evt-1".to_string(),
        name: "General Admission".to_string(),
        price: Price::from_cents(1500),
        currency: "CAD".to_string(),
        quantity: 50,
        limit_per_checkout: 10,
    };

    let id = build_wix(&server, 3).create_ticket_definition(&ticket).await.unwrap();

    mock.assert_async().await;
    assert_eq!(id, "td-1");
}

#[test_log::test(tokio::test)]
async fn should_upload_to_the_signed_url_without_credentials() {
    let mut server = Server::new_async().await;
    let upload_url = format!("{}/upload/abc", server.url());

    let generate = server
        .mock("POST", "/site-media/v1/files/generate-upload-url")
        .match_header("authorization", "test-key")
        .match_body(Matcher::Json(json!({ "mimeType": "image/jpeg", "fileName": "poster.jpg" })))
        .with_status(200)
        .with_body(json!({ "uploadUrl": upload_url }).to_string())
        .expect(1)
        .create_async()
        .await;
    let upload = server
        .mock("PUT", "/upload/abc")
        .match_header("authorization", Matcher::Missing)
        .match_header("content-type", "image/jpeg")
        .with_status(200)
        .with_body(
            json!({
                "file": {
                    "id": "media-1",
                    "media": { "image": { "image": { "width": 800, "height": 600 } } }
                }
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let wix = build_wix(&server, 3);
    let url = wix.generate_upload_url("image/jpeg", "poster.jpg").await.unwrap();
    let file = wix.upload_bytes(&url, "image/jpeg", vec![1, 2, 3, 4]).await.unwrap();

    generate.assert_async().await;
    upload.assert_async().await;
    assert_eq!(file.id, "media-1");
    assert_eq!((file.width, file.height), (Some(800), Some(600)));
}

#[test_log::test(tokio::test)]
async fn server_errors_should_be_retried_until_attempts_run_out() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/events/v3/events/query")
        .with_status(500)
        .with_body("boom")
        .expect(3)
        .create_async()
        .await;

    let result = build_wix(&server, 3)
        .query_events(10, &PageCursor::Offset(0))
        .await;

    mock.assert_async().await;
    match result {
        Err(RemoteError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("Expected a status error, got {:?}", other),
    }
}

#[test_log::test(tokio::test)]
async fn client_errors_should_not_be_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/events/v3/events")
        .with_status(400)
        .with_body(json!({ "message": "title is required" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let result = build_wix(&server, 3).create_event(&EventPayload::default()).await;

    mock.assert_async().await;
    assert!(matches!(result, Err(RemoteError::Status { status: 400, .. })));
}

#[test_log::test(tokio::test)]
async fn rate_limited_calls_should_be_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/events/v3/events/query")
        .with_status(429)
        .with_header("retry-after", "0")
        .expect(2)
        .create_async()
        .await;

    let result = build_wix(&server, 2)
        .query_events(10, &PageCursor::Offset(0))
        .await;

    mock.assert_async().await;
    assert!(matches!(result, Err(RemoteError::Status { status: 429, .. })));
}

#[test_log::test(tokio::test)]
async fn unparseable_answers_should_be_invalid_responses() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/events/v3/events/query")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let result = build_wix(&server, 3)
        .query_events(10, &PageCursor::Offset(0))
        .await;

    assert!(matches!(result, Err(RemoteError::InvalidResponse(_))));
}
