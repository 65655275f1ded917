use crate::error::RemoteError;
use crate::http::retry::{RetryMiddleware, RetryPolicy};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One client for the whole run, every request going through the retry policy.
pub fn build_client(policy: RetryPolicy) -> Result<ClientWithMiddleware, reqwest::Error> {
    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

    Ok(ClientBuilder::new(client)
        .with(RetryMiddleware::new(policy))
        .build())
}

pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, RemoteError> {
    let response = send(request).await?;
    let body = response.text().await?;

    serde_json::from_str::<T>(&body).map_err(|err| {
        error!("Response parse failed: {:?}", err);
        RemoteError::InvalidResponse(err.to_string())
    })
}

/// Sends the request and turns any non-2xx answer into [`RemoteError::Status`].
pub async fn send(request: RequestBuilder) -> Result<reqwest::Response, RemoteError> {
    let response = request.send().await?;
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!(status = status.as_u16(), "Request failed: {}", body);

    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}
