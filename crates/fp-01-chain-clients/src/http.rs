//! Shared reqwest plumbing.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared_types::ClientError;

pub(crate) fn build_client(timeout: Duration) -> Result<Client, ClientError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .build()
        .map_err(|e| ClientError::Transport(e.to_string()))
}

pub(crate) fn transport_error(e: reqwest::Error) -> ClientError {
    if e.is_decode() {
        ClientError::Decode(e.to_string())
    } else {
        ClientError::Transport(e.to_string())
    }
}

/// Sends the request and decodes a JSON body, turning non-2xx statuses into
/// [`ClientError::Http`].
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(ClientError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

pub(crate) fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
