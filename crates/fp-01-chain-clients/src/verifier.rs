//! Client for the block verification endpoint consulted before a block is
//! committed to the local store.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use shared_types::ClientError;

use crate::http::{build_client, transport_error, trim_base};

#[derive(Deserialize)]
struct VerifyBlockResponse {
    #[serde(default)]
    result: bool,
}

/// `GET <agent>/v1/api/verify-block?height=&hash=&timestamp=`.
pub struct VerifierClient {
    client: Client,
    base_url: String,
}

impl VerifierClient {
    pub fn new(agent_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: trim_base(agent_url),
        })
    }

    /// `Ok(false)` when the agent rejects the block or answers non-200.
    pub async fn verify_block(
        &self,
        height: u64,
        hash: &str,
        timestamp: u64,
    ) -> Result<bool, ClientError> {
        let response = self
            .client
            .get(format!("{}/v1/api/verify-block", self.base_url))
            .query(&[
                ("height", height.to_string()),
                ("hash", hash.to_string()),
                ("timestamp", timestamp.to_string()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() != StatusCode::OK {
            return Ok(false);
        }
        let body: VerifyBlockResponse = response.json().await.map_err(transport_error)?;
        Ok(body.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_verify_block() {
        let router = Router::new().route(
            "/v1/api/verify-block",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                match q["height"].as_str() {
                    "1" => (AxumStatus::OK, Json(json!({"result": true}))),
                    "2" => (AxumStatus::OK, Json(json!({"result": false}))),
                    _ => (AxumStatus::BAD_REQUEST, Json(json!({"error": "bad"}))),
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let verifier = VerifierClient::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        assert!(verifier.verify_block(1, "0x01", 10).await.unwrap());
        assert!(!verifier.verify_block(2, "0x02", 20).await.unwrap());
        assert!(!verifier.verify_block(3, "0x03", 30).await.unwrap());
    }
}
