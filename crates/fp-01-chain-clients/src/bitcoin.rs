//! bitcoind JSON-RPC adapter.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_types::{BitcoinClient, ClientError};
use tracing::debug;

use crate::config::BitcoinRpcConfig;
use crate::http::{build_client, send_json};

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct BlockHeader {
    time: u64,
}

/// Bitcoin node client.
pub struct BitcoinRpcClient {
    client: Client,
    url: String,
    user: String,
    pass: String,
    request_id: AtomicU64,
}

impl BitcoinRpcClient {
    pub fn new(config: &BitcoinRpcConfig) -> Result<Self, ClientError> {
        Ok(Self {
            client: build_client(std::time::Duration::from_secs(config.timeout_secs.max(1)))?,
            url: config.url(),
            user: config.rpc_user.clone(),
            pass: config.rpc_pass.clone(),
            request_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ClientError> {
        let request = RpcRequest {
            jsonrpc: "1.0",
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if !self.user.is_empty() {
            builder = builder.basic_auth(&self.user, Some(&self.pass));
        }

        let response: RpcResponse<T> = send_json(builder).await?;
        if let Some(error) = response.error {
            return Err(ClientError::Application(format!(
                "{} failed ({}): {}",
                method, error.code, error.message
            )));
        }
        response
            .result
            .ok_or_else(|| ClientError::Decode(format!("{method}: missing result")))
    }

    pub async fn block_count(&self) -> Result<u64, ClientError> {
        self.call("getblockcount", serde_json::json!([])).await
    }

    async fn header_time(&self, height: u64) -> Result<u64, ClientError> {
        let hash: String = self.call("getblockhash", serde_json::json!([height])).await?;
        let header: BlockHeader = self
            .call("getblockheader", serde_json::json!([hash, true]))
            .await?;
        Ok(header.time)
    }
}

#[async_trait]
impl BitcoinClient for BitcoinRpcClient {
    /// Binary search over `[0, tip]` for the last block with time ≤ target.
    async fn block_height_by_timestamp(&self, timestamp: u64) -> Result<u64, ClientError> {
        let tip = self.block_count().await?;

        if self.header_time(0).await? > timestamp {
            return Err(ClientError::NotFound(format!(
                "no BTC block at or before {timestamp}"
            )));
        }

        let (mut lo, mut hi) = (0u64, tip);
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            if self.header_time(mid).await? <= timestamp {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }

        debug!(timestamp, btc_height = lo, "[fp-01] Mapped timestamp to BTC height");
        Ok(lo)
    }

    async fn block_timestamp_by_height(&self, height: u64) -> Result<u64, ClientError> {
        self.header_time(height).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    const GENESIS: u64 = 1_000;
    const SPACING: u64 = 600;
    const TIP: u64 = 20;

    async fn fake_bitcoind() -> String {
        let router = Router::new().route(
            "/",
            post(|Json(req): Json<Value>| async move {
                let id = req["id"].clone();
                let result = match req["method"].as_str().unwrap_or_default() {
                    "getblockcount" => json!(TIP),
                    "getblockhash" => json!(format!("hash{}", req["params"][0])),
                    "getblockheader" => {
                        let hash = req["params"][0].as_str().unwrap_or_default();
                        let height: u64 = hash.trim_start_matches("hash").parse().unwrap();
                        json!({"time": GENESIS + height * SPACING})
                    }
                    _ => {
                        return Json(json!({
                            "id": id,
                            "result": null,
                            "error": {"code": -32601, "message": "Method not found"}
                        }))
                    }
                };
                Json(json!({"id": id, "result": result, "error": null}))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr.to_string()
    }

    fn client(host: String) -> BitcoinRpcClient {
        BitcoinRpcClient::new(&BitcoinRpcConfig {
            rpc_host: host,
            rpc_user: "user".into(),
            rpc_pass: "pass".into(),
            disable_tls: true,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_height_by_timestamp() {
        let btc = client(fake_bitcoind().await);

        assert_eq!(btc.block_height_by_timestamp(GENESIS).await.unwrap(), 0);
        assert_eq!(
            btc.block_height_by_timestamp(GENESIS + 5 * SPACING).await.unwrap(),
            5
        );
        assert_eq!(
            btc.block_height_by_timestamp(GENESIS + 5 * SPACING + 599).await.unwrap(),
            5
        );
        assert_eq!(btc.block_height_by_timestamp(u64::MAX).await.unwrap(), TIP);
        assert!(matches!(
            btc.block_height_by_timestamp(GENESIS - 1).await,
            Err(ClientError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_timestamp_by_height() {
        let btc = client(fake_bitcoind().await);
        assert_eq!(
            btc.block_timestamp_by_height(3).await.unwrap(),
            GENESIS + 3 * SPACING
        );
    }

    #[tokio::test]
    async fn test_rpc_error_is_application_error() {
        let btc = client(fake_bitcoind().await);
        let err = btc
            .call::<Value>("getmempoolinfo", json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Application(_)));
    }
}
