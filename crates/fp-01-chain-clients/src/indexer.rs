//! # Consumer Block Indexer Client
//!
//! Talks to the REST indexer that serves consumer-chain blocks by namespace:
//!
//! - `GET /v1/api/get-block?namespace=<ns>&height=<h>`
//! - `GET /v1/api/latest-block?namespace=<ns>`
//! - `GET /v1/api/finalized-block?namespace=<ns>`
//!
//! Every response is `{data: {height, hash, timestamp}, error: string}`. A
//! non-empty `error` is a failure even when the status is 200.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use shared_types::{Block, ClientError};
use tracing::debug;

use crate::http::{build_client, transport_error, trim_base};

#[serde_as]
#[derive(Debug, Deserialize)]
struct IndexedBlockData {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    height: u64,
    hash: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    timestamp: u64,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<IndexedBlockData>,
    #[serde(default)]
    error: Option<String>,
}

/// REST indexer client bound to one namespace.
pub struct IndexerClient {
    client: Client,
    base_url: String,
    namespace: String,
}

impl IndexerClient {
    pub fn new(
        service_rpc: &str,
        namespace: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: trim_base(service_rpc),
            namespace: namespace.into(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn fetch(&self, endpoint: &str, height: Option<u64>) -> Result<Option<Block>, ClientError> {
        let url = format!("{}/v1/api/{}", self.base_url, endpoint);
        let mut query = vec![("namespace", self.namespace.clone())];
        if let Some(h) = height {
            query.push(("height", h.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        // The envelope's error field wins over the status code.
        let envelope: Envelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ClientError::Http {
                    status: status.as_u16(),
                    body,
                })
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(error) = envelope.error.filter(|e| !e.is_empty()) {
            return Err(ClientError::Application(error));
        }
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(envelope
            .data
            .map(|d| Block::new(d.height, d.hash, d.timestamp)))
    }

    /// Block at `height`.
    pub async fn get_block(&self, height: u64) -> Result<Block, ClientError> {
        let block = self
            .fetch("get-block", Some(height))
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("block {height} in {}", self.namespace)))?;
        debug!(height, block_hash = %block.hash, "[fp-01] Indexer block");
        Ok(block)
    }

    /// Chain head.
    pub async fn latest_block(&self) -> Result<Block, ClientError> {
        self.fetch("latest-block", None)
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("latest block in {}", self.namespace)))
    }

    /// Highest finalized block, `None` before the first finalization.
    pub async fn finalized_block(&self) -> Result<Option<Block>, ClientError> {
        self.fetch("finalized-block", None).await
    }
}
