//! Broadcasts through an external signer service. The service holds the key,
//! builds the transaction and answers with the chain's check/deliver result.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shared_types::{ClientError, SettlementMsg};

use crate::http::{build_client, send_json, trim_base};
use crate::sender::{BroadcastOutcome, TxBroadcaster};

#[derive(Serialize)]
struct BroadcastRequest<'a> {
    chain_id: &'a str,
    key: &'a str,
    messages: &'a [SettlementMsg],
}

/// `POST <signer>/v1/tx/broadcast`.
pub struct HttpBroadcaster {
    client: Client,
    url: String,
    chain_id: String,
    key: String,
}

impl HttpBroadcaster {
    pub fn new(
        signer_address: &str,
        chain_id: impl Into<String>,
        key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: format!("{}/v1/tx/broadcast", trim_base(signer_address)),
            chain_id: chain_id.into(),
            key: key.into(),
        })
    }
}

#[async_trait]
impl TxBroadcaster for HttpBroadcaster {
    async fn broadcast(&self, msgs: &[SettlementMsg]) -> Result<BroadcastOutcome, ClientError> {
        let body = BroadcastRequest {
            chain_id: &self.chain_id,
            key: &self.key,
            messages: msgs,
        };
        send_json(self.client.post(&self.url).json(&body)).await
    }
}
