//! # CosmWasm Gadget Contract
//!
//! [`GadgetContract`] over any [`WasmQueryClient`]. Query shapes:
//!
//! | Query | Request | Response |
//! |-------|---------|----------|
//! | enabled flag | `{"is_enabled":{}}` | `bool` |
//! | consumer id | `{"config":{}}` | `{"consumer_id": "...", ...}` |
//! | voters | `{"block_voters":{"height":h,"hash_hex":"..."}}` | `["<pk hex>", ...]` or `null` |

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::WasmQueryClient;

use crate::error::{GadgetError, GadgetResult};
use crate::ports::GadgetContract;

#[derive(Deserialize)]
struct ContractConfig {
    consumer_id: String,
}

pub struct CwGadgetContract<W: WasmQueryClient + ?Sized> {
    client: Arc<W>,
    address: String,
}

impl<W: WasmQueryClient + ?Sized> CwGadgetContract<W> {
    pub fn new(client: Arc<W>, address: impl Into<String>) -> Self {
        Self {
            client,
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn query<T: DeserializeOwned>(&self, name: &'static str, query: Value) -> GadgetResult<Option<T>> {
        let Some(raw) = self
            .client
            .query_smart_contract_state(&self.address, &query)
            .await?
        else {
            return Ok(None);
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| GadgetError::Contract {
                query: name,
                reason: e.to_string(),
            })
    }

    async fn query_required<T: DeserializeOwned>(&self, name: &'static str, query: Value) -> GadgetResult<T> {
        self.query(name, query).await?.ok_or(GadgetError::Contract {
            query: name,
            reason: "empty response".into(),
        })
    }
}

#[async_trait]
impl<W: WasmQueryClient + ?Sized> GadgetContract for CwGadgetContract<W> {
    async fn is_enabled(&self) -> GadgetResult<bool> {
        self.query_required("is_enabled", json!({"is_enabled": {}})).await
    }

    async fn consumer_id(&self) -> GadgetResult<String> {
        let config: ContractConfig = self.query_required("config", json!({"config": {}})).await?;
        Ok(config.consumer_id)
    }

    async fn block_voters(&self, height: u64, hash_hex: &str) -> GadgetResult<Option<Vec<String>>> {
        let voters: Option<Option<Vec<String>>> = self
            .query(
                "block_voters",
                json!({"block_voters": {"height": height, "hash_hex": hash_hex}}),
            )
            .await?;
        Ok(voters.flatten().filter(|v| !v.is_empty()))
    }
}
