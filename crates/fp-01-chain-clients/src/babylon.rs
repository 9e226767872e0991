//! # Settlement Chain REST Client
//!
//! Implements [`BabylonQueryClient`] and [`WasmQueryClient`] over the chain's
//! gRPC-gateway (LCD) endpoints.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_with::{base64::Base64, serde_as, DisplayFromStr, PickFirst};
use shared_types::{
    BabylonQueryClient, BtcDelegation, BtcPublicKey, ClientError, DelegationPage, IndexedBlock,
    PageRequest, PubRandCommit, StakingParams, WasmQueryClient,
};
use tracing::debug;

use crate::config::BabylonClientConfig;
use crate::http::{build_client, send_json, trim_base};

/// gRPC status code for NotFound, as echoed in gateway error bodies.
const GRPC_NOT_FOUND: u64 = 5;

#[derive(Deserialize)]
struct ParamsResponse {
    params: StakingParams,
}

#[serde_as]
#[derive(Deserialize, Default)]
struct PageResponse {
    #[serde_as(as = "Option<Base64>")]
    #[serde(default)]
    next_key: Option<Vec<u8>>,
}

#[derive(Deserialize)]
struct DelegatorDelegations {
    #[serde(default)]
    dels: Vec<BtcDelegation>,
}

#[derive(Deserialize)]
struct DelegationsResponse {
    #[serde(default)]
    btc_delegator_delegations: Vec<DelegatorDelegations>,
    #[serde(default)]
    pagination: Option<PageResponse>,
}

#[derive(Deserialize)]
struct ConsumerFp {
    btc_pk: BtcPublicKey,
}

#[derive(Deserialize)]
struct ConsumerFpsResponse {
    #[serde(default)]
    finality_providers: Vec<ConsumerFp>,
    #[serde(default)]
    pagination: Option<PageResponse>,
}

#[serde_as]
#[derive(Deserialize)]
struct PowerResponse {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    voting_power: u64,
}

#[derive(Deserialize)]
struct BlockResponse {
    block: IndexedBlock,
}

#[derive(Deserialize)]
struct BlocksResponse {
    #[serde(default)]
    blocks: Vec<IndexedBlock>,
}

#[serde_as]
#[derive(Deserialize)]
struct HeightResponse {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    height: u64,
}

#[serde_as]
#[derive(Deserialize)]
struct PubRandCommitEntry {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    num_pub_rand: u64,
    #[serde_as(as = "Base64")]
    commitment: Vec<u8>,
}

#[derive(Deserialize)]
struct PubRandCommitResponse {
    #[serde(default)]
    pub_rand_commit_map: HashMap<String, PubRandCommitEntry>,
}

#[derive(Deserialize)]
struct LatestBlockHeader {
    header: HeightResponse,
}

#[derive(Deserialize)]
struct LatestBlockResponse {
    block: LatestBlockHeader,
}

#[derive(Deserialize)]
struct SmartQueryResponse {
    #[serde(default)]
    data: serde_json::Value,
}

/// Whether a gateway error means "no such object".
fn is_not_found(err: &ClientError) -> bool {
    match err {
        ClientError::NotFound(_) => true,
        ClientError::Http { status, body } => {
            *status == 404
                || serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| v.get("code").and_then(|c| c.as_u64()))
                    == Some(GRPC_NOT_FOUND)
        }
        _ => false,
    }
}

/// REST client for the settlement chain.
pub struct BabylonLcdClient {
    client: Client,
    base_url: String,
}

impl BabylonLcdClient {
    pub fn new(config: &BabylonClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            client: build_client(config.timeout())?,
            base_url: trim_base(&config.lcd_address),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("[fp-01] GET {}", url);
        send_json(self.client.get(&url).query(query)).await
    }

    fn page_query(page: &PageRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![("pagination.limit", page.limit.to_string())];
        if let Some(key) = page.key.as_ref().filter(|k| !k.is_empty()) {
            query.push(("pagination.key", STANDARD.encode(key)));
        }
        query
    }
}

#[async_trait]
impl BabylonQueryClient for BabylonLcdClient {
    async fn btc_staking_params(&self) -> Result<StakingParams, ClientError> {
        let resp: ParamsResponse = self.get("/babylon/btcstaking/v1/params", &[]).await?;
        Ok(resp.params)
    }

    async fn finality_provider_delegations(
        &self,
        fp_pk: &BtcPublicKey,
        page: PageRequest,
    ) -> Result<DelegationPage, ClientError> {
        let path = format!("/babylon/btcstaking/v1/finality_providers/{}/delegations", fp_pk);
        let resp: DelegationsResponse = self.get(&path, &Self::page_query(&page)).await?;

        Ok(DelegationPage {
            delegations: resp
                .btc_delegator_delegations
                .into_iter()
                .flat_map(|d| d.dels)
                .collect(),
            next_key: resp.pagination.and_then(|p| p.next_key),
        })
    }

    async fn consumer_finality_providers(
        &self,
        consumer_id: &str,
    ) -> Result<Vec<BtcPublicKey>, ClientError> {
        let path = format!("/babylon/btcstkconsumer/v1/finality_providers/{}", consumer_id);
        let mut fps = Vec::new();
        let mut page = PageRequest::new(None, 100);

        loop {
            let resp: ConsumerFpsResponse = self.get(&path, &Self::page_query(&page)).await?;
            fps.extend(resp.finality_providers.into_iter().map(|fp| fp.btc_pk));

            match resp.pagination.and_then(|p| p.next_key) {
                Some(key) if !key.is_empty() => page.key = Some(key),
                _ => return Ok(fps),
            }
        }
    }

    async fn finality_provider_power(
        &self,
        fp_pk: &BtcPublicKey,
        btc_height: u64,
    ) -> Result<u64, ClientError> {
        let path = format!(
            "/babylon/finality/v1/finality_providers/{}/power/{}",
            fp_pk, btc_height
        );
        match self.get::<PowerResponse>(&path, &[]).await {
            Ok(resp) => Ok(resp.voting_power),
            // No power table entry means no power at that height.
            Err(e) if is_not_found(&e) => Ok(0),
            Err(e) => Err(e),
        }
    }

    async fn indexed_block(&self, height: u64) -> Result<IndexedBlock, ClientError> {
        let path = format!("/babylon/finality/v1/blocks/{}", height);
        match self.get::<BlockResponse>(&path, &[]).await {
            Ok(resp) => Ok(resp.block),
            Err(e) if is_not_found(&e) => Err(ClientError::NotFound(format!("block {height}"))),
            Err(e) => Err(e),
        }
    }

    async fn latest_finalized_block(&self) -> Result<Option<IndexedBlock>, ClientError> {
        let query = [
            ("status", "BLOCK_STATUS_FINALIZED".to_string()),
            ("pagination.limit", "1".to_string()),
            ("pagination.reverse", "true".to_string()),
        ];
        let resp: BlocksResponse = self.get("/babylon/finality/v1/blocks", &query).await?;
        Ok(resp.blocks.into_iter().next())
    }

    async fn activated_height(&self) -> Result<u64, ClientError> {
        let resp: HeightResponse = self.get("/babylon/finality/v1/activated_height", &[]).await?;
        Ok(resp.height)
    }

    async fn last_pub_rand_commit(
        &self,
        fp_pk: &BtcPublicKey,
    ) -> Result<Option<PubRandCommit>, ClientError> {
        let path = format!("/babylon/finality/v1/finality_providers/{}/pub_rand_commit", fp_pk);
        let query = [
            ("pagination.limit", "1".to_string()),
            ("pagination.reverse", "true".to_string()),
        ];
        let resp: PubRandCommitResponse = match self.get(&path, &query).await {
            Ok(resp) => resp,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut latest: Option<PubRandCommit> = None;
        for (start, entry) in resp.pub_rand_commit_map {
            let start_height: u64 = start
                .parse()
                .map_err(|_| ClientError::Decode(format!("invalid start height key {start}")))?;
            if latest.as_ref().map_or(true, |c| start_height > c.start_height) {
                latest = Some(PubRandCommit {
                    start_height,
                    num_pub_rand: entry.num_pub_rand,
                    commitment: entry.commitment,
                });
            }
        }
        Ok(latest)
    }

    async fn latest_height(&self) -> Result<u64, ClientError> {
        let resp: LatestBlockResponse = self
            .get("/cosmos/base/tendermint/v1beta1/blocks/latest", &[])
            .await?;
        Ok(resp.block.header.height)
    }
}

#[async_trait]
impl WasmQueryClient for BabylonLcdClient {
    async fn query_smart_contract_state(
        &self,
        contract: &str,
        query: &serde_json::Value,
    ) -> Result<Option<Vec<u8>>, ClientError> {
        let encoded = URL_SAFE.encode(serde_json::to_vec(query)?);
        let path = format!("/cosmwasm/wasm/v1/contract/{}/smart/{}", contract, encoded);
        let resp: SmartQueryResponse = self.get(&path, &[]).await?;

        if resp.data.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::to_vec(&resp.data)?))
    }
}
