//! JSON-RPC ledger client
//!
//! ```text
//! starknet_getEvents   { filter: { address, keys, from_block, to_block, chunk_size, continuation_token } }
//! starknet_call        { request: { contract_address, entry_point_selector, calldata }, block_id }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use obscura_privacy::Nullifier;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::client::LedgerClient;
use crate::error::LedgerError;
use crate::events::{CommitmentEvent, EmittedEvent, EventFilter, EventPage, RegistrationEvent};
use crate::felt::{self, Felt, starknet_keccak};

pub const IS_SPENT_ENTRYPOINT: &str = "is_spent";

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Node endpoint (e.g., "http://localhost:5050/rpc")
    pub rpc_url: String,
    /// Address of the shielded pool contract
    pub contract_address: Felt,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl RpcConfig {
    pub fn new(rpc_url: impl Into<String>, contract_address: Felt) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_address,
            request_timeout: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// A raw `starknet_getEvents` page.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEventsPage {
    pub events: Vec<EmittedEvent>,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

pub struct StarknetRpcLedger {
    config: RpcConfig,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl StarknetRpcLedger {
    pub fn new(config: RpcConfig) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            config,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Fetch one page of raw events matching `keys` from the pool contract.
    pub async fn get_events(
        &self,
        filter: &EventFilter,
        keys: Vec<Vec<Felt>>,
        continuation_token: Option<&str>,
    ) -> Result<RawEventsPage, LedgerError> {
        let mut query = json!({
            "address": self.config.contract_address,
            "keys": keys,
            "chunk_size": filter.chunk_size,
        });
        if let Some(from) = filter.from_block {
            query["from_block"] = json!({ "block_number": from });
        }
        if let Some(to) = filter.to_block {
            query["to_block"] = json!({ "block_number": to });
        }
        if let Some(token) = continuation_token {
            query["continuation_token"] = json!(token);
        }

        let page: RawEventsPage = self
            .request("starknet_getEvents", json!({ "filter": query }))
            .await?;
        debug!(
            events = page.events.len(),
            more = page.continuation_token.is_some(),
            "fetched event page"
        );
        Ok(page)
    }

    /// Read-only contract call at the latest block.
    pub async fn call(
        &self,
        entrypoint: &str,
        calldata: Vec<Felt>,
    ) -> Result<Vec<Felt>, LedgerError> {
        self.request(
            "starknet_call",
            json!({
                "request": {
                    "contract_address": self.config.contract_address,
                    "entry_point_selector": starknet_keccak(entrypoint.as_bytes()),
                    "calldata": calldata,
                },
                "block_id": "latest",
            }),
        )
        .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, LedgerError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let response: JsonRpcResponse<T> = self
            .client
            .post(&self.config.rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            warn!(method, code = error.code, "rpc error: {}", error.message);
            return Err(LedgerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        response.result.ok_or(LedgerError::MissingResult)
    }
}

impl LedgerClient for StarknetRpcLedger {
    async fn commitment_events_page(
        &self,
        filter: &EventFilter,
        continuation_token: Option<&str>,
    ) -> Result<EventPage<CommitmentEvent>, LedgerError> {
        let page = self
            .get_events(filter, vec![vec![CommitmentEvent::selector()]], continuation_token)
            .await?;

        Ok(EventPage {
            events: page
                .events
                .iter()
                .map(CommitmentEvent::decode)
                .collect::<Result<_, _>>()?,
            continuation_token: page.continuation_token,
        })
    }

    async fn registration_events_page(
        &self,
        filter: &EventFilter,
        owner: Option<Felt>,
        continuation_token: Option<&str>,
    ) -> Result<EventPage<RegistrationEvent>, LedgerError> {
        let mut keys = vec![vec![RegistrationEvent::selector()]];
        if let Some(owner) = owner {
            keys.push(vec![owner]);
        }
        let page = self.get_events(filter, keys, continuation_token).await?;

        Ok(EventPage {
            events: page
                .events
                .iter()
                .map(RegistrationEvent::decode)
                .collect::<Result<_, _>>()?,
            continuation_token: page.continuation_token,
        })
    }

    async fn is_spent(&self, nullifier: &Nullifier) -> Result<bool, LedgerError> {
        let result = self
            .call(IS_SPENT_ENTRYPOINT, felt::field_to_u256(&nullifier.to_field()).to_vec())
            .await?;
        let flag = result
            .first()
            .ok_or_else(|| LedgerError::Decode("empty is_spent result".into()))?;
        Ok(*flag != Felt::ZERO)
    }
}
