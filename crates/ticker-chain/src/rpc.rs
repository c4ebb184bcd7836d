// crates/ticker-chain/src/rpc.rs
//
// JSON-RPC chain head client.
//
// Calls `eth_blockNumber` against the configured endpoints. Each call to
// `current_height` makes at most `retry_limit` attempts, rotating through the
// endpoint list, and starts from the endpoint that answered last time.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ticker_core::traits::ChainHeadClient;
use ticker_core::TickerError;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

/// HTTP JSON-RPC client for the source chain's head height.
#[derive(Debug)]
pub struct RpcHeadClient {
    endpoints: Vec<String>,
    retry_limit: u32,
    /// Index of the endpoint that answered most recently.
    preferred: AtomicUsize,
    next_id: AtomicU64,
    client: reqwest::Client,
}

impl RpcHeadClient {
    /// Create a client over `endpoints` with a per-call attempt budget.
    ///
    /// A `retry_limit` of zero still makes one attempt.
    pub fn new(
        endpoints: Vec<String>,
        retry_limit: u32,
        request_timeout: Duration,
    ) -> Result<Self, TickerError> {
        if endpoints.is_empty() {
            return Err(TickerError::Configuration(
                "At least one RPC endpoint is required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TickerError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoints,
            retry_limit: retry_limit.max(1),
            preferred: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
            client,
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// One `eth_blockNumber` call against a single endpoint.
    async fn block_number(&self, endpoint: &str) -> Result<u64, TickerError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: "eth_blockNumber",
            params: Vec::new(),
        };

        let response = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| TickerError::Rpc(format!("request to {} failed: {}", endpoint, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TickerError::Rpc(format!(
                "{} returned {}: {}",
                endpoint, status, body
            )));
        }

        let rpc: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| TickerError::Rpc(format!("invalid response from {}: {}", endpoint, e)))?;

        if let Some(err) = rpc.error {
            return Err(TickerError::Rpc(format!(
                "{} returned JSON-RPC error {}: {}",
                endpoint, err.code, err.message
            )));
        }

        match rpc.result {
            Some(serde_json::Value::String(hex)) => parse_block_number(&hex),
            Some(other) => Err(TickerError::Rpc(format!(
                "unexpected eth_blockNumber result from {}: {}",
                endpoint, other
            ))),
            None => Err(TickerError::Rpc(format!("no result in response from {}", endpoint))),
        }
    }
}

#[async_trait]
impl ChainHeadClient for RpcHeadClient {
    async fn current_height(&self) -> Result<u64, TickerError> {
        let start = self.preferred.load(Ordering::Relaxed);
        let mut last_error = String::new();

        for attempt in 0..self.retry_limit {
            let index = (start + attempt as usize) % self.endpoints.len();
            let endpoint = &self.endpoints[index];

            match self.block_number(endpoint).await {
                Ok(height) => {
                    self.preferred.store(index, Ordering::Relaxed);
                    return Ok(height);
                }
                Err(e) => {
                    tracing::warn!(
                        "eth_blockNumber attempt {}/{} failed: {}",
                        attempt + 1,
                        self.retry_limit,
                        e
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(TickerError::ChainUnavailable {
            attempts: self.retry_limit,
            last_error,
        })
    }
}

/// Parse a `0x`-prefixed hex quantity as returned by `eth_blockNumber`.
pub fn parse_block_number(hex: &str) -> Result<u64, TickerError> {
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .ok_or_else(|| TickerError::Rpc(format!("block number {:?} is not 0x-prefixed", hex)))?;
    if digits.is_empty() {
        return Err(TickerError::Rpc("empty block number".to_string()));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| TickerError::Rpc(format!("invalid block number {:?}: {}", hex, e)))
}
