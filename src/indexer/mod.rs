//! Secondary index (subgraph) client.
//!
//! Best-effort mirror of on-chain market data. Anything that goes wrong
//! here — transport, query errors, unknown market — is reported as an error
//! or absence for the caller to degrade into "unresolved"; nothing from this
//! module reaches the resolver as a fault.

use crate::sources::IndexedMarket;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("query error: {0}")]
    Query(String),
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

const MARKET_QUERY: &str = "query Market($id: ID!) { \
    market(id: $id) { \
        marketType \
        freeMarketConfig { \
            maxFreeParticipants \
            tokensPerParticipant \
            currentFreeParticipants \
            totalPrizePool \
            remainingPrizePool \
            isActive \
        } \
    } \
}";

#[derive(Clone)]
pub struct IndexerClient {
    http: reqwest::Client,
    url: String,
}

impl IndexerClient {
    pub fn new(url: String, timeout: Duration) -> Self {
        // The index is best-effort; a request must never outlive the poll
        // cycle, so the timeout is not negotiable.
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build indexer http client");
        Self { http, url }
    }

    /// Fetch the index's view of one market. `Ok(None)` means the index has
    /// not seen this market (yet).
    pub async fn market(&self, market_id: u64) -> Result<Option<IndexedMarket>, IndexerError> {
        let body = json!({
            "query": MARKET_QUERY,
            "variables": { "id": market_id.to_string() },
        });

        let response: Value = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(errors) = response.get("errors").and_then(Value::as_array) {
            let first = errors
                .first()
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown query error");
            return Err(IndexerError::Query(first.to_string()));
        }

        let market = response
            .pointer("/data/market")
            .cloned()
            .unwrap_or(Value::Null);
        if market.is_null() {
            debug!(market = market_id, "market not present in index");
            return Ok(None);
        }

        Ok(Some(serde_json::from_value(market)?))
    }
}
