//! Live JSON-RPC bindings for the read and confirmation paths.
//!
//! Reads go through `eth_call` against the market contract; confirmation
//! polls `eth_getTransactionReceipt` until the node reports a status.
//! Submission is paper-only here (see module docs on [`super`]).

use crate::chain::{
    abi, ChainError, ClaimSubmitter, ConfirmationStatus, ConfirmationWatcher, MarketReader,
    TxHandle,
};
use crate::entitlement::ClaimRecord;
use crate::sources::ChainFreeInfo;
use alloy::primitives::{hex, Address, B256, U256};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Read client over raw JSON-RPC.
#[derive(Clone)]
pub struct RpcMarketClient {
    http: reqwest::Client,
    rpc_url: String,
    contract: Address,
}

impl RpcMarketClient {
    pub fn new(rpc_url: String, contract: Address) -> Self {
        Self {
            http: reqwest::Client::new(),
            rpc_url,
            contract,
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response: Value = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = response.get("error") {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown rpc error")
                .to_string();
            return Err(ChainError::Rpc { code, message });
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| ChainError::Malformed("response has neither result nor error".into()))
    }

    async fn eth_call(&self, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        let call = json!({
            "to": format!("{}", self.contract),
            "data": format!("0x{}", hex::encode(&data)),
        });
        let result = self.rpc("eth_call", json!([call, "latest"])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| ChainError::Malformed("eth_call result is not a string".into()))?;
        hex::decode(raw.trim_start_matches("0x"))
            .map_err(|e| ChainError::Malformed(format!("bad hex in eth_call result: {e}")))
    }
}

#[async_trait]
impl MarketReader for RpcMarketClient {
    async fn free_market_info(&self, market_id: U256) -> Result<ChainFreeInfo, ChainError> {
        let data = abi::encode_call(
            abi::SIG_GET_FREE_MARKET_INFO,
            &[abi::word_from_uint(market_id)],
        );
        let raw = self.eth_call(data).await?;
        let words = abi::decode_words(&raw, 6).ok_or_else(|| {
            ChainError::Malformed(format!(
                "getFreeMarketInfo returned {} bytes, expected 192",
                raw.len()
            ))
        })?;

        let info = ChainFreeInfo {
            max_participants: abi::uint_from_word(&words[0]),
            tokens_per_participant: abi::uint_from_word(&words[1]),
            current_participants: abi::uint_from_word(&words[2]),
            total_prize_pool: abi::uint_from_word(&words[3]),
            remaining_prize_pool: abi::uint_from_word(&words[4]),
            is_active: abi::bool_from_word(&words[5]),
        };
        debug!(
            market = %market_id,
            max = %info.max_participants,
            current = %info.current_participants,
            "fetched free market info"
        );
        Ok(info)
    }

    async fn claim_status(
        &self,
        market_id: U256,
        wallet: Address,
    ) -> Result<ClaimRecord, ChainError> {
        let data = abi::encode_call(
            abi::SIG_HAS_USER_CLAIMED,
            &[
                abi::word_from_uint(market_id),
                abi::word_from_address(wallet),
            ],
        );
        let raw = self.eth_call(data).await?;
        let words = abi::decode_words(&raw, 2).ok_or_else(|| {
            ChainError::Malformed(format!(
                "hasUserClaimedFreeTokens returned {} bytes, expected 64",
                raw.len()
            ))
        })?;

        Ok(ClaimRecord {
            has_claimed: abi::bool_from_word(&words[0]),
            tokens_received: abi::uint_from_word(&words[1]),
        })
    }
}

/// Confirmation watcher polling `eth_getTransactionReceipt`.
#[derive(Clone)]
pub struct ReceiptWatcher {
    client: RpcMarketClient,
    poll_interval: Duration,
}

impl ReceiptWatcher {
    pub fn new(client: RpcMarketClient) -> Self {
        Self {
            client,
            poll_interval: Duration::from_secs(3),
        }
    }
}

#[async_trait]
impl ConfirmationWatcher for ReceiptWatcher {
    async fn await_confirmation(&self, tx: TxHandle) -> Result<ConfirmationStatus, ChainError> {
        loop {
            let result = self
                .client
                .rpc("eth_getTransactionReceipt", json!([format!("{}", tx.0)]))
                .await?;

            if result.is_null() {
                // Not mined yet.
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            let status = result
                .get("status")
                .and_then(Value::as_str)
                .ok_or_else(|| ChainError::Malformed("receipt missing status".into()))?;

            return match status {
                "0x1" => Ok(ConfirmationStatus::Success),
                "0x0" => Ok(ConfirmationStatus::Failure),
                other => Err(ChainError::Malformed(format!(
                    "unexpected receipt status {other}"
                ))),
            };
        }
    }
}

/// Paper-mode submitter: logs the claim it would send and returns a
/// synthetic handle. Pairs with [`PaperWatcher`].
pub struct PaperSubmitter {
    contract: Address,
}

impl PaperSubmitter {
    pub fn new(contract: Address) -> Self {
        Self { contract }
    }
}

#[async_trait]
impl ClaimSubmitter for PaperSubmitter {
    async fn submit_claim(&self, market_id: U256) -> Result<TxHandle, ChainError> {
        info!(
            contract = %self.contract,
            market = %market_id,
            "PAPER: would submit claimFreeTokens"
        );
        Ok(TxHandle(B256::ZERO))
    }
}

/// Paper-mode watcher: reports immediate success for synthetic handles.
pub struct PaperWatcher;

#[async_trait]
impl ConfirmationWatcher for PaperWatcher {
    async fn await_confirmation(&self, tx: TxHandle) -> Result<ConfirmationStatus, ChainError> {
        if tx.0 != B256::ZERO {
            warn!(tx = %tx, "paper watcher asked to confirm a real-looking handle");
        }
        Ok(ConfirmationStatus::Success)
    }
}
