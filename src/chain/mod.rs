//! External blockchain interfaces.
//!
//! The core never talks to a chain directly; it consumes these traits.
//! `rpc` provides live read/watch bindings over raw JSON-RPC. Submission
//! requires a signer, which is out of scope here (no key custody) — the
//! shipped [`rpc::PaperSubmitter`] logs the would-be transaction instead,
//! and a custodial wallet service can implement [`ClaimSubmitter`] for
//! live execution.

pub mod abi;
pub mod rpc;

use crate::entitlement::ClaimRecord;
use crate::sources::ChainFreeInfo;
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed rpc response: {0}")]
    Malformed(String),
    #[error("submission rejected: {0}")]
    Rejected(String),
}

/// Handle for a submitted-but-unconfirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxHandle(pub B256);

impl std::fmt::Display for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Final outcome of a confirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Success,
    Failure,
}

/// Authoritative contract reads.
#[async_trait]
pub trait MarketReader: Send + Sync {
    /// `getFreeMarketInfo(marketId)`
    async fn free_market_info(&self, market_id: U256) -> Result<ChainFreeInfo, ChainError>;

    /// `hasUserClaimedFreeTokens(marketId, wallet)`
    async fn claim_status(
        &self,
        market_id: U256,
        wallet: Address,
    ) -> Result<ClaimRecord, ChainError>;
}

/// Claim write path. Fails synchronously on wallet/user rejection.
#[async_trait]
pub trait ClaimSubmitter: Send + Sync {
    /// `claimFreeTokens(marketId)` — returns the pending transaction handle.
    async fn submit_claim(&self, market_id: U256) -> Result<TxHandle, ChainError>;
}

/// Waits for a submitted transaction to reach finality. No internal
/// timeout: termination is the watcher's (or the caller's, via drop).
#[async_trait]
pub trait ConfirmationWatcher: Send + Sync {
    async fn await_confirmation(&self, tx: TxHandle) -> Result<ConfirmationStatus, ChainError>;
}
