//! Free-market config source adapter.
//!
//! Two sources describe the same free-entry market and update on independent
//! schedules:
//! - the authoritative on-chain snapshot (`getFreeMarketInfo` read), and
//! - the secondary index's embedded config, with string-typed numerics.
//!
//! Precedence is strict: when the chain snapshot is present it is used for
//! every field. There is no field-level merging — mixing a stale index count
//! with a fresh on-chain pool produces nonsense. When only the index record
//! is available its decimal strings are parsed; any parse failure resolves to
//! "unresolved" rather than a partial config.

use alloy::primitives::U256;
use serde::Deserialize;

/// Market type discriminant used by the contract (and the `market_type_hint`
/// config knob) for free-entry markets.
pub const FREE_MARKET_TYPE: u8 = 1;

/// Market type label used by the secondary index.
pub const FREE_MARKET_LABEL: &str = "FREE";

/// Authoritative on-chain snapshot, decoded from the `getFreeMarketInfo`
/// return tuple in contract field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainFreeInfo {
    pub max_participants: U256,
    pub tokens_per_participant: U256,
    pub current_participants: U256,
    pub total_prize_pool: U256,
    pub remaining_prize_pool: U256,
    pub is_active: bool,
}

/// Market record from the secondary index (subgraph mirror).
/// Best-effort: may be stale, absent, or carry unparseable numerics.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedMarket {
    pub market_type: String,
    #[serde(default)]
    pub free_market_config: Option<IndexedFreeConfig>,
}

/// The index's embedded free-market config. Numeric fields arrive as JSON
/// strings (subgraph uint256 convention).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedFreeConfig {
    pub max_free_participants: String,
    pub tokens_per_participant: String,
    pub current_free_participants: String,
    #[serde(default)]
    pub total_prize_pool: Option<String>,
    #[serde(default)]
    pub remaining_prize_pool: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Normalized free-market config, whichever source produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeMarketConfig {
    pub max_participants: U256,
    pub current_participants: U256,
    /// Fixed-point, 18 decimals.
    pub tokens_per_participant: U256,
    pub total_prize_pool: U256,
    pub remaining_prize_pool: U256,
    pub is_active: bool,
}

impl FreeMarketConfig {
    /// Unclaimed slots. Saturating: a stale index can report
    /// `current > max` for a moment; that reads as zero slots, never
    /// a negative count.
    pub fn slots_remaining(&self) -> U256 {
        self.max_participants
            .saturating_sub(self.current_participants)
    }
}

/// Merge the two sources into one config, or `None` when unresolved.
///
/// `None` means "not yet known" — loading, source unavailable, or malformed
/// index data. It is distinct from a resolved all-zero config.
pub fn resolve_config(
    chain: Option<&ChainFreeInfo>,
    indexed: Option<&IndexedMarket>,
) -> Option<FreeMarketConfig> {
    if let Some(info) = chain {
        return Some(FreeMarketConfig {
            max_participants: info.max_participants,
            current_participants: info.current_participants,
            tokens_per_participant: info.tokens_per_participant,
            total_prize_pool: info.total_prize_pool,
            remaining_prize_pool: info.remaining_prize_pool,
            is_active: info.is_active,
        });
    }

    let cfg = indexed?.free_market_config.as_ref()?;

    let total_prize_pool = match cfg.total_prize_pool.as_deref() {
        Some(s) => parse_uint(s)?,
        None => U256::ZERO,
    };
    let remaining_prize_pool = match cfg.remaining_prize_pool.as_deref() {
        Some(s) => parse_uint(s)?,
        None => U256::ZERO,
    };

    Some(FreeMarketConfig {
        max_participants: parse_uint(&cfg.max_free_participants)?,
        current_participants: parse_uint(&cfg.current_free_participants)?,
        tokens_per_participant: parse_uint(&cfg.tokens_per_participant)?,
        total_prize_pool,
        remaining_prize_pool,
        // The index only lists a config for markets it indexed as live;
        // absent flag defaults to active.
        is_active: cfg.is_active.unwrap_or(true),
    })
}

/// Whether the market is free-entry, derived with the same precedence as the
/// config itself: a caller-supplied type hint bypasses the index entirely.
/// `None` when neither source has answered yet.
pub fn market_is_free(hint: Option<u8>, indexed: Option<&IndexedMarket>) -> Option<bool> {
    match hint {
        Some(t) => Some(t == FREE_MARKET_TYPE),
        None => indexed.map(|m| m.market_type == FREE_MARKET_LABEL),
    }
}

fn parse_uint(s: &str) -> Option<U256> {
    U256::from_str_radix(s.trim(), 10).ok()
}
