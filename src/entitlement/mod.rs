//! Entitlement resolver for free-entry markets.
//!
//! Takes one batched snapshot of everything the upstream pollers know and
//! reduces it to a single [`Eligibility`]. The reduction is a total, pure
//! function: every input combination maps to exactly one variant, with a
//! fixed precedence ladder so inconsistent sources still resolve sanely
//! (an on-chain claim record wins over everything below it, stale or not).

use crate::sources::{self, ChainFreeInfo, FreeMarketConfig, IndexedMarket};
use alloy::primitives::U256;

/// The wallet's claim record for one market, from the authoritative
/// on-chain read. Absent when no wallet is connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimRecord {
    pub has_claimed: bool,
    pub tokens_received: U256,
}

/// Mutually exclusive entitlement states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Not a free-entry market; nothing to claim.
    NotApplicable,
    /// Free-entry, but the config has not resolved yet (loading).
    Unresolved,
    /// The wallet already claimed its allocation.
    Claimed { tokens_received: U256 },
    /// No wallet connected; informational only.
    Disconnected,
    /// Claimable now.
    Available {
        tokens_per_participant: U256,
        slots_remaining: U256,
        max_participants: U256,
    },
    /// No claim record and no slots left.
    Exhausted,
}

/// All resolver inputs from one reactive cycle, batched before resolving so
/// an old config is never paired with a new claim record (or vice versa).
#[derive(Debug, Clone, Default)]
pub struct EligibilitySnapshot {
    /// Authoritative on-chain free-market snapshot, if fetched.
    pub chain_free_info: Option<ChainFreeInfo>,
    /// Secondary-index record, if fetched.
    pub indexed: Option<IndexedMarket>,
    /// Claim record for the connected wallet, if fetched.
    pub claim: Option<ClaimRecord>,
    /// Whether a wallet is connected.
    pub wallet_connected: bool,
    /// Caller-supplied market type (1 = free entry), bypassing the index.
    pub market_type_hint: Option<u8>,
}

/// Resolve one snapshot to one eligibility state. First match wins:
///
/// 1. not free-entry          → `NotApplicable`
/// 2. config unresolved       → `Unresolved`
/// 3. has claimed             → `Claimed`
/// 4. no wallet               → `Disconnected`
/// 5. slots remaining > 0     → `Available`
/// 6. otherwise               → `Exhausted`
pub fn resolve(snapshot: &EligibilitySnapshot) -> Eligibility {
    let is_free = sources::market_is_free(snapshot.market_type_hint, snapshot.indexed.as_ref());

    match is_free {
        Some(false) => return Eligibility::NotApplicable,
        // Neither source has answered; treat as loading, same as an
        // unresolved config.
        None => return Eligibility::Unresolved,
        Some(true) => {}
    }

    let config: FreeMarketConfig =
        match sources::resolve_config(snapshot.chain_free_info.as_ref(), snapshot.indexed.as_ref())
        {
            Some(c) => c,
            None => return Eligibility::Unresolved,
        };

    if let Some(claim) = snapshot.claim {
        if claim.has_claimed {
            return Eligibility::Claimed {
                tokens_received: claim.tokens_received,
            };
        }
    }

    if !snapshot.wallet_connected {
        return Eligibility::Disconnected;
    }

    let slots_remaining = config.slots_remaining();
    if slots_remaining > U256::ZERO {
        Eligibility::Available {
            tokens_per_participant: config.tokens_per_participant,
            slots_remaining,
            max_participants: config.max_participants,
        }
    } else {
        Eligibility::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAD: u128 = 1_000_000_000_000_000_000;

    fn free_snapshot(max: u64, current: u64) -> EligibilitySnapshot {
        EligibilitySnapshot {
            chain_free_info: Some(ChainFreeInfo {
                max_participants: U256::from(max),
                tokens_per_participant: U256::from(5 * WAD),
                current_participants: U256::from(current),
                total_prize_pool: U256::from(500 * WAD),
                remaining_prize_pool: U256::from(300 * WAD),
                is_active: true,
            }),
            indexed: None,
            claim: None,
            wallet_connected: true,
            market_type_hint: Some(1),
        }
    }

    #[test]
    fn full_market_is_exhausted() {
        // Scenario: max 100, current 100, connected, no claim record.
        let snapshot = free_snapshot(100, 100);
        assert_eq!(resolve(&snapshot), Eligibility::Exhausted);
    }

    #[test]
    fn open_market_is_available() {
        // Scenario: max 100, current 40, 5-token allocation.
        let snapshot = free_snapshot(100, 40);
        assert_eq!(
            resolve(&snapshot),
            Eligibility::Available {
                tokens_per_participant: U256::from(5 * WAD),
                slots_remaining: U256::from(60u64),
                max_participants: U256::from(100u64),
            }
        );
    }

    #[test]
    fn claimed_wins_over_everything_below() {
        // A claim record beats slot exhaustion and even disconnection.
        let mut snapshot = free_snapshot(100, 100);
        snapshot.claim = Some(ClaimRecord {
            has_claimed: true,
            tokens_received: U256::from(5 * WAD),
        });
        snapshot.wallet_connected = false;
        assert_eq!(
            resolve(&snapshot),
            Eligibility::Claimed {
                tokens_received: U256::from(5 * WAD),
            }
        );
    }

    #[test]
    fn unclaimed_record_does_not_shadow_availability() {
        let mut snapshot = free_snapshot(100, 40);
        snapshot.claim = Some(ClaimRecord {
            has_claimed: false,
            tokens_received: U256::ZERO,
        });
        assert!(matches!(resolve(&snapshot), Eligibility::Available { .. }));
    }

    #[test]
    fn disconnected_wallet_is_informational() {
        let mut snapshot = free_snapshot(100, 40);
        snapshot.wallet_connected = false;
        assert_eq!(resolve(&snapshot), Eligibility::Disconnected);
    }

    #[test]
    fn non_free_market_is_not_applicable() {
        let mut snapshot = free_snapshot(100, 40);
        snapshot.market_type_hint = Some(0);
        assert_eq!(resolve(&snapshot), Eligibility::NotApplicable);
    }

    #[test]
    fn missing_config_is_unresolved() {
        // Free by hint, but the chain read hasn't landed and there is no
        // index record: loading, never a crash or a zero-config state.
        let mut snapshot = free_snapshot(100, 40);
        snapshot.chain_free_info = None;
        assert_eq!(resolve(&snapshot), Eligibility::Unresolved);
    }

    #[test]
    fn unknown_market_type_is_unresolved() {
        // No hint and the index hasn't answered either.
        let snapshot = EligibilitySnapshot {
            wallet_connected: true,
            ..Default::default()
        };
        assert_eq!(resolve(&snapshot), Eligibility::Unresolved);
    }
}
