//! Render projection: maps entitlement + claim phase to a presentation-ready
//! view model. Pure mapping table, no state of its own.
//!
//! `NotApplicable` projects to a `Hidden` variant rather than an absent
//! value, so the caller decides whether to render anything for non-free
//! markets.

use crate::claim::ClaimPhase;
use crate::entitlement::Eligibility;
use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeVariant {
    /// Not a free-entry market; render nothing.
    Hidden,
    /// Config still resolving; render a placeholder.
    Loading,
    Claimed,
    Connect,
    Available,
    Exhausted,
}

/// What the claim-status surface should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimStatusView {
    pub variant: BadgeVariant,
    pub label: String,
    /// Whether the claim action is clickable. Callers MUST honor this while
    /// `busy` — the controller relies on it to avoid overlapping submits.
    pub claim_enabled: bool,
    /// A submission or confirmation is in flight.
    pub busy: bool,
    /// "remaining/max" detail line, shown for unclaimed connected wallets.
    pub slots_line: Option<String>,
}

pub fn project(eligibility: &Eligibility, phase: &ClaimPhase) -> ClaimStatusView {
    let busy = matches!(phase, ClaimPhase::Submitting | ClaimPhase::Confirming);

    match eligibility {
        Eligibility::NotApplicable => ClaimStatusView {
            variant: BadgeVariant::Hidden,
            label: String::new(),
            claim_enabled: false,
            busy,
            slots_line: None,
        },
        Eligibility::Unresolved => ClaimStatusView {
            variant: BadgeVariant::Loading,
            label: String::new(),
            claim_enabled: false,
            busy,
            slots_line: None,
        },
        Eligibility::Claimed { tokens_received } => ClaimStatusView {
            variant: BadgeVariant::Claimed,
            label: format!("Claimed {} tokens", format_tokens(*tokens_received)),
            claim_enabled: false,
            busy,
            slots_line: None,
        },
        Eligibility::Disconnected => ClaimStatusView {
            variant: BadgeVariant::Connect,
            label: "Connect to claim free shares".to_string(),
            claim_enabled: false,
            busy,
            slots_line: None,
        },
        Eligibility::Available {
            tokens_per_participant,
            slots_remaining,
            max_participants,
        } => ClaimStatusView {
            variant: BadgeVariant::Available,
            label: format!("{} tokens available", format_tokens(*tokens_per_participant)),
            claim_enabled: !busy,
            busy,
            slots_line: Some(format!("{slots_remaining}/{max_participants}")),
        },
        Eligibility::Exhausted => ClaimStatusView {
            variant: BadgeVariant::Exhausted,
            label: "All slots claimed".to_string(),
            claim_enabled: false,
            busy,
            slots_line: None,
        },
    }
}

/// Format an 18-decimal fixed-point amount for display: four decimal places
/// under 0.01, three under 1, otherwise two.
pub fn format_tokens(value: U256) -> String {
    const DECIMALS: u32 = 18;

    let Ok(raw) = i128::try_from(value) else {
        return format_whole_tokens(value);
    };
    let Ok(amount) = Decimal::try_from_i128_with_scale(raw, DECIMALS) else {
        return format_whole_tokens(value);
    };

    let places = if amount < Decimal::new(1, 2) {
        4
    } else if amount < Decimal::ONE {
        3
    } else {
        2
    };
    amount.round_dp(places).to_string()
}

/// Fallback for amounts too large for decimal display math: whole tokens.
fn format_whole_tokens(value: U256) -> String {
    let wad = U256::from(10u64).pow(U256::from(18u64));
    format!("{}.00", value / wad)
}
