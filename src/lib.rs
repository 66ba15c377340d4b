//! Entitlement reconciliation and claim lifecycle for free-entry
//! prediction markets.
//!
//! Two independently-updating sources (authoritative on-chain reads and a
//! best-effort secondary index) are merged into one entitlement state, and a
//! claim transaction is sequenced to finality with an exactly-once success
//! notification. See `sources` → `entitlement` → `view` for the read
//! pipeline and `claim` for the transaction controller.

pub mod chain;
pub mod claim;
pub mod config;
pub mod entitlement;
pub mod indexer;
pub mod poller;
pub mod sources;
pub mod view;
pub mod webhook;
