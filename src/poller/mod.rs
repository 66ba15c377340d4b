//! Polling loops that feed the entitlement pipeline.
//!
//! Two authoritative reads run on a fixed interval while their enable
//! conditions hold: the wallet's claim status (wallet connected) and the
//! free-market info (market confirmed free-entry). The secondary index is
//! consulted only when no market-type hint was supplied.
//!
//! Each tick gathers a complete [`EligibilitySnapshot`] before resolving, so
//! a resolution never pairs an old config with a new claim record. Source
//! failures degrade to absent fields; the resolver turns those into
//! `Unresolved`/`Disconnected` instead of a fault.

use crate::chain::MarketReader;
use crate::entitlement::{self, Eligibility, EligibilitySnapshot};
use crate::indexer::IndexerClient;
use crate::sources;
use alloy::primitives::{Address, U256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct ClaimStatusPoller {
    reader: Arc<dyn MarketReader>,
    indexer: IndexerClient,
    market_id: u64,
    market_type_hint: Option<u8>,
    wallet: Option<Address>,
    interval: Duration,
    eligibility_tx: watch::Sender<Eligibility>,
}

impl ClaimStatusPoller {
    /// Build a poller and the receiver its resolutions are published on.
    pub fn new(
        reader: Arc<dyn MarketReader>,
        indexer: IndexerClient,
        market_id: u64,
        market_type_hint: Option<u8>,
        wallet: Option<Address>,
        interval: Duration,
    ) -> (Self, watch::Receiver<Eligibility>) {
        let (eligibility_tx, eligibility_rx) = watch::channel(Eligibility::Unresolved);
        (
            Self {
                reader,
                indexer,
                market_id,
                market_type_hint,
                wallet,
                interval,
                eligibility_tx,
            },
            eligibility_rx,
        )
    }

    /// Start polling in a background task. Stops when every receiver of the
    /// eligibility channel is gone.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        info!(
            market = self.market_id,
            interval_secs = self.interval.as_secs(),
            wallet = self.wallet.is_some(),
            "claim status poller starting"
        );

        let mut ticker = tokio::time::interval(self.interval);
        let mut last = Eligibility::Unresolved;

        loop {
            ticker.tick().await;

            let snapshot = self.gather().await;
            let eligibility = entitlement::resolve(&snapshot);

            if eligibility != last {
                info!(market = self.market_id, ?eligibility, "eligibility changed");
                last = eligibility;
            }

            if self.eligibility_tx.send(eligibility).is_err() {
                debug!(market = self.market_id, "all receivers dropped, poller stopping");
                return;
            }
        }
    }

    /// One complete input snapshot. Every fetch error is absorbed into an
    /// absent field here, never propagated.
    async fn gather(&self) -> EligibilitySnapshot {
        let market_id = U256::from(self.market_id);

        // Secondary index, unless the caller already told us the type.
        let indexed = if self.market_type_hint.is_none() {
            match self.indexer.market(self.market_id).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(market = self.market_id, error = %e, "index fetch failed");
                    None
                }
            }
        } else {
            None
        };

        // Authoritative free info, only once the market is known free-entry.
        let is_free = sources::market_is_free(self.market_type_hint, indexed.as_ref());
        let chain_free_info = if is_free == Some(true) {
            match self.reader.free_market_info(market_id).await {
                Ok(info) => Some(info),
                Err(e) => {
                    warn!(market = self.market_id, error = %e, "free info read failed");
                    None
                }
            }
        } else {
            None
        };

        // Claim record, only with a connected wallet.
        let claim = match self.wallet {
            Some(wallet) => match self.reader.claim_status(market_id, wallet).await {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(market = self.market_id, error = %e, "claim status read failed");
                    None
                }
            },
            None => None,
        };

        EligibilitySnapshot {
            chain_free_info,
            indexed,
            claim,
            wallet_connected: self.wallet.is_some(),
            market_type_hint: self.market_type_hint,
        }
    }
}
