use anyhow::Context;
use freeclaim::chain::rpc::{PaperSubmitter, PaperWatcher, RpcMarketClient};
use freeclaim::chain::MarketReader;
use freeclaim::claim::{ClaimController, LogNotifier};
use freeclaim::config::Config;
use freeclaim::entitlement::Eligibility;
use freeclaim::indexer::IndexerClient;
use freeclaim::poller::ClaimStatusPoller;
use freeclaim::view;
use freeclaim::webhook::{self, AppState, TokenStore};
use alloy::primitives::Address;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = if Path::new("freeclaim.toml").exists() {
        Config::load(Path::new("freeclaim.toml")).context("loading freeclaim.toml")?
    } else {
        info!("no freeclaim.toml found, using env-only config");
        Config::from_env()
    };

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .init();
    }

    info!("freeclaim v{} starting", env!("CARGO_PKG_VERSION"));

    let contract: Address = config
        .chain
        .contract_address
        .parse()
        .context("invalid chain.contract_address")?;
    let wallet: Option<Address> = match &config.market.wallet_address {
        Some(raw) => Some(raw.parse().context("invalid market.wallet_address")?),
        None => None,
    };

    if config.claim.execute {
        // Signing is delegated to an external wallet service; this build
        // ships only the paper submitter.
        anyhow::bail!(
            "claim.execute is set but no signer binding is configured; \
             unset it to run in paper mode"
        );
    }

    // --- Valkey token store ---
    let store = match TokenStore::connect(&config.valkey.url, &config.valkey.prefix).await {
        Ok(mut s) => {
            if let Err(e) = s.ping().await {
                error!(error = %e, "Valkey ping failed — continuing without token store");
                None
            } else {
                info!(url = %config.valkey.url, "Valkey token store connected");
                Some(Arc::new(Mutex::new(s)))
            }
        }
        Err(e) => {
            warn!(
                error = %e,
                url = %config.valkey.url,
                "failed to connect to Valkey — webhook relay disabled"
            );
            None
        }
    };

    // --- Data sources and polling ---
    let client = RpcMarketClient::new(config.chain.rpc_url.clone(), contract);
    let reader: Arc<dyn MarketReader> = Arc::new(client);
    let indexer = IndexerClient::new(
        config.indexer.url.clone(),
        Duration::from_secs(config.indexer.timeout_secs),
    );

    let (poller, eligibility_rx) = ClaimStatusPoller::new(
        reader,
        indexer,
        config.market.market_id,
        config.market.market_type_hint,
        wallet,
        Duration::from_secs(config.polling.interval_secs),
    );
    let poller_handle = poller.start();

    // --- Claim controller (paper mode) ---
    let controller = Arc::new(ClaimController::new(
        Arc::new(PaperSubmitter::new(contract)),
        Arc::new(PaperWatcher),
        Arc::new(LogNotifier),
    ));

    // --- HTTP surface (webhook relay + status + claim trigger) ---
    let state = AppState {
        store,
        eligibility: eligibility_rx.clone(),
        controller: controller.clone(),
        market_id: config.market.market_id,
    };
    let bind_addr = config.server.bind_addr.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = webhook::serve(state, &bind_addr).await {
            error!(error = %e, "http server terminated");
        }
    });

    // --- Main loop: react to eligibility changes until shutdown ---
    let mut rx = eligibility_rx;
    let watch_loop = async {
        while rx.changed().await.is_ok() {
            let eligibility = *rx.borrow_and_update();

            // Re-run the one-shot notification check on every cycle; it is
            // idempotent per attempt.
            if let Eligibility::Available {
                tokens_per_participant,
                ..
            } = eligibility
            {
                controller.refresh(tokens_per_participant);
            }

            let current = view::project(&eligibility, &controller.phase());
            info!(
                market = config.market.market_id,
                variant = ?current.variant,
                label = %current.label,
                busy = current.busy,
                "claim status"
            );
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
        _ = watch_loop => {
            warn!("eligibility stream ended");
        }
    }

    server_handle.abort();
    poller_handle.abort();
    Ok(())
}
