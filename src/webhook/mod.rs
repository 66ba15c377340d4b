//! Inbound HTTP surface: push-token webhook relay plus a small status API.
//!
//! The relay stores one `(fid → {url, token})` mapping per platform user in
//! Valkey so the notification service can reach them later:
//!   POST /api/webhook   frame_added / notifications_enabled   → store
//!                       frame_removed / notifications_disabled → delete
//!   GET  /api/status    latest projected claim view for the watched market
//!   POST /api/claim     trigger a claim attempt (rejected while busy)
//!
//! Event signature verification happens upstream at the platform gateway;
//! this relay validates shape only.

use crate::claim::ClaimController;
use crate::entitlement::Eligibility;
use crate::view;
use alloy::primitives::U256;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("valkey error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Stored push-token record for one platform user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationToken {
    pub url: String,
    pub token: String,
    pub updated_at: String,
}

/// Valkey-backed token store. Keys are namespaced under a configurable
/// prefix: "{prefix}:notification:{fid}".
#[derive(Clone)]
pub struct TokenStore {
    conn: MultiplexedConnection,
    prefix: String,
}

impl TokenStore {
    pub async fn connect(url: &str, prefix: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            prefix: prefix.to_string(),
        })
    }

    pub async fn ping(&mut self) -> Result<(), StoreError> {
        let _: () = redis::cmd("PING").query_async(&mut self.conn).await?;
        Ok(())
    }

    fn key(&self, fid: &str) -> String {
        format!("{}:notification:{}", self.prefix, fid)
    }

    pub async fn set(&mut self, fid: &str, url: &str, token: &str) -> Result<(), StoreError> {
        let record = NotificationToken {
            url: url.to_string(),
            token: token.to_string(),
            updated_at: Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_string(&record)?;
        let _: () = self.conn.set(self.key(fid), payload).await?;
        debug!(fid, "stored notification token");
        Ok(())
    }

    pub async fn get(&mut self, fid: &str) -> Result<Option<NotificationToken>, StoreError> {
        let payload: Option<String> = self.conn.get(self.key(fid)).await?;
        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&mut self, fid: &str) -> Result<(), StoreError> {
        let _: () = self.conn.del(self.key(fid)).await?;
        debug!(fid, "deleted notification token");
        Ok(())
    }
}

/// Signed platform event, as relayed by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub fid: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Shared state for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    /// None when Valkey was unreachable at boot (webhook returns 503).
    pub store: Option<Arc<Mutex<TokenStore>>>,
    pub eligibility: watch::Receiver<Eligibility>,
    pub controller: Arc<ClaimController>,
    pub market_id: u64,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/webhook", post(post_webhook))
        .route("/api/status", get(get_status))
        .route("/api/claim", post(post_claim))
        .with_state(state)
}

pub async fn serve(state: AppState, bind_addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = bind_addr, "http server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn post_webhook(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> impl IntoResponse {
    let Some(store) = state.store else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "token store unavailable" })),
        );
    };
    let mut store = store.lock().await;

    let result = match event.event.as_str() {
        "frame_added" | "notifications_enabled" => {
            match (event.data.url.as_deref(), event.data.token.as_deref()) {
                (Some(url), Some(token)) => store.set(&event.data.fid, url, token).await,
                // Added without notification details: nothing to store.
                _ => Ok(()),
            }
        }
        "frame_removed" | "notifications_disabled" => store.delete(&event.data.fid).await,
        other => {
            debug!(event = other, "ignoring unknown webhook event");
            Ok(())
        }
    };

    match result {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "success" }))),
        Err(e) => {
            error!(event = %event.event, fid = %event.data.fid, error = %e, "webhook store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to process webhook" })),
            )
        }
    }
}

async fn get_status(State(state): State<AppState>) -> Json<view::ClaimStatusView> {
    let eligibility = *state.eligibility.borrow();
    Json(view::project(&eligibility, &state.controller.phase()))
}

/// Trigger a claim attempt. The drive runs in its own task so the phase —
/// and with it `/api/status` — stays readable for the whole submission and
/// confirmation window.
async fn post_claim(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let eligibility = *state.eligibility.borrow();

    let current = view::project(&eligibility, &state.controller.phase());
    if !current.claim_enabled {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "claim not available", "view": current })),
        );
    }

    let Eligibility::Available {
        tokens_per_participant,
        ..
    } = eligibility
    else {
        // claim_enabled implies Available; belt and braces for the type.
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "claim not available", "view": current })),
        );
    };

    let controller = state.controller.clone();
    let market_id = state.market_id;
    tokio::spawn(async move {
        controller
            .submit(U256::from(market_id), tokens_per_participant)
            .await;
    });

    (StatusCode::ACCEPTED, Json(json!({ "status": "submitted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainError, ClaimSubmitter, ConfirmationStatus, ConfirmationWatcher, TxHandle};
    use crate::claim::LogNotifier;
    use alloy::primitives::B256;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct OkSubmitter;

    #[async_trait]
    impl ClaimSubmitter for OkSubmitter {
        async fn submit_claim(&self, _market_id: U256) -> Result<TxHandle, ChainError> {
            Ok(TxHandle(B256::ZERO))
        }
    }

    /// Watcher that holds confirmation open until released.
    struct GatedWatcher {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl ConfirmationWatcher for GatedWatcher {
        async fn await_confirmation(
            &self,
            _tx: TxHandle,
        ) -> Result<ConfirmationStatus, ChainError> {
            self.gate.notified().await;
            Ok(ConfirmationStatus::Success)
        }
    }

    fn gated_state(gate: Arc<Notify>) -> (AppState, watch::Sender<Eligibility>) {
        let (eligibility_tx, eligibility_rx) = watch::channel(Eligibility::Available {
            tokens_per_participant: U256::from(1_000_000_000_000_000_000u128),
            slots_remaining: U256::from(60u64),
            max_participants: U256::from(100u64),
        });
        let controller = Arc::new(ClaimController::new(
            Arc::new(OkSubmitter),
            Arc::new(GatedWatcher { gate }),
            Arc::new(LogNotifier),
        ));
        (
            AppState {
                store: None,
                eligibility: eligibility_rx,
                controller,
                market_id: 7,
            },
            eligibility_tx,
        )
    }

    #[tokio::test]
    async fn status_stays_readable_while_claim_is_in_flight() {
        let gate = Arc::new(Notify::new());
        let (state, _eligibility_tx) = gated_state(gate.clone());

        let (code, _) = post_claim(State(state.clone())).await;
        assert_eq!(code, StatusCode::ACCEPTED);

        // Wait for the spawned drive to reach the confirmation window.
        for _ in 0..100 {
            if state.controller.is_busy() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(state.controller.is_busy());

        // The status endpoint must answer mid-attempt and show busy.
        let Json(current) = get_status(State(state.clone())).await;
        assert!(current.busy);
        assert!(!current.claim_enabled);

        // A second trigger while busy is rejected, not queued.
        let (code, _) = post_claim(State(state.clone())).await;
        assert_eq!(code, StatusCode::CONFLICT);

        gate.notify_one();
        for _ in 0..100 {
            if !state.controller.is_busy() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(state.controller.phase(), crate::claim::ClaimPhase::Confirmed);
    }

    #[test]
    fn parses_platform_event_shapes() {
        let added: WebhookEvent = serde_json::from_value(json!({
            "event": "frame_added",
            "data": { "fid": "12345", "url": "https://relay.example/notify", "token": "abc" }
        }))
        .unwrap();
        assert_eq!(added.event, "frame_added");
        assert_eq!(added.data.fid, "12345");
        assert_eq!(added.data.token.as_deref(), Some("abc"));

        let removed: WebhookEvent = serde_json::from_value(json!({
            "event": "frame_removed",
            "data": { "fid": "12345" }
        }))
        .unwrap();
        assert!(removed.data.url.is_none());
        assert!(removed.data.token.is_none());
    }

    #[test]
    fn token_record_round_trips() {
        let record = NotificationToken {
            url: "https://relay.example/notify".to_string(),
            token: "abc".to_string(),
            updated_at: "2026-01-01T00:00:00+00:00".to_string(),
        };
        let raw = serde_json::to_string(&record).unwrap();
        assert_eq!(serde_json::from_str::<NotificationToken>(&raw).unwrap(), record);
    }
}
