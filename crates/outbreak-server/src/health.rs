use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub games: GameInfo,
    pub feed: FeedInfo,
}

#[derive(Serialize)]
pub struct GameInfo {
    pub active: usize,
    pub players: usize,
    pub users: usize,
}

#[derive(Serialize)]
pub struct FeedInfo {
    pub items: usize,
    pub sse_subscribers: usize,
}

/// Structured health check endpoint. Returns server status, registry counts,
/// and feed info as JSON.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (active, players, users) = {
        let registry = state.registry.read().await;
        let (active, players) = registry.stats();
        (active, players, registry.user_count())
    };
    let items = state.feed.read().await.len();
    let sse = state.sse_subscriber_count.load(Ordering::Relaxed);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        games: GameInfo {
            active,
            players,
            users,
        },
        feed: FeedInfo {
            items,
            sse_subscribers: sse,
        },
    })
}

/// Readiness check — verifies essential subsystems are initialized.
pub async fn readiness_check(State(state): State<AppState>) -> &'static str {
    // Taking both locks proves the shared state is constructed and usable.
    let _ = state.registry.read().await;
    let _ = state.feed.read().await;
    "ready"
}
