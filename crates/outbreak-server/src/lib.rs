pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod health;
pub mod registry;
pub mod sse;
pub mod state;

use std::time::Duration;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    // Player-facing routes: identity comes from per-user tokens, checked in
    // the handlers themselves.
    let player_routes = Router::new()
        .route("/users", post(api::register_user))
        .route("/games", get(api::list_games))
        .route("/games/{game_id}", get(api::get_game))
        .route("/games/{game_id}/join", post(api::join_game))
        .route("/games/{game_id}/leave", post(api::leave_game))
        .route("/games/{game_id}/kills", post(api::report_kill))
        .route("/feed", get(api::recent_feed))
        .route("/feed/stream", get(sse::feed_stream));

    // Administrator routes (behind the admin bearer middleware).
    let admin_routes = Router::new()
        .route("/games", post(api::create_game))
        .route(
            "/games/{game_id}",
            axum::routing::put(api::update_game).delete(api::delete_game),
        )
        .route("/games/{game_id}/stage/next", post(api::next_stage))
        .route(
            "/games/{game_id}/stage/previous",
            post(api::previous_stage),
        )
        .route(
            "/games/{game_id}/original-zombie",
            post(api::choose_original_zombie),
        )
        .route(
            "/games/{game_id}/entries/{entry_id}",
            axum::routing::patch(api::patch_entry),
        )
        .route(
            "/games/{game_id}/entries/{entry_id}/force",
            post(api::force_entry),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_layer,
        ));

    let app = Router::new()
        .nest("/api/v1", admin_routes.merge(player_routes))
        .route("/healthz", get(health::health_check))
        .route("/readyz", get(health::readiness_check))
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state.clone());

    (app, state)
}

/// Background task that periodically runs the update sweep over every game,
/// so starvation and win conditions fire even while nobody is watching.
pub fn spawn_sweeper(state: AppState) {
    let interval = Duration::from_secs(state.config.sweep.interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let game_ids: Vec<_> = {
                let registry = state.registry.read().await;
                registry.games().map(|g| g.id).collect()
            };
            for game_id in game_ids {
                if let Err(e) = api::sweep_game(&state, game_id).await {
                    tracing::warn!(game_id = %game_id, "sweep failed: {e}");
                }
            }
        }
    });
}

/// Middleware wrapper that injects AuthConfig into request extensions for
/// the admin auth middleware.
async fn admin_auth_layer(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut request: axum::extract::Request,
    next: middleware::Next,
) -> Result<axum::response::Response, axum::http::StatusCode> {
    request.extensions_mut().insert(state.auth.clone());
    auth::admin_auth_middleware(request.headers().clone(), request, next).await
}
