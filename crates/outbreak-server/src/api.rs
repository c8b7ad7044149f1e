use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use outbreak_core::entry::{EntryId, PlayerEntry, UserId};
use outbreak_core::events::GameEvent;
use outbreak_core::game::{Game, GameId, GameStage, OriginalZombieChoice};
use outbreak_core::rules::GameRules;

use crate::auth::{is_admin, player_token};
use crate::error::AppError;
use crate::feed::FeedItem;
use crate::state::AppState;

/// Request body for registering a user.
#[derive(Debug, Deserialize)]
pub struct RegisterUserBody {
    pub user_name: String,
    pub display_name: String,
    pub email_address: String,
}

/// Response for a successful registration. The token is the player's
/// bearer credential for join/leave/kill calls.
#[derive(Debug, Serialize)]
pub struct RegisterUserResponse {
    pub user_id: UserId,
    pub token: Uuid,
}

/// Request body for creating or updating a game.
#[derive(Debug, Deserialize)]
pub struct GameSettingsBody {
    pub display_name: Option<String>,
    pub rules: Option<GameRules>,
}

/// One game in the listing.
#[derive(Debug, Serialize)]
pub struct GameSummary {
    pub id: GameId,
    pub display_name: String,
    pub stage: GameStage,
    pub created: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub ended: Option<DateTime<Utc>>,
    pub players: usize,
}

impl GameSummary {
    fn from_game(game: &Game) -> Self {
        Self {
            id: game.id,
            display_name: game.display_name.clone(),
            stage: game.stage,
            created: game.created,
            started: game.started,
            ended: game.ended,
            players: game.entries.len(),
        }
    }
}

/// Full game view. Which entry is the original zombie is concealed unless
/// the game has reached the reveal stage, the viewer is that player, or
/// the viewer is an administrator.
#[derive(Debug, Serialize)]
pub struct GameView {
    pub id: GameId,
    pub display_name: String,
    pub stage: GameStage,
    pub created: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub ended: Option<DateTime<Utc>>,
    pub rules: GameRules,
    pub entries: Vec<EntryView>,
}

#[derive(Debug, Serialize)]
pub struct EntryView {
    pub entry_id: EntryId,
    pub tag: String,
    pub display_name: String,
    pub state: String,
    pub original_zombie: bool,
    pub kills: u32,
    pub death_date: Option<DateTime<Utc>>,
    pub survival_time_secs: Option<i64>,
    pub undead_time_secs: Option<i64>,
}

/// Request body for joining a game.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JoinBody {
    pub original_pool: bool,
    pub notify: bool,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub entry_id: EntryId,
    pub tag: String,
}

/// Request body for choosing the original zombie: `"random"` or
/// `{"entry_id": N}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OzChoiceBody {
    Keyword(String),
    Entry { entry_id: EntryId },
}

/// Request body for reporting a kill. The report time is stamped
/// server-side.
#[derive(Debug, Deserialize)]
pub struct KillBody {
    pub victim_tag: String,
    pub kill_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct KillResponse {
    pub killer_entry_id: EntryId,
    pub victim_entry_id: EntryId,
}

/// Request body for the admin raw entry edit. Absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EntryPatchBody {
    pub tag: Option<String>,
    pub original_pool: Option<bool>,
    pub notify: Option<bool>,
    pub kills: Option<u32>,
    pub death_date: Option<DateTime<Utc>>,
    pub feed_date: Option<DateTime<Utc>>,
    pub starve_date: Option<DateTime<Utc>>,
}

/// Admin quick actions on an entry.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceAction {
    Human,
    Infected,
    Zombie,
    Dead,
}

#[derive(Debug, Deserialize)]
pub struct ForceBody {
    pub action: ForceAction,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct StageResponse {
    pub stage: GameStage,
}

/// POST /api/v1/users — register a player account.
pub async fn register_user(
    State(state): State<AppState>,
    Json(body): Json<RegisterUserBody>,
) -> Result<(StatusCode, Json<RegisterUserResponse>), AppError> {
    let max_len = state.config.limits.max_name_length;
    for (field, value) in [
        ("user_name", &body.user_name),
        ("display_name", &body.display_name),
        ("email_address", &body.email_address),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{field} must not be empty")));
        }
        if value.len() > max_len {
            return Err(AppError::BadRequest(format!(
                "{field} exceeds {max_len} chars"
            )));
        }
    }

    let mut registry = state.registry.write().await;
    if registry.user_count() >= state.config.limits.max_users {
        return Err(AppError::Conflict("user limit reached".to_string()));
    }
    let (user, token) =
        registry.register_user(body.user_name, body.display_name, body.email_address)?;
    tracing::info!(user_id = %user.user_id, user_name = %user.user_name, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterUserResponse {
            user_id: user.user_id,
            token,
        }),
    ))
}

/// GET /api/v1/games — list games, oldest first.
pub async fn list_games(State(state): State<AppState>) -> Json<Vec<GameSummary>> {
    let registry = state.registry.read().await;
    let mut games: Vec<GameSummary> = registry.games().map(GameSummary::from_game).collect();
    games.sort_by_key(|g| g.created);
    Json(games)
}

/// POST /api/v1/games — create a game (admin).
pub async fn create_game(
    State(state): State<AppState>,
    Json(body): Json<GameSettingsBody>,
) -> Result<(StatusCode, Json<GameSummary>), AppError> {
    let display_name = body
        .display_name
        .ok_or_else(|| AppError::BadRequest("display_name is required".to_string()))?;
    if display_name.trim().is_empty() || display_name.len() > state.config.limits.max_name_length {
        return Err(AppError::BadRequest("invalid display_name".to_string()));
    }
    let rules = body.rules.unwrap_or_default();
    rules.validate()?;

    let mut registry = state.registry.write().await;
    if registry.game_count() >= state.config.limits.max_games {
        return Err(AppError::Conflict("game limit reached".to_string()));
    }
    let id = registry.create_game(display_name, rules);
    tracing::info!(game_id = %id, "game created");
    let game = registry
        .game(id)
        .ok_or_else(|| AppError::Internal("game vanished after creation".to_string()))?;
    Ok((StatusCode::CREATED, Json(GameSummary::from_game(game))))
}

/// GET /api/v1/games/{id} — full game view, after running the sweep.
pub async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    headers: HeaderMap,
) -> Result<Json<GameView>, AppError> {
    sweep_game(&state, game_id).await?;

    let viewer = viewer_user(&state, &headers).await;
    let admin = is_admin(&headers, &state.auth);
    let registry = state.registry.read().await;
    let game = registry
        .game(game_id)
        .ok_or_else(|| AppError::NotFound("no such game".to_string()))?;

    let entries = game
        .entries
        .iter()
        .map(|entry| {
            let display_name = registry
                .user(entry.user_id)
                .map(|u| u.display_name.clone())
                .unwrap_or_else(|| "unknown".to_string());
            entry_view(game, entry, display_name, viewer, admin)
        })
        .collect();

    Ok(Json(GameView {
        id: game.id,
        display_name: game.display_name.clone(),
        stage: game.stage,
        created: game.created,
        started: game.started,
        ended: game.ended,
        rules: game.rules.clone(),
        entries,
    }))
}

/// PUT /api/v1/games/{id} — update settings (admin).
pub async fn update_game(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    Json(body): Json<GameSettingsBody>,
) -> Result<Json<GameSummary>, AppError> {
    if let Some(ref rules) = body.rules {
        rules.validate()?;
    }
    let mut registry = state.registry.write().await;
    let game = registry
        .game_mut(game_id)
        .ok_or_else(|| AppError::NotFound("no such game".to_string()))?;
    if let Some(display_name) = body.display_name {
        if display_name.trim().is_empty()
            || display_name.len() > state.config.limits.max_name_length
        {
            return Err(AppError::BadRequest("invalid display_name".to_string()));
        }
        game.display_name = display_name;
    }
    if let Some(rules) = body.rules {
        game.rules = rules;
    }
    Ok(Json(GameSummary::from_game(game)))
}

/// DELETE /api/v1/games/{id} — delete a game and its entries (admin).
/// Registered users persist.
pub async fn delete_game(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
) -> Result<StatusCode, AppError> {
    let mut registry = state.registry.write().await;
    if registry.delete_game(game_id) {
        tracing::info!(game_id = %game_id, "game deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("no such game".to_string()))
    }
}

/// POST /api/v1/games/{id}/join — enter the game (player token).
pub async fn join_game(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    headers: HeaderMap,
    body: Option<Json<JoinBody>>,
) -> Result<(StatusCode, Json<JoinResponse>), AppError> {
    let user_id = require_player(&state, &headers).await?;
    let Json(body) = body.unwrap_or_default();

    let (entry_id, tag) = {
        let mut registry = state.registry.write().await;
        let game = registry
            .game_mut(game_id)
            .ok_or_else(|| AppError::NotFound("no such game".to_string()))?;
        if game.entries.len() >= state.config.limits.max_players_per_game {
            return Err(AppError::Conflict("player limit reached".to_string()));
        }
        let entry_id = game.join(user_id, body.original_pool, body.notify)?;
        let tag = game
            .entry(entry_id)
            .map(|e| e.tag.clone())
            .unwrap_or_default();
        (entry_id, tag)
    };
    state
        .feed
        .write()
        .await
        .push(game_id, Utc::now(), GameEvent::PlayerJoined { entry_id });
    tracing::info!(game_id = %game_id, entry_id, "player joined");
    Ok((StatusCode::CREATED, Json(JoinResponse { entry_id, tag })))
}

/// POST /api/v1/games/{id}/leave — withdraw while registration is open
/// (player token).
pub async fn leave_game(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let user_id = require_player(&state, &headers).await?;
    let entry_id = {
        let mut registry = state.registry.write().await;
        let game = registry
            .game_mut(game_id)
            .ok_or_else(|| AppError::NotFound("no such game".to_string()))?;
        game.leave(user_id)?
    };
    state
        .feed
        .write()
        .await
        .push(game_id, Utc::now(), GameEvent::PlayerLeft { entry_id });
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/games/{id}/stage/next — advance the stage (admin).
pub async fn next_stage(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
) -> Result<Json<StageResponse>, AppError> {
    let now = Utc::now();
    let (stage, events) = {
        let mut registry = state.registry.write().await;
        let game = registry
            .game_mut(game_id)
            .ok_or_else(|| AppError::NotFound("no such game".to_string()))?;
        let events = game.next_stage(now)?;
        (game.stage, events)
    };
    state.feed.write().await.push_all(game_id, now, events);
    tracing::info!(game_id = %game_id, %stage, "stage advanced");
    Ok(Json(StageResponse { stage }))
}

/// POST /api/v1/games/{id}/stage/previous — retreat the stage (admin).
pub async fn previous_stage(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
) -> Result<Json<StageResponse>, AppError> {
    let (stage, event) = {
        let mut registry = state.registry.write().await;
        let game = registry
            .game_mut(game_id)
            .ok_or_else(|| AppError::NotFound("no such game".to_string()))?;
        let event = game.previous_stage()?;
        (game.stage, event)
    };
    state.feed.write().await.push(game_id, Utc::now(), event);
    tracing::info!(game_id = %game_id, %stage, "stage retreated");
    Ok(Json(StageResponse { stage }))
}

/// POST /api/v1/games/{id}/original-zombie — choose the original zombie
/// (admin).
pub async fn choose_original_zombie(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    Json(body): Json<OzChoiceBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let choice = match body {
        OzChoiceBody::Keyword(ref word) if word == "random" => OriginalZombieChoice::Random,
        OzChoiceBody::Keyword(word) => {
            return Err(AppError::BadRequest(format!(
                "expected \"random\" or an entry_id, got {word:?}"
            )));
        },
        OzChoiceBody::Entry { entry_id } => OriginalZombieChoice::Entry(entry_id),
    };
    let now = Utc::now();
    let entry_id = {
        let mut registry = state.registry.write().await;
        let game = registry
            .game_mut(game_id)
            .ok_or_else(|| AppError::NotFound("no such game".to_string()))?;
        game.choose_original_zombie(choice, now)?
    };
    state
        .feed
        .write()
        .await
        .push(game_id, now, GameEvent::OriginalZombieChosen { entry_id });
    Ok(Json(serde_json::json!({ "entry_id": entry_id })))
}

/// POST /api/v1/games/{id}/kills — report a kill (player token). The
/// sweep runs first so starvation can invalidate a stale killer.
pub async fn report_kill(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    headers: HeaderMap,
    Json(body): Json<KillBody>,
) -> Result<(StatusCode, Json<KillResponse>), AppError> {
    let user_id = require_player(&state, &headers).await?;
    sweep_game(&state, game_id).await?;

    let report_time = Utc::now();
    let (killer, victim) = {
        let mut registry = state.registry.write().await;
        let game = registry
            .game_mut(game_id)
            .ok_or_else(|| AppError::NotFound("no such game".to_string()))?;
        game.report_kill(user_id, &body.victim_tag, body.kill_time, report_time)?
    };
    state.feed.write().await.push(
        game_id,
        report_time,
        GameEvent::KillReported {
            killer,
            victim,
            kill_time: body.kill_time,
        },
    );
    tracing::info!(game_id = %game_id, killer, victim, "kill reported");
    Ok((
        StatusCode::CREATED,
        Json(KillResponse {
            killer_entry_id: killer,
            victim_entry_id: victim,
        }),
    ))
}

/// PATCH /api/v1/games/{id}/entries/{entry_id} — raw entry edit (admin).
pub async fn patch_entry(
    State(state): State<AppState>,
    Path((game_id, entry_id)): Path<(GameId, EntryId)>,
    Json(body): Json<EntryPatchBody>,
) -> Result<Json<EntryView>, AppError> {
    let mut registry = state.registry.write().await;
    let game = registry
        .game_mut(game_id)
        .ok_or_else(|| AppError::NotFound("no such game".to_string()))?;

    if let Some(ref tag) = body.tag {
        let tag = tag.to_ascii_uppercase();
        if game
            .entries
            .iter()
            .any(|e| e.entry_id != entry_id && e.tag == tag)
        {
            return Err(AppError::Conflict(format!("tag {tag:?} is already taken")));
        }
    }

    let entry = game
        .entry_mut(entry_id)
        .ok_or_else(|| AppError::NotFound("no such entry".to_string()))?;
    if let Some(tag) = body.tag {
        entry.tag = tag.to_ascii_uppercase();
    }
    if let Some(original_pool) = body.original_pool {
        entry.original_pool = original_pool;
    }
    if let Some(notify) = body.notify {
        entry.notify = notify;
    }
    if let Some(kills) = body.kills {
        entry.kills = kills;
    }
    if let Some(death_date) = body.death_date {
        entry.death_date = Some(death_date);
    }
    if let Some(feed_date) = body.feed_date {
        entry.feed_date = Some(feed_date);
    }
    if let Some(starve_date) = body.starve_date {
        entry.starve_date = Some(starve_date);
    }

    let entry = entry.clone();
    let game = registry
        .game(game_id)
        .ok_or_else(|| AppError::Internal("game vanished during edit".to_string()))?;
    let display_name = registry
        .user(entry.user_id)
        .map(|u| u.display_name.clone())
        .unwrap_or_else(|| "unknown".to_string());
    Ok(Json(entry_view(game, &entry, display_name, None, true)))
}

/// POST /api/v1/games/{id}/entries/{entry_id}/force — quick state change
/// (admin).
pub async fn force_entry(
    State(state): State<AppState>,
    Path((game_id, entry_id)): Path<(GameId, EntryId)>,
    Json(body): Json<ForceBody>,
) -> Result<Json<EntryView>, AppError> {
    let now = Utc::now();
    let mut registry = state.registry.write().await;
    let game = registry
        .game_mut(game_id)
        .ok_or_else(|| AppError::NotFound("no such game".to_string()))?;
    let rules = game.rules.clone();
    let entry = game
        .entry_mut(entry_id)
        .ok_or_else(|| AppError::NotFound("no such entry".to_string()))?;

    match body.action {
        ForceAction::Human => entry.force_to_human(),
        ForceAction::Infected => entry.force_to_infected(now, &rules),
        ForceAction::Zombie => entry.force_to_zombie(now, &rules)?,
        ForceAction::Dead => entry.force_to_dead(now),
    }
    tracing::info!(game_id = %game_id, entry_id, action = ?body.action, "entry forced");

    let entry = entry.clone();
    let game = registry
        .game(game_id)
        .ok_or_else(|| AppError::Internal("game vanished during edit".to_string()))?;
    let display_name = registry
        .user(entry.user_id)
        .map(|u| u.display_name.clone())
        .unwrap_or_else(|| "unknown".to_string());
    Ok(Json(entry_view(game, &entry, display_name, None, true)))
}

/// GET /api/v1/feed — recent feed items, newest first.
pub async fn recent_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Json<Vec<FeedItem>> {
    let limit = query.limit.unwrap_or(50).min(500);
    let feed = state.feed.read().await;
    Json(feed.recent(limit).into_iter().cloned().collect())
}

/// Run the update sweep for one game and publish whatever it did.
pub async fn sweep_game(state: &AppState, game_id: GameId) -> Result<(), AppError> {
    let now = Utc::now();
    let events = {
        let mut registry = state.registry.write().await;
        let game = registry
            .game_mut(game_id)
            .ok_or_else(|| AppError::NotFound("no such game".to_string()))?;
        game.update(now)?
    };
    if !events.is_empty() {
        state.feed.write().await.push_all(game_id, now, events);
    }
    Ok(())
}

async fn require_player(state: &AppState, headers: &HeaderMap) -> Result<UserId, AppError> {
    let token = player_token(headers)
        .ok_or_else(|| AppError::Unauthorized("player token required".to_string()))?;
    state
        .registry
        .read()
        .await
        .authenticate(token)
        .ok_or_else(|| AppError::Unauthorized("unknown player token".to_string()))
}

async fn viewer_user(state: &AppState, headers: &HeaderMap) -> Option<UserId> {
    let token = player_token(headers)?;
    state.registry.read().await.authenticate(token)
}

fn entry_view(
    game: &Game,
    entry: &PlayerEntry,
    display_name: String,
    viewer: Option<UserId>,
    admin: bool,
) -> EntryView {
    let revealed = admin
        || game.revealed_original_zombie()
        || viewer.is_some_and(|user| user == entry.user_id);
    let state = if admin {
        entry.state.internal_name().to_string()
    } else if entry.state.is_original_zombie() && !entry.state.is_dead() && !revealed {
        "Zombie".to_string()
    } else {
        entry.state.affiliation().to_string()
    };
    EntryView {
        entry_id: entry.entry_id,
        tag: entry.tag.clone(),
        display_name,
        state,
        original_zombie: revealed && entry.state.is_original_zombie(),
        kills: entry.kills,
        death_date: entry.death_date,
        survival_time_secs: game
            .survival_time(entry)
            .ok()
            .flatten()
            .map(|d| d.num_seconds()),
        undead_time_secs: game
            .undead_time(entry)
            .ok()
            .flatten()
            .map(|d| d.num_seconds()),
    }
}
