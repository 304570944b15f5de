use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use application::{
    CreateRoomRequest, RegistryStats, RoomDto, UpdatePolicyRequest,
};
use domain::{Message, ModerationPolicy, RoomKind};

use crate::{error::ApiError, state::AppState, ws_connection::WebSocketConnection};

#[derive(Debug, Deserialize)]
struct CreateRoomPayload {
    code: String,
    display_name: String,
    kind: RoomKind,
}

#[derive(Debug, Deserialize)]
struct AnnouncePayload {
    body: String,
}

#[derive(Debug, Deserialize)]
struct UpdatePolicyPayload {
    blocked_terms: Vec<String>,
    max_messages_per_minute: u32,
    mute_duration_minutes: u32,
    auto_moderation_enabled: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{code}/messages", get(get_history))
        .route("/rooms/{code}/announce", post(announce))
        .route(
            "/rooms/{code}/messages/{message_id}/moderate",
            post(moderate_message),
        )
        .route("/moderation/policy", get(get_policy).put(update_policy))
        .route("/stats", get(get_stats))
        .route("/ws", get(websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn create_room(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoomPayload>,
) -> Result<(StatusCode, Json<RoomDto>), ApiError> {
    let dto = state
        .chat_service
        .create_room(CreateRoomRequest {
            code: payload.code,
            display_name: payload.display_name,
            kind: payload.kind,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(dto)))
}

async fn get_history(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let items = state.chat_service.room_history(&code).await?;
    Ok(Json(items))
}

async fn announce(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(payload): Json<AnnouncePayload>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let message = state.chat_service.announce(&code, &payload.body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn moderate_message(
    State(state): State<AppState>,
    Path((code, message_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .chat_service
        .moderate_message(&code, message_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_policy(
    State(state): State<AppState>,
) -> Result<Json<ModerationPolicy>, ApiError> {
    Ok(Json(state.chat_service.policy().await))
}

async fn update_policy(
    State(state): State<AppState>,
    Json(payload): Json<UpdatePolicyPayload>,
) -> Result<Json<ModerationPolicy>, ApiError> {
    let policy = state
        .chat_service
        .update_policy(UpdatePolicyRequest {
            blocked_terms: payload.blocked_terms,
            max_messages_per_minute: payload.max_messages_per_minute,
            mute_duration_minutes: payload.mute_duration_minutes,
            auto_moderation_enabled: payload.auto_moderation_enabled,
        })
        .await?;

    Ok(Json(policy))
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<RegistryStats>, ApiError> {
    let stats = state.stats_service.get_stats().await?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    /// 已认证的用户ID（由外部认证协作方提供）
    user_id: Uuid,
    display_name: String,
}

async fn websocket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    if query.display_name.trim().is_empty() {
        return Err(ApiError::bad_request("display_name is required"));
    }

    let connection = WebSocketConnection::new(state, query.user_id, query.display_name);
    Ok(ws.on_upgrade(move |socket| connection.run(socket)))
}
