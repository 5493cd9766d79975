//! Handlers for the `/rooms` resource: CRUD, membership, roster, and chat
//! history.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use huddle_core::error::CoreError;
use huddle_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use huddle_db::models::message::ChatMessage;
use huddle_db::models::participant::ParticipantProfile;
use huddle_db::models::room::Room;
use huddle_db::pagination::{clamp_limit, decode_cursor};
use huddle_db::repositories::{ChatRepo, JoinOutcome, ParticipantRepo, RoomRepo};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Hard cap on `max_participants`; out-of-range requests fall back to it.
const MAX_ROOM_CAPACITY: i64 = 10;

/// Room listing page size: default and cap.
const ROOMS_DEFAULT_LIMIT: i64 = 20;
const ROOMS_MAX_LIMIT: i64 = 50;

/// Chat history page size: default and cap.
const CHAT_DEFAULT_LIMIT: i64 = 50;
const CHAT_MAX_LIMIT: i64 = 100;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /rooms`.
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    /// Desired capacity; `0` or out-of-range values fall back to the cap.
    #[serde(default)]
    pub max: i64,
}

/// Query parameters for `GET /rooms`.
#[derive(Debug, Deserialize)]
pub struct ListRoomsParams {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

/// Query parameters for `GET /rooms/{id}/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatHistoryParams {
    pub limit: Option<i64>,
    pub after: Option<String>,
}

/// A room as returned to clients.
#[derive(Debug, Serialize)]
pub struct RoomItem {
    pub id: String,
    pub name: String,
    pub max_participants: i64,
    pub created_at: Timestamp,
}

impl From<&Room> for RoomItem {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.to_string(),
            name: room.name.clone(),
            max_participants: room.max_participants,
            created_at: room.created_at,
        }
    }
}

/// Response for `GET /rooms`.
#[derive(Debug, Serialize)]
pub struct RoomsListResponse {
    pub items: Vec<RoomItem>,
    /// Present only when the page was full; empty means end of stream.
    pub next_cursor: Option<String>,
}

/// Response for `POST /rooms/{id}/join`.
#[derive(Debug, Serialize)]
pub struct JoinRoomResponse {
    pub room_id: String,
    pub peer_id: String,
}

/// Response for `POST /rooms/{id}/leave`.
#[derive(Debug, Serialize)]
pub struct LeaveRoomResponse {
    pub status: &'static str,
}

/// One roster entry with profile fields, `user_id` stringified for JS
/// clients.
#[derive(Debug, Serialize)]
pub struct ParticipantItem {
    pub user_id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub joined_at: Timestamp,
    pub last_seen: Timestamp,
}

impl From<&ParticipantProfile> for ParticipantItem {
    fn from(p: &ParticipantProfile) -> Self {
        Self {
            user_id: p.user_id.to_string(),
            display_name: p.display_name.clone(),
            avatar_url: p.avatar_url.clone(),
            joined_at: p.joined_at,
            last_seen: p.last_seen,
        }
    }
}

/// Response for `GET /rooms/{id}/participants`.
#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
    pub items: Vec<ParticipantItem>,
}

/// A chat message as returned in history pages.
#[derive(Debug, Serialize)]
pub struct ChatMessageItem {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub text: String,
    pub reply_to: Option<String>,
    pub created_at: Timestamp,
}

impl From<&ChatMessage> for ChatMessageItem {
    fn from(m: &ChatMessage) -> Self {
        Self {
            id: m.id.to_string(),
            room_id: m.room_id.to_string(),
            user_id: m.user_id.to_string(),
            text: m.text.clone(),
            reply_to: m.reply_to.map(|id| id.to_string()),
            created_at: m.created_at,
        }
    }
}

/// Response for `GET /rooms/{id}/chat`.
#[derive(Debug, Serialize)]
pub struct ChatHistoryResponse {
    pub items: Vec<ChatMessageItem>,
    pub next_cursor: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /rooms
pub async fn create_room(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(input): Json<CreateRoomRequest>,
) -> AppResult<(StatusCode, Json<RoomItem>)> {
    let max = clamp_capacity(input.max);
    let room = RoomRepo::create(&state.pool, &input.name, max).await?;
    tracing::info!(room_id = %room.id, max_participants = max, "room created");
    Ok((StatusCode::CREATED, Json(RoomItem::from(&room))))
}

/// GET /rooms?limit=&cursor=
pub async fn list_rooms(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListRoomsParams>,
) -> AppResult<Json<RoomsListResponse>> {
    let cursor = decode_cursor(params.cursor.as_deref().unwrap_or(""))?;
    let limit = clamp_limit(params.limit, ROOMS_DEFAULT_LIMIT, ROOMS_MAX_LIMIT);

    let (rooms, next_cursor) = RoomRepo::list(&state.pool, limit, cursor.as_ref()).await?;

    Ok(Json(RoomsListResponse {
        items: rooms.iter().map(RoomItem::from).collect(),
        next_cursor,
    }))
}

/// GET /rooms/{id}
pub async fn get_room(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<Json<RoomItem>> {
    let room = RoomRepo::find_by_id(&state.pool, room_id)
        .await?
        .ok_or(CoreError::NotFound { entity: "room" })?;
    Ok(Json(RoomItem::from(&room)))
}

/// DELETE /rooms/{id}
///
/// Participants and messages cascade away with the room.
pub async fn delete_room(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let deleted = RoomRepo::delete(&state.pool, room_id).await?;
    if !deleted {
        return Err(CoreError::NotFound { entity: "room" }.into());
    }
    tracing::info!(%room_id, "room deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /rooms/{id}/join
///
/// Admission is capacity-checked under a room row lock; the `exists`
/// pre-check answers repeat joins without taking that lock.
pub async fn join_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<Json<JoinRoomResponse>> {
    RoomRepo::find_by_id(&state.pool, room_id)
        .await?
        .ok_or(CoreError::NotFound { entity: "room" })?;

    if ParticipantRepo::exists(&state.pool, room_id, user.user_id).await? {
        return Err(CoreError::AlreadyJoined.into());
    }

    match ParticipantRepo::join(&state.pool, room_id, user.user_id).await? {
        JoinOutcome::Joined => {}
        JoinOutcome::AlreadyJoined => return Err(CoreError::AlreadyJoined.into()),
        JoinOutcome::RoomFull => return Err(CoreError::RoomFull.into()),
        JoinOutcome::RoomNotFound => {
            return Err(CoreError::NotFound { entity: "room" }.into())
        }
    }

    tracing::info!(%room_id, user_id = user.user_id, "participant joined");

    Ok(Json(JoinRoomResponse {
        room_id: room_id.to_string(),
        peer_id: user.user_id.to_string(),
    }))
}

/// POST /rooms/{id}/leave
pub async fn leave_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<Json<LeaveRoomResponse>> {
    let removed = ParticipantRepo::leave(&state.pool, room_id, user.user_id).await?;
    if !removed {
        return Err(CoreError::NotInRoom.into());
    }
    tracing::info!(%room_id, user_id = user.user_id, "participant left");
    Ok(Json(LeaveRoomResponse { status: "left" }))
}

/// GET /rooms/{id}/participants
///
/// Detailed roster restricted to participants seen within the configured
/// online window.
pub async fn list_participants(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<Json<ParticipantsResponse>> {
    let window = Duration::from_secs(state.config.rooms.online_window_secs);
    let rows = ParticipantRepo::list_detailed(&state.pool, room_id, window).await?;

    Ok(Json(ParticipantsResponse {
        items: rows.iter().map(ParticipantItem::from).collect(),
    }))
}

/// GET /rooms/{id}/chat?after=&limit=
pub async fn chat_history(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(room_id): Path<Uuid>,
    Query(params): Query<ChatHistoryParams>,
) -> AppResult<Json<ChatHistoryResponse>> {
    let cursor = decode_cursor(params.after.as_deref().unwrap_or(""))?;
    let limit = clamp_limit(params.limit, CHAT_DEFAULT_LIMIT, CHAT_MAX_LIMIT);

    let (messages, next_cursor) =
        ChatRepo::history(&state.pool, room_id, limit, cursor.as_ref()).await?;

    Ok(Json(ChatHistoryResponse {
        items: messages.iter().map(ChatMessageItem::from).collect(),
        next_cursor,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Clamp requested capacity into `[1, MAX_ROOM_CAPACITY]`; zero and
/// out-of-range fall back to the cap.
fn clamp_capacity(requested: i64) -> i64 {
    if requested <= 0 || requested > MAX_ROOM_CAPACITY {
        MAX_ROOM_CAPACITY
    } else {
        requested
    }
}
