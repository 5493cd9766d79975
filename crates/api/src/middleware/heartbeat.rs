//! Presence heartbeat on room-scoped requests.
//!
//! Any authenticated request carrying a room id in its path refreshes the
//! caller's `last_seen`, so plain polling (roster, chat history) counts as
//! presence the same way WebSocket pongs do.

use axum::extract::{FromRequestParts, RawPathParams, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use huddle_db::repositories::ParticipantRepo;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Best-effort `last_seen` touch; never fails the request.
pub async fn touch_on_room_path(
    State(state): State<AppState>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Response {
    let room_id = params
        .iter()
        .find(|(name, _)| *name == "id")
        .and_then(|(_, value)| Uuid::parse_str(value).ok());

    let (mut parts, body) = request.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &state).await.ok();
    let request = Request::from_parts(parts, body);

    if let (Some(room_id), Some(user)) = (room_id, user) {
        if let Err(err) = ParticipantRepo::touch_heartbeat(&state.pool, room_id, user.user_id).await
        {
            tracing::debug!(%room_id, user_id = user.user_id, error = %err,
                "heartbeat touch failed");
        }
    }

    next.run(request).await
}
