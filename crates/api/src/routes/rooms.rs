//! Route definitions for the `/rooms` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::rooms;
use crate::middleware::heartbeat;
use crate::state::AppState;

/// Routes mounted at `/rooms`.
///
/// Room-scoped routes run the heartbeat layer: any authenticated request
/// naming a room refreshes the caller's `last_seen` before the handler.
pub fn router(state: AppState) -> Router<AppState> {
    let room_scoped = Router::new()
        .route("/", get(rooms::get_room).delete(rooms::delete_room))
        .route("/join", post(rooms::join_room))
        .route("/leave", post(rooms::leave_room))
        .route("/participants", get(rooms::list_participants))
        .route("/chat", get(rooms::chat_history))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            heartbeat::touch_on_room_path,
        ));

    Router::new()
        .route("/", post(rooms::create_room).get(rooms::list_rooms))
        .nest("/{id}", room_scoped)
}
