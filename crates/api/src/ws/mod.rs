//! Real-time fan-out over WebSocket: the per-room session hub, the wire
//! envelope, and the upgrade handler with its read/write loops.

mod handler;
mod hub;
pub mod messages;

pub use handler::ws_handler;
pub use hub::RoomHub;
