pub mod auth;
pub mod heartbeat;
pub mod logging;
