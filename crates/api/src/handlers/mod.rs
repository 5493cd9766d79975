pub mod auth;
pub mod rooms;
