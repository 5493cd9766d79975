//! Shared building blocks for the huddle backend.
//!
//! This crate has no internal dependencies so the database layer, the API
//! layer, and any future tooling can all use the same error taxonomy and
//! type aliases.

pub mod error;
pub mod redact;
pub mod types;
