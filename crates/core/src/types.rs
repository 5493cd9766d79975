//! Type aliases shared across all crates.

/// Internal numeric database id (`BIGSERIAL` columns).
pub type DbId = i64;

/// UTC timestamp as stored in `TIMESTAMPTZ` columns.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
