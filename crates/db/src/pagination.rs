//! Opaque keyset-pagination cursors.
//!
//! A cursor encodes the `(created_at, id)` of the last row of a page as
//! URL-safe unpadded base64 over a canonical JSON form. Clients treat it as
//! an opaque token; any token that does not decode back to that canonical
//! form is rejected as [`CoreError::InvalidCursor`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use huddle_core::error::CoreError;
use huddle_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Boundary row of a page: pagination continues strictly after this row in
/// `(created_at DESC, id DESC)` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub created_at: Timestamp,
    pub id: String,
}

impl Cursor {
    pub fn new(created_at: Timestamp, id: Uuid) -> Self {
        Self {
            created_at,
            id: id.to_string(),
        }
    }

    /// The boundary row id. Always valid for cursors produced by
    /// [`decode_cursor`], which validates the field.
    pub fn id_as_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.id).ok()
    }
}

/// Encode a cursor into its opaque wire form.
pub fn encode_cursor(cursor: &Cursor) -> Option<String> {
    let json = serde_json::to_vec(cursor).ok()?;
    Some(URL_SAFE_NO_PAD.encode(json))
}

/// Decode an opaque cursor token.
///
/// The empty string means "no cursor" (first page). Any base64 or JSON
/// failure, and any id that is not a UUID, yields
/// [`CoreError::InvalidCursor`].
pub fn decode_cursor(token: &str) -> Result<Option<Cursor>, CoreError> {
    if token.is_empty() {
        return Ok(None);
    }
    let raw = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| CoreError::InvalidCursor)?;
    let cursor: Cursor = serde_json::from_slice(&raw).map_err(|_| CoreError::InvalidCursor)?;
    if cursor.id_as_uuid().is_none() {
        return Err(CoreError::InvalidCursor);
    }
    Ok(Some(cursor))
}

/// Clamp a caller-supplied page size into `[1, max]`, falling back to
/// `default` when absent or non-positive.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    match limit {
        Some(n) if n > 0 => n.min(max),
        _ => default,
    }
}
