//! Repository for the `room_messages` table.

use huddle_core::types::DbId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::message::ChatMessage;
use crate::pagination::{encode_cursor, Cursor};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, room_id, user_id, text, reply_to, created_at";

/// Provides persistence for the per-room chat log.
pub struct ChatRepo;

impl ChatRepo {
    /// Insert a message, returning the persisted row with its assigned id
    /// and timestamp. Text is expected pre-validated (trimmed, non-empty,
    /// within the length bound).
    pub async fn save(
        pool: &PgPool,
        room_id: Uuid,
        user_id: DbId,
        text: &str,
        reply_to: Option<Uuid>,
    ) -> Result<ChatMessage, sqlx::Error> {
        let query = format!(
            "INSERT INTO room_messages (room_id, user_id, text, reply_to)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(room_id)
            .bind(user_id)
            .bind(text)
            .bind(reply_to)
            .fetch_one(pool)
            .await
    }

    /// Page through a room's messages in `(created_at DESC, id DESC)` order.
    ///
    /// The keyset condition is strict with an id tie-break on equal
    /// timestamps, so repeated calls chained by the returned cursor visit
    /// every message exactly once. The cursor is emitted only for a full
    /// page.
    pub async fn history(
        pool: &PgPool,
        room_id: Uuid,
        limit: i64,
        cursor: Option<&Cursor>,
    ) -> Result<(Vec<ChatMessage>, Option<String>), sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM room_messages
             WHERE room_id = $1
               AND ($2::timestamptz IS NULL
                    OR created_at < $2
                    OR (created_at = $2 AND id < $3))
             ORDER BY created_at DESC, id DESC
             LIMIT $4"
        );
        let messages = sqlx::query_as::<_, ChatMessage>(&query)
            .bind(room_id)
            .bind(cursor.map(|c| c.created_at))
            .bind(cursor.and_then(Cursor::id_as_uuid))
            .bind(limit)
            .fetch_all(pool)
            .await?;

        let next = if messages.len() as i64 == limit {
            messages
                .last()
                .and_then(|last| encode_cursor(&Cursor::new(last.created_at, last.id)))
        } else {
            None
        };
        Ok((messages, next))
    }
}
