//! Repository for the `rooms` table.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::room::Room;
use crate::pagination::{encode_cursor, Cursor};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, max_participants, created_at";

/// Provides CRUD operations for rooms.
pub struct RoomRepo;

impl RoomRepo {
    /// Insert a new room, returning the created row. The id and creation
    /// timestamp are assigned by the database.
    pub async fn create(pool: &PgPool, name: &str, max_participants: i64) -> Result<Room, sqlx::Error> {
        let query = format!(
            "INSERT INTO rooms (name, max_participants)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Room>(&query)
            .bind(name)
            .bind(max_participants)
            .fetch_one(pool)
            .await
    }

    /// Find a room by id.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Room>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rooms WHERE id = $1");
        sqlx::query_as::<_, Room>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List rooms in `(created_at DESC, id DESC)` order with keyset
    /// pagination.
    ///
    /// Returns the page and, when the page is exactly `limit` rows, the
    /// cursor of its last row. A short page means end of stream.
    pub async fn list(
        pool: &PgPool,
        limit: i64,
        cursor: Option<&Cursor>,
    ) -> Result<(Vec<Room>, Option<String>), sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rooms
             WHERE ($1::timestamptz IS NULL
                    OR created_at < $1
                    OR (created_at = $1 AND id < $2))
             ORDER BY created_at DESC, id DESC
             LIMIT $3"
        );
        let rooms = sqlx::query_as::<_, Room>(&query)
            .bind(cursor.map(|c| c.created_at))
            .bind(cursor.and_then(Cursor::id_as_uuid))
            .bind(limit)
            .fetch_all(pool)
            .await?;

        let next = if rooms.len() as i64 == limit {
            rooms
                .last()
                .and_then(|last| encode_cursor(&Cursor::new(last.created_at, last.id)))
        } else {
            None
        };
        Ok((rooms, next))
    }

    /// Delete a room. Participants and messages cascade via foreign keys.
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
