//! Repository for the `room_participants` table.

use std::time::Duration;

use huddle_core::types::DbId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::participant::{Participant, ParticipantProfile};

/// Result of a capacity-checked join attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The participant row was inserted.
    Joined,
    /// The `(room, user)` pair already existed; nothing changed.
    AlreadyJoined,
    /// The room is at `max_participants`.
    RoomFull,
    /// No room with that id.
    RoomNotFound,
}

/// Provides membership operations for rooms.
pub struct ParticipantRepo;

impl ParticipantRepo {
    /// Join a room, enforcing `count(room) <= max_participants` under
    /// concurrency.
    ///
    /// The room row is locked with `FOR UPDATE`, which serializes
    /// concurrent joins for the same room; joins to different rooms never
    /// contend. The insert uses `ON CONFLICT DO NOTHING`, so a racing
    /// duplicate cannot violate the primary key.
    pub async fn join(
        pool: &PgPool,
        room_id: Uuid,
        user_id: DbId,
    ) -> Result<JoinOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let max: Option<i64> =
            sqlx::query_scalar("SELECT max_participants FROM rooms WHERE id = $1 FOR UPDATE")
                .bind(room_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(max) = max else {
            return Ok(JoinOutcome::RoomNotFound);
        };

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM room_participants WHERE room_id = $1")
                .bind(room_id)
                .fetch_one(&mut *tx)
                .await?;
        if count >= max {
            return Ok(JoinOutcome::RoomFull);
        }

        let inserted = sqlx::query(
            "INSERT INTO room_participants (room_id, user_id)
             VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(room_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        Ok(if inserted == 0 {
            JoinOutcome::AlreadyJoined
        } else {
            JoinOutcome::Joined
        })
    }

    /// Whether the `(room, user)` membership exists.
    pub async fn exists(pool: &PgPool, room_id: Uuid, user_id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM room_participants WHERE room_id = $1 AND user_id = $2)",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Remove a membership. Returns `false` when the row did not exist.
    pub async fn leave(pool: &PgPool, room_id: Uuid, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM room_participants WHERE room_id = $1 AND user_id = $2")
                .bind(room_id)
                .bind(user_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List memberships of a room ordered by join time.
    pub async fn list_by_room(pool: &PgPool, room_id: Uuid) -> Result<Vec<Participant>, sqlx::Error> {
        sqlx::query_as::<_, Participant>(
            "SELECT room_id, user_id, joined_at, last_seen
             FROM room_participants
             WHERE room_id = $1
             ORDER BY joined_at ASC",
        )
        .bind(room_id)
        .fetch_all(pool)
        .await
    }

    /// List participants joined with user profiles, restricted to those
    /// seen within `online_window` of now.
    pub async fn list_detailed(
        pool: &PgPool,
        room_id: Uuid,
        online_window: Duration,
    ) -> Result<Vec<ParticipantProfile>, sqlx::Error> {
        sqlx::query_as::<_, ParticipantProfile>(
            "SELECT p.user_id, u.display_name, u.avatar_url, p.joined_at, p.last_seen
             FROM room_participants AS p
             JOIN users AS u ON u.id = p.user_id
             WHERE p.room_id = $1
               AND p.last_seen > NOW() - ($2::bigint * INTERVAL '1 second')
             ORDER BY u.display_name NULLS LAST, p.joined_at",
        )
        .bind(room_id)
        .bind(online_window.as_secs() as i64)
        .fetch_all(pool)
        .await
    }

    /// Set `last_seen` to now. Returns `false` when the membership does not
    /// exist.
    pub async fn touch_heartbeat(
        pool: &PgPool,
        room_id: Uuid,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE room_participants SET last_seen = NOW()
             WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
