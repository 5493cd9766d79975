//! Repository for the `auth_sessions` table (refresh sessions).

use huddle_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::session::{AuthSession, CreateSession};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, token_hash, expires_at, created_at, updated_at, \
                        user_agent, ip";

/// Provides CRUD operations for refresh sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session, returning the created row.
    ///
    /// `token_hash` is unique; a colliding insert surfaces as a `23505`
    /// database error.
    pub async fn create(pool: &PgPool, input: &CreateSession) -> Result<AuthSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO auth_sessions (user_id, token_hash, expires_at, user_agent, ip)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuthSession>(&query)
            .bind(input.user_id)
            .bind(&input.token_hash)
            .bind(input.expires_at)
            .bind(&input.user_agent)
            .bind(&input.ip)
            .fetch_one(pool)
            .await
    }

    /// Find a session by its refresh-token hash, expired or not.
    ///
    /// Expiry is checked by the caller so an expired session can be deleted
    /// and reported distinctly from an unknown token.
    pub async fn find_by_token_hash(
        pool: &PgPool,
        hash: &str,
    ) -> Result<Option<AuthSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM auth_sessions WHERE token_hash = $1");
        sqlx::query_as::<_, AuthSession>(&query)
            .bind(hash)
            .fetch_optional(pool)
            .await
    }

    /// Delete a single session. Returns `true` if a row was removed.
    pub async fn delete_by_id(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all sessions for a user (logout everywhere). Returns the count
    /// of deleted rows.
    pub async fn delete_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Atomically replace `old_id` with a fresh session (refresh rotation).
    ///
    /// Delete and insert commit together, so there is no window in which
    /// the user holds zero or two valid sessions for this device. Returns
    /// `None` when the old row was already gone: of two rotations racing
    /// on the same session, only the one whose DELETE removed the row
    /// inserts a replacement; the other rolls back and mints nothing.
    pub async fn rotate(
        pool: &PgPool,
        old_id: DbId,
        input: &CreateSession,
    ) -> Result<Option<AuthSession>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(old_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            // Lost the race: dropping the transaction rolls back.
            return Ok(None);
        }

        let query = format!(
            "INSERT INTO auth_sessions (user_id, token_hash, expires_at, user_agent, ip)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let session = sqlx::query_as::<_, AuthSession>(&query)
            .bind(input.user_id)
            .bind(&input.token_hash)
            .bind(input.expires_at)
            .bind(&input.user_agent)
            .bind(&input.ip)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(session))
    }

    /// Delete sessions expired at the given instant. Returns the count of
    /// deleted rows. Used by the background sweep.
    pub async fn delete_expired(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
