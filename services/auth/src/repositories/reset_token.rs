//! Password reset token repository for database operations
//!
//! `expires_at` and `created_at` live in `TIMESTAMP` columns without a zone and
//! always hold UTC. Rows are normalised to `DateTime<Utc>` on the way out and
//! instants are written as naive UTC on the way in.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::ResetTokenStore;
use crate::models::{NewResetToken, ResetToken};

/// Interpret a zone-less stored instant as UTC
pub fn assume_utc(stored: NaiveDateTime) -> DateTime<Utc> {
    stored.and_utc()
}

#[derive(Debug, FromRow)]
struct ResetTokenRow {
    id: Uuid,
    user_id: Uuid,
    token: String,
    expires_at: NaiveDateTime,
    used: bool,
    created_at: NaiveDateTime,
}

impl From<ResetTokenRow> for ResetToken {
    fn from(row: ResetTokenRow) -> Self {
        ResetToken {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            expires_at: assume_utc(row.expires_at),
            used: row.used,
            created_at: assume_utc(row.created_at),
        }
    }
}

/// PostgreSQL-backed reset token repository
#[derive(Clone)]
pub struct ResetTokenRepository {
    pool: PgPool,
}

impl ResetTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetTokenStore for ResetTokenRepository {
    async fn insert(&self, new_token: &NewResetToken) -> DatabaseResult<ResetToken> {
        let row = sqlx::query_as::<_, ResetTokenRow>(
            r#"
            INSERT INTO password_reset_tokens (id, user_id, token, expires_at, used, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING id, user_id, token, expires_at, used, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_token.user_id)
        .bind(&new_token.token)
        .bind(new_token.expires_at.naive_utc())
        .bind(Utc::now().naive_utc())
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(row.into())
    }

    async fn find_by_token(&self, token: &str) -> DatabaseResult<Option<ResetToken>> {
        let row = sqlx::query_as::<_, ResetTokenRow>(
            r#"
            SELECT id, user_id, token, expires_at, used, created_at
            FROM password_reset_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(row.map(ResetToken::from))
    }

    async fn redeem(
        &self,
        token: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<Uuid>> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::Connection)?;

        // The conditional update is the only gate: concurrent redeemers block on
        // the row lock and then see used = TRUE.
        let claimed: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE password_reset_tokens
            SET used = TRUE
            WHERE token = $1 AND used = FALSE AND expires_at > $2
            RETURNING user_id
            "#,
        )
        .bind(token)
        .bind(now.naive_utc())
        .fetch_optional(&mut *tx)
        .await
        .map_err(DatabaseError::from_query)?;

        let Some(user_id) = claimed else {
            debug!("Reset token was not claimable");
            tx.rollback().await.map_err(DatabaseError::from_query)?;
            return Ok(None);
        };

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_query)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(DatabaseError::from_query)?;
            return Ok(None);
        }

        tx.commit().await.map_err(DatabaseError::from_query)?;
        info!("Password reset token redeemed for user {}", user_id);
        Ok(Some(user_id))
    }

    async fn mark_all_used(&self, user_id: Uuid) -> DatabaseResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE password_reset_tokens
            SET used = TRUE
            WHERE user_id = $1 AND used = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(result.rows_affected())
    }

    async fn list_all(&self) -> DatabaseResult<Vec<ResetToken>> {
        let rows = sqlx::query_as::<_, ResetTokenRow>(
            r#"
            SELECT id, user_id, token, expires_at, used, created_at
            FROM password_reset_tokens
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(rows.into_iter().map(ResetToken::from).collect())
    }

    async fn delete(&self, ids: &[Uuid]) -> DatabaseResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        Ok(result.rows_affected())
    }
}
