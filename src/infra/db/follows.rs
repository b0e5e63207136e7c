use async_trait::async_trait;
use sqlx::query;

use crate::application::repos::{FollowsRepo, RepoError};

use super::PostgresRepositories;
use super::util::{convert_count, map_sqlx_error};

#[async_trait]
impl FollowsRepo for PostgresRepositories {
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn count_following(&self, user_id: i64) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    /// Check and insert run under a transaction-scoped advisory lock on the
    /// pair, so concurrent requests for one pair leave a single edge.
    async fn follow_if_absent(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        query("SELECT pg_advisory_xact_lock($1)")
            .bind(follow_lock_key(user_id, author_id))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let inserted = query(
            "INSERT INTO follows (user_id, author_id) \
             SELECT $1, $2 \
             WHERE NOT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(inserted.rows_affected() > 0)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<u64, RepoError> {
        let deleted = query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(deleted.rows_affected())
    }
}

/// Advisory lock key for a (follower, author) pair. Distinct pairs may share
/// a key; that only serializes them.
fn follow_lock_key(user_id: i64, author_id: i64) -> i64 {
    user_id.wrapping_shl(32) ^ author_id
}
