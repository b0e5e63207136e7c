use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{
    CommentListItem, CommentsRepo, CreateCommentParams, RepoError,
};
use crate::domain::entities::{CommentRecord, UserRecord};

use super::PostgresRepositories;
use super::util::{convert_count, map_sqlx_error};

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    author_id: i64,
    text: String,
    created_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CommentListRow {
    id: i64,
    post_id: i64,
    author_id: i64,
    text: String,
    created_at: OffsetDateTime,
    author_username: String,
    author_created_at: OffsetDateTime,
}

impl From<CommentListRow> for CommentListItem {
    fn from(row: CommentListRow) -> Self {
        Self {
            comment: CommentRecord {
                id: row.id,
                post_id: row.post_id,
                author_id: row.author_id,
                text: row.text,
                created_at: row.created_at,
            },
            author: UserRecord {
                id: row.author_id,
                username: row.author_username,
                created_at: row.author_created_at,
            },
        }
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentListItem>, RepoError> {
        let rows = sqlx::query_as::<_, CommentListRow>(
            "SELECT c.id, c.post_id, c.author_id, c.text, c.created_at, \
             u.username AS author_username, u.created_at AS author_created_at \
             FROM comments c INNER JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = $1 \
             ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(CommentListItem::from).collect())
    }

    async fn count_comments(&self, post_id: i64) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            "INSERT INTO comments (post_id, author_id, text, created_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, post_id, author_id, text, created_at",
        )
        .bind(params.post_id)
        .bind(params.author_id)
        .bind(&params.text)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }
}
