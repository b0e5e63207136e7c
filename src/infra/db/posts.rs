use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, query};
use time::OffsetDateTime;

use crate::application::repos::{
    CreatePostParams, PostListItem, PostScope, PostsRepo, PostsWriteRepo, RepoError,
    UpdatePostParams,
};
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};

use super::PostgresRepositories;
use super::util::{convert_count, map_sqlx_error};

const POST_LIST_SELECT: &str = "SELECT p.id, p.text, p.created_at, p.author_id, p.group_id, \
     p.image, u.username AS author_username, u.created_at AS author_created_at, \
     g.slug AS group_slug, g.title AS group_title, g.description AS group_description \
     FROM posts p \
     INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id \
     WHERE 1=1 ";

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: i64,
    text: String,
    created_at: OffsetDateTime,
    author_id: i64,
    group_id: Option<i64>,
    image: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            created_at: row.created_at,
            author_id: row.author_id,
            group_id: row.group_id,
            image: row.image,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PostListRow {
    id: i64,
    text: String,
    created_at: OffsetDateTime,
    author_id: i64,
    group_id: Option<i64>,
    image: Option<String>,
    author_username: String,
    author_created_at: OffsetDateTime,
    group_slug: Option<String>,
    group_title: Option<String>,
    group_description: Option<String>,
}

impl From<PostListRow> for PostListItem {
    fn from(row: PostListRow) -> Self {
        let group = match (row.group_id, row.group_slug, row.group_title) {
            (Some(id), Some(slug), Some(title)) => Some(GroupRecord {
                id,
                slug,
                title,
                description: row.group_description.unwrap_or_default(),
            }),
            _ => None,
        };
        Self {
            post: PostRecord {
                id: row.id,
                text: row.text,
                created_at: row.created_at,
                author_id: row.author_id,
                group_id: row.group_id,
                image: row.image,
            },
            author: UserRecord {
                id: row.author_id,
                username: row.author_username,
                created_at: row.author_created_at,
            },
            group,
        }
    }
}

impl PostgresRepositories {
    fn apply_post_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: PostScope) {
        match scope {
            PostScope::All => {}
            PostScope::Group(group_id) => {
                qb.push(" AND p.group_id = ");
                qb.push_bind(group_id);
            }
            PostScope::Author(author_id) => {
                qb.push(" AND p.author_id = ");
                qb.push_bind(author_id);
            }
            PostScope::FollowedBy(user_id) => {
                qb.push(" AND p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = ");
                qb.push_bind(user_id);
                qb.push(")");
            }
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_post_scope(&mut qb, scope);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<PostListItem>, RepoError> {
        let offset = i64::try_from(offset).map_err(|_| RepoError::InvalidInput {
            message: "offset exceeds supported range".to_string(),
        })?;

        let mut qb = QueryBuilder::new(POST_LIST_SELECT);
        Self::apply_post_scope(&mut qb, scope);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::from(limit.clamp(1, 100)));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<PostListRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(PostListItem::from).collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostListItem>, RepoError> {
        let mut qb = QueryBuilder::new(POST_LIST_SELECT);
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostListRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(PostListItem::from))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "INSERT INTO posts (text, created_at, author_id, group_id, image) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, text, created_at, author_id, group_id, image",
        )
        .bind(&params.text)
        .bind(OffsetDateTime::now_utc())
        .bind(params.author_id)
        .bind(params.group_id)
        .bind(&params.image)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "UPDATE posts SET text = $2, group_id = $3, image = $4 WHERE id = $1 \
             RETURNING id, text, created_at, author_id, group_id, image",
        )
        .bind(params.id)
        .bind(&params.text)
        .bind(params.group_id)
        .bind(&params.image)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        row.map(PostRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        query("DELETE FROM comments WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let deleted = query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if deleted.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)
    }
}
