//! Repository traits describing persistence adapters.
//!
//! Every delete operation applies the entity lifecycle rules itself:
//! removing a user removes their posts, comments, follow edges and sessions;
//! removing a group clears the group reference of its posts; removing a post
//! removes its comments.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{
    CommentRecord, GroupRecord, PostRecord, SessionRecord, UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Candidate set for a post listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Group(i64),
    Author(i64),
    /// Posts whose author is followed by the given user.
    FollowedBy(i64),
}

/// Post joined with the records needed to render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostListItem {
    pub post: PostRecord,
    pub author: UserRecord,
    pub group: Option<GroupRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentListItem {
    pub comment: CommentRecord,
    pub author: UserRecord,
}

#[derive(Debug, Clone)]
pub struct CreateGroupParams {
    pub slug: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub user_id: i64,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait UsersWriteRepo: Send + Sync {
    async fn create_user(&self, username: &str) -> Result<UserRecord, RepoError>;

    /// Cascades to the user's posts (and their comments), comments, follow
    /// edges in both directions, and sessions.
    async fn delete_user(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn find_group_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError>;

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait GroupsWriteRepo: Send + Sync {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError>;

    /// Clears `group_id` on every post of the group, then removes the group.
    async fn delete_group(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError>;

    /// Newest first: `created_at DESC, id DESC`.
    async fn list_posts(
        &self,
        scope: PostScope,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<PostListItem>, RepoError>;

    async fn find_post(&self, id: i64) -> Result<Option<PostListItem>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Removes the post together with its comments.
    async fn delete_post(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Oldest first.
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentListItem>, RepoError>;

    async fn count_comments(&self, post_id: i64) -> Result<u64, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    /// Number of edges pointing at `author_id`.
    async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError>;

    /// Number of edges leaving `user_id`.
    async fn count_following(&self, user_id: i64) -> Result<u64, RepoError>;

    /// Inserts the edge unless one already exists. Returns `true` when a row
    /// was created.
    async fn follow_if_absent(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    /// Deletes every edge for the pair and returns how many were removed.
    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(&self, params: CreateSessionParams)
    -> Result<SessionRecord, RepoError>;

    async fn find_session_by_prefix(&self, prefix: &str)
    -> Result<Option<SessionRecord>, RepoError>;

    async fn delete_session(&self, id: Uuid) -> Result<(), RepoError>;
}
