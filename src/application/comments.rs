use std::sync::Arc;

use tracing::{debug, info};

use crate::application::posts::PostError;
use crate::application::repos::{CommentsRepo, CreateCommentParams, PostsRepo, UsersRepo};
use crate::domain::entities::{CommentRecord, UserRecord};
use crate::domain::posts::normalize_text;

/// Result of a comment submission. Nothing is stored unless `Created`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentOutcome {
    Created(CommentRecord),
    DroppedAnonymous,
    DroppedBlank,
}

#[derive(Clone)]
pub struct CommentService {
    users: Arc<dyn UsersRepo>,
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl CommentService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            users,
            posts,
            comments,
        }
    }

    /// Attach a comment by `actor` to post `post_id` of `username`.
    ///
    /// Anonymous and blank submissions are dropped without an error so the
    /// caller can redirect the same way in every case.
    pub async fn add_comment(
        &self,
        actor: Option<&UserRecord>,
        username: &str,
        post_id: i64,
        text: &str,
    ) -> Result<CommentOutcome, PostError> {
        let Some(actor) = actor else {
            debug!(target = "yatube::comments", post_id, "anonymous comment dropped");
            return Ok(CommentOutcome::DroppedAnonymous);
        };

        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| PostError::UnknownAuthor(username.to_string()))?;
        let item = self
            .posts
            .find_post(post_id)
            .await?
            .filter(|item| item.post.author_id == author.id)
            .ok_or(PostError::UnknownPost(post_id))?;

        let Some(text) = normalize_text(text) else {
            debug!(target = "yatube::comments", post_id, "blank comment dropped");
            return Ok(CommentOutcome::DroppedBlank);
        };

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: item.post.id,
                author_id: actor.id,
                text,
            })
            .await?;
        info!(
            target = "yatube::comments",
            comment_id = comment.id,
            post_id = item.post.id,
            author = %actor.username,
            "comment created"
        );
        Ok(CommentOutcome::Created(comment))
    }
}
