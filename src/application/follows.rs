//! Author subscriptions.
//!
//! Following is lookup-or-create and ignores self-follows. Unfollowing a user
//! that is not followed reports [`FollowError::NotFollowing`] rather than
//! succeeding silently.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("author `{0}` not found")]
    UnknownAuthor(String),
    #[error("not following `{0}`")]
    NotFollowing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    SelfFollowIgnored,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    pub async fn follow(
        &self,
        viewer: &UserRecord,
        username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.require_author(username).await?;
        if author.id == viewer.id {
            return Ok(FollowOutcome::SelfFollowIgnored);
        }

        if self.follows.follow_if_absent(viewer.id, author.id).await? {
            info!(
                target = "yatube::follows",
                follower = %viewer.username,
                author = %author.username,
                "follow created"
            );
            Ok(FollowOutcome::Created)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    pub async fn unfollow(&self, viewer: &UserRecord, username: &str) -> Result<(), FollowError> {
        let author = self.require_author(username).await?;
        let removed = self.follows.unfollow(viewer.id, author.id).await?;
        if removed == 0 {
            return Err(FollowError::NotFollowing(author.username));
        }
        info!(
            target = "yatube::follows",
            follower = %viewer.username,
            author = %author.username,
            removed,
            "follow removed"
        );
        Ok(())
    }

    async fn require_author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}
