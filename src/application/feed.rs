use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::{PAGE_SIZE, Page, PageNumber, PageWindow};
use crate::application::repos::{
    CommentListItem, CommentsRepo, FollowsRepo, GroupsRepo, PostListItem, PostScope, PostsRepo,
    RepoError, UsersRepo,
};
use crate::domain::entities::{GroupRecord, UserRecord};

pub type FeedPage = Page<PostListItem>;

/// Which posts a feed draws from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    Global,
    Group(String),
    Author(String),
    /// Posts by authors the viewer follows; `None` is an anonymous viewer.
    Following(Option<i64>),
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group `{0}`")]
    UnknownGroup(String),
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error("post {0} not found")]
    UnknownPost(i64),
    #[error("authentication required")]
    AuthenticationRequired,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: FeedPage,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: UserRecord,
    pub page: FeedPage,
    /// Whether the viewer follows `author`.
    pub following: bool,
    pub followers_count: u64,
    pub following_count: u64,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub item: PostListItem,
    pub comments: Vec<CommentListItem>,
    pub author_posts_count: u64,
}

#[derive(Clone)]
pub struct FeedService {
    users: Arc<dyn UsersRepo>,
    groups: Arc<dyn GroupsRepo>,
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FeedService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        groups: Arc<dyn GroupsRepo>,
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        follows: Arc<dyn FollowsRepo>,
    ) -> Self {
        Self {
            users,
            groups,
            posts,
            comments,
            follows,
        }
    }

    /// Ordered page of posts for `scope`. The page number is clamped into the
    /// available range; [`Page::has_more`] reports whether a later page exists.
    pub async fn compose_feed(
        &self,
        scope: &FeedScope,
        page: PageNumber,
    ) -> Result<FeedPage, FeedError> {
        let scope = self.resolve_scope(scope).await?;
        self.paginate(scope, page).await
    }

    pub async fn group_feed(&self, slug: &str, page: PageNumber) -> Result<GroupFeed, FeedError> {
        let group = self.require_group(slug).await?;
        let page = self.paginate(PostScope::Group(group.id), page).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile_feed(
        &self,
        username: &str,
        viewer: Option<&UserRecord>,
        page: PageNumber,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self.require_author(username).await?;
        let page = self.paginate(PostScope::Author(author.id), page).await?;

        let following = match viewer {
            Some(viewer) if viewer.id != author.id => {
                self.follows.is_following(viewer.id, author.id).await?
            }
            _ => false,
        };
        let followers_count = self.follows.count_followers(author.id).await?;
        let following_count = self.follows.count_following(author.id).await?;

        Ok(ProfileFeed {
            author,
            page,
            following,
            followers_count,
            following_count,
        })
    }

    /// The post `post_id` as published by `username`.
    pub async fn post_detail(&self, username: &str, post_id: i64) -> Result<PostDetail, FeedError> {
        let author = self.require_author(username).await?;
        let item = self
            .posts
            .find_post(post_id)
            .await?
            .filter(|item| item.post.author_id == author.id)
            .ok_or(FeedError::UnknownPost(post_id))?;

        let comments = self.comments.list_comments(item.post.id).await?;
        let author_posts_count = self.posts.count_posts(PostScope::Author(author.id)).await?;

        Ok(PostDetail {
            item,
            comments,
            author_posts_count,
        })
    }

    async fn resolve_scope(&self, scope: &FeedScope) -> Result<PostScope, FeedError> {
        match scope {
            FeedScope::Global => Ok(PostScope::All),
            FeedScope::Group(slug) => Ok(PostScope::Group(self.require_group(slug).await?.id)),
            FeedScope::Author(username) => {
                Ok(PostScope::Author(self.require_author(username).await?.id))
            }
            FeedScope::Following(Some(viewer_id)) => Ok(PostScope::FollowedBy(*viewer_id)),
            FeedScope::Following(None) => Err(FeedError::AuthenticationRequired),
        }
    }

    async fn paginate(&self, scope: PostScope, page: PageNumber) -> Result<FeedPage, FeedError> {
        let total = self.posts.count_posts(scope).await?;
        let window = PageWindow::resolve(page, total, PAGE_SIZE);
        let items = if total == 0 {
            Vec::new()
        } else {
            self.posts
                .list_posts(scope, window.offset(), window.limit())
                .await?
        };
        Ok(Page { items, window })
    }

    async fn require_group(&self, slug: &str) -> Result<GroupRecord, FeedError> {
        self.groups
            .find_group_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::UnknownGroup(slug.to_string()))
    }

    async fn require_author(&self, username: &str) -> Result<UserRecord, FeedError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| FeedError::UnknownAuthor(username.to_string()))
    }
}
