//! In-memory repositories and an application harness for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use yatube::application::comments::CommentService;
use yatube::application::feed::FeedService;
use yatube::application::follows::FollowService;
use yatube::application::front_page::FrontPageService;
use yatube::application::groups::{CreateGroupCommand, GroupService};
use yatube::application::identity::IdentityService;
use yatube::application::posts::PostService;
use yatube::application::repos::{
    CommentListItem, CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
    CreateSessionParams, FollowsRepo, GroupsRepo, GroupsWriteRepo, PostListItem, PostScope,
    PostsRepo, PostsWriteRepo, RepoError, SessionsRepo, UpdatePostParams, UsersRepo,
    UsersWriteRepo,
};
use yatube::cache::{CacheConfig, PageCache};
use yatube::domain::entities::{
    CommentRecord, FollowRecord, GroupRecord, PostRecord, SessionRecord, UserRecord,
};
use yatube::infra::http::{self, HttpState, SESSION_COOKIE};
use yatube::infra::uploads::UploadStorage;

/// Smallest valid GIF, accepted by the image sniffing.
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x21, 0xf9,
    0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00,
    0x00, 0x02, 0x00, 0x3b,
];

#[derive(Default)]
struct State {
    next_id: i64,
    ticks: i64,
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    follows: Vec<FollowRecord>,
    sessions: Vec<SessionRecord>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps so ordering is deterministic.
    fn now(&mut self) -> OffsetDateTime {
        self.ticks += 1;
        OffsetDateTime::UNIX_EPOCH + Duration::days(20_000) + Duration::seconds(self.ticks)
    }

    fn user(&self, id: i64) -> Option<UserRecord> {
        self.users.iter().find(|user| user.id == id).cloned()
    }

    fn group(&self, id: i64) -> Option<GroupRecord> {
        self.groups.iter().find(|group| group.id == id).cloned()
    }

    fn in_scope(&self, post: &PostRecord, scope: PostScope) -> bool {
        match scope {
            PostScope::All => true,
            PostScope::Group(group_id) => post.group_id == Some(group_id),
            PostScope::Author(author_id) => post.author_id == author_id,
            PostScope::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|edge| edge.user_id == user_id && edge.author_id == post.author_id),
        }
    }

    fn list_item(&self, post: &PostRecord) -> Option<PostListItem> {
        Some(PostListItem {
            post: post.clone(),
            author: self.user(post.author_id)?,
            group: post.group_id.and_then(|id| self.group(id)),
        })
    }

    fn remove_post(&mut self, id: i64) {
        self.comments.retain(|comment| comment.post_id != id);
        self.posts.retain(|post| post.id != id);
    }
}

/// Every repository trait over one shared, lock-protected state.
#[derive(Default)]
pub struct InMemoryRepos {
    state: Mutex<State>,
}

impl InMemoryRepos {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Force a post's timestamp, e.g. to create ties.
    pub async fn set_post_created_at(&self, post_id: i64, created_at: OffsetDateTime) {
        let mut state = self.state.lock().await;
        if let Some(post) = state.posts.iter_mut().find(|post| post.id == post_id) {
            post.created_at = created_at;
        }
    }

    pub async fn follow_edge_count(&self, user_id: i64, author_id: i64) -> usize {
        self.state
            .lock()
            .await
            .follows
            .iter()
            .filter(|edge| edge.user_id == user_id && edge.author_id == author_id)
            .count()
    }

    pub async fn post(&self, id: i64) -> Option<PostRecord> {
        self.state
            .lock()
            .await
            .posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    pub async fn post_count(&self) -> usize {
        self.state.lock().await.posts.len()
    }

    pub async fn comment_count(&self) -> usize {
        self.state.lock().await.comments.len()
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepos {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.state.lock().await.user(id))
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl UsersWriteRepo for InMemoryRepos {
    async fn create_user(&self, username: &str) -> Result<UserRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|user| user.username == username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let user = UserRecord {
            id: state.next_id(),
            username: username.to_string(),
            created_at: state.now(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let authored: Vec<i64> = state
            .posts
            .iter()
            .filter(|post| post.author_id == id)
            .map(|post| post.id)
            .collect();
        for post_id in authored {
            state.remove_post(post_id);
        }
        state.comments.retain(|comment| comment.author_id != id);
        state
            .follows
            .retain(|edge| edge.user_id != id && edge.author_id != id);
        state.sessions.retain(|session| session.user_id != id);
        state.users.retain(|user| user.id != id);
        Ok(())
    }
}

#[async_trait]
impl GroupsRepo for InMemoryRepos {
    async fn find_group_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self.state.lock().await.group(id))
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .state
            .lock()
            .await
            .groups
            .iter()
            .find(|group| group.slug == slug)
            .cloned())
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.state.lock().await.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

#[async_trait]
impl GroupsWriteRepo for InMemoryRepos {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }
        let group = GroupRecord {
            id: state.next_id(),
            slug: params.slug,
            title: params.title,
            description: params.description,
        };
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn delete_group(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        for post in state.posts.iter_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        state.groups.retain(|group| group.id != id);
        Ok(())
    }
}

#[async_trait]
impl PostsRepo for InMemoryRepos {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .posts
            .iter()
            .filter(|post| state.in_scope(post, scope))
            .count() as u64)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<PostListItem>, RepoError> {
        let state = self.state.lock().await;
        let mut posts: Vec<&PostRecord> = state
            .posts
            .iter()
            .filter(|post| state.in_scope(post, scope))
            .collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter_map(|post| state.list_item(post))
            .collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostListItem>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .posts
            .iter()
            .find(|post| post.id == id)
            .and_then(|post| state.list_item(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryRepos {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let post = PostRecord {
            id: state.next_id(),
            text: params.text,
            created_at: state.now(),
            author_id: params.author_id,
            group_id: params.group_id,
            image: params.image,
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        self.state.lock().await.remove_post(id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for InMemoryRepos {
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentListItem>, RepoError> {
        let state = self.state.lock().await;
        let mut comments: Vec<&CommentRecord> = state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(comments
            .into_iter()
            .filter_map(|comment| {
                Some(CommentListItem {
                    comment: comment.clone(),
                    author: state.user(comment.author_id)?,
                })
            })
            .collect())
    }

    async fn count_comments(&self, post_id: i64) -> Result<u64, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .count() as u64)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        if !state.posts.iter().any(|post| post.id == params.post_id) {
            return Err(RepoError::Integrity {
                message: "comment references a missing post".to_string(),
            });
        }
        let comment = CommentRecord {
            id: state.next_id(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: state.now(),
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for InMemoryRepos {
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self
            .state
            .lock()
            .await
            .follows
            .iter()
            .any(|edge| edge.user_id == user_id && edge.author_id == author_id))
    }

    async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError> {
        Ok(self
            .state
            .lock()
            .await
            .follows
            .iter()
            .filter(|edge| edge.author_id == author_id)
            .count() as u64)
    }

    async fn count_following(&self, user_id: i64) -> Result<u64, RepoError> {
        Ok(self
            .state
            .lock()
            .await
            .follows
            .iter()
            .filter(|edge| edge.user_id == user_id)
            .count() as u64)
    }

    async fn follow_if_absent(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.lock().await;
        if state
            .follows
            .iter()
            .any(|edge| edge.user_id == user_id && edge.author_id == author_id)
        {
            return Ok(false);
        }
        let id = state.next_id();
        state.follows.push(FollowRecord {
            id,
            user_id,
            author_id,
        });
        Ok(true)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<u64, RepoError> {
        let mut state = self.state.lock().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|edge| !(edge.user_id == user_id && edge.author_id == author_id));
        Ok((before - state.follows.len()) as u64)
    }
}

#[async_trait]
impl SessionsRepo for InMemoryRepos {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let mut state = self.state.lock().await;
        let session = SessionRecord {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_session_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<SessionRecord>, RepoError> {
        Ok(self
            .state
            .lock()
            .await
            .sessions
            .iter()
            .find(|session| session.prefix == prefix)
            .cloned())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), RepoError> {
        self.state
            .lock()
            .await
            .sessions
            .retain(|session| session.id != id);
        Ok(())
    }
}

pub fn feed_service(repos: &Arc<InMemoryRepos>) -> FeedService {
    FeedService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
    )
}

pub fn identity_service(repos: &Arc<InMemoryRepos>) -> IdentityService {
    IdentityService::new(repos.clone(), repos.clone(), repos.clone())
}

/// Fully wired router over in-memory storage and a temporary media root.
pub struct TestApp {
    pub repos: Arc<InMemoryRepos>,
    pub state: HttpState,
    pub router: Router,
    _media: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_cache(CacheConfig::default())
    }

    pub fn with_cache(cache: CacheConfig) -> Self {
        let repos = InMemoryRepos::new();
        let media = tempfile::tempdir().expect("media dir");
        let uploads =
            Arc::new(UploadStorage::new(media.path().to_path_buf()).expect("upload storage"));

        let feed = feed_service(&repos);
        let front_page = FrontPageService::new(feed.clone(), Arc::new(PageCache::new(&cache)));
        let state = HttpState {
            feed: Arc::new(feed),
            front_page: Arc::new(front_page),
            posts: Arc::new(PostService::new(
                repos.clone(),
                repos.clone(),
                repos.clone(),
                repos.clone(),
                uploads.clone(),
            )),
            comments: Arc::new(CommentService::new(
                repos.clone(),
                repos.clone(),
                repos.clone(),
            )),
            follows: Arc::new(FollowService::new(repos.clone(), repos.clone())),
            groups: Arc::new(GroupService::new(repos.clone(), repos.clone())),
            identity: Arc::new(identity_service(&repos)),
            uploads,
            upload_limit: 1024 * 1024,
            cookie_secure: false,
        };
        let router = http::build_router(state.clone());

        Self {
            repos,
            state,
            router,
            _media: media,
        }
    }

    pub async fn user(&self, username: &str) -> UserRecord {
        self.state
            .identity
            .create_user(username)
            .await
            .expect("create user")
    }

    /// Create `username` and return a `Cookie` header value for them.
    pub async fn login(&self, username: &str) -> (UserRecord, String) {
        let user = match self.state.identity.find_user(username).await.expect("lookup") {
            Some(user) => user,
            None => self.user(username).await,
        };
        let issued = self
            .state
            .identity
            .issue_session(username, Some(Duration::days(1)))
            .await
            .expect("issue session");
        (user, format!("{SESSION_COOKIE}={}", issued.token))
    }

    pub async fn group(&self, slug: &str, title: &str) -> GroupRecord {
        self.state
            .groups
            .create(CreateGroupCommand {
                slug: slug.to_string(),
                title: title.to_string(),
                description: format!("About {title}"),
            })
            .await
            .expect("create group")
    }

    pub async fn post(&self, author: &UserRecord, text: &str, group: Option<&GroupRecord>) -> PostRecord {
        self.repos
            .create_post(CreatePostParams {
                author_id: author.id,
                text: text.to_string(),
                group_id: group.map(|group| group.id),
                image: None,
            })
            .await
            .expect("create post")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).expect("request"))
            .await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::from(body.to_string())).expect("request"))
            .await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        form: &MultipartBody,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, form.content_type());
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::from(form.to_bytes())).expect("request"))
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
}

const BOUNDARY: &str = "yatube-test-boundary";

/// Hand-assembled `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBody {
    parts: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.parts.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.parts.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.parts.extend_from_slice(data);
        self.parts.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut body = self.parts.clone();
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }
}
