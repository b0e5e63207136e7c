//! Public HTML surface: routing, shared state and request middleware.

mod auth;
mod feeds;
mod media;
mod middleware;
mod pages;
mod posts;
mod session;

pub use auth::{MaybeViewer, RequireViewer, SESSION_COOKIE};

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{
    application::{
        comments::CommentService, error::HttpError, feed::FeedService, follows::FollowService,
        front_page::FrontPageService, groups::GroupService, identity::IdentityService,
        posts::PostService,
    },
    infra::uploads::UploadStorage,
    presentation::views::{LayoutChrome, render_not_found_response},
};

use self::middleware::{log_responses, resolve_viewer, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub front_page: Arc<FrontPageService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub follows: Arc<FollowService>,
    pub groups: Arc<GroupService>,
    pub identity: Arc<IdentityService>,
    pub uploads: Arc<UploadStorage>,
    /// Maximum accepted request body in bytes.
    pub upload_limit: usize,
    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
}

pub fn build_router(state: HttpState) -> Router {
    let upload_limit = state.upload_limit;

    Router::new()
        .route("/", get(feeds::index))
        .route("/follow/", get(feeds::follow_index))
        .route("/group/{slug}/", get(feeds::group_posts))
        .route("/new/", get(posts::new_post_form).post(posts::create_post))
        .route("/auth/login/", get(session::login_form).post(session::login))
        .route("/auth/logout/", post(session::logout))
        .route("/about/author/", get(pages::about_author))
        .route("/about/tech/", get(pages::about_tech))
        .route("/media/{*path}", get(media::serve_media))
        .route("/{username}/", get(feeds::profile))
        .route(
            "/{username}/follow/",
            get(feeds::follow_author).post(feeds::follow_author),
        )
        .route(
            "/{username}/unfollow/",
            get(feeds::unfollow_author).post(feeds::unfollow_author),
        )
        .route("/{username}/{post_id}/", get(feeds::post_detail))
        .route(
            "/{username}/{post_id}/edit/",
            get(posts::edit_post_form).post(posts::edit_post),
        )
        .route("/{username}/{post_id}/comment/", post(posts::add_comment))
        .fallback(pages::not_found)
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            resolve_viewer,
        ))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

/// Not-found failures become the themed 404 page; everything else goes
/// through [`HttpError`]'s own rendering.
fn error_response(err: impl Into<HttpError>, chrome: LayoutChrome) -> Response {
    let err = err.into();
    if err.status() != StatusCode::NOT_FOUND {
        return err.into_response();
    }

    let report = err.into_report();
    let mut response = render_not_found_response(chrome);
    report.attach(&mut response);
    response
}

/// Path segment that must be a post id. Anything else is a missing page.
fn parse_post_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}
