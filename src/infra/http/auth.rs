//! Viewer extractors backed by the session cookie.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{Uri, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use url::form_urlencoded;

use crate::domain::entities::UserRecord;

pub const SESSION_COOKIE: &str = "yatube_session";
pub const LOGIN_PATH: &str = "/auth/login/";

/// Request extension set by the viewer middleware.
#[derive(Debug, Clone)]
pub(super) struct CurrentViewer(pub(super) Option<UserRecord>);

/// The signed-in user, if any.
#[derive(Debug, Clone)]
pub struct MaybeViewer(pub Option<UserRecord>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeViewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let viewer = parts
            .extensions
            .get::<CurrentViewer>()
            .and_then(|current| current.0.clone());
        Ok(Self(viewer))
    }
}

/// The signed-in user. Guests are redirected to the login page with the
/// requested location in `next`.
#[derive(Debug, Clone)]
pub struct RequireViewer(pub UserRecord);

impl<S: Send + Sync> FromRequestParts<S> for RequireViewer {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts
            .extensions
            .get::<CurrentViewer>()
            .and_then(|current| current.0.clone())
        {
            Some(user) => Ok(Self(user)),
            None => Err(login_redirect(&parts.uri).into_response()),
        }
    }
}

pub fn login_redirect(uri: &Uri) -> Redirect {
    let next = uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or("/");
    Redirect::to(&login_url(next))
}

pub fn login_url(next: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={encoded}")
}

/// Local redirect target from a `next` parameter; anything that could leave
/// the site falls back to `/`.
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(value)
            if value.starts_with('/') && !value.starts_with("//") && !value.contains('\\') =>
        {
            value.to_string()
        }
        _ => "/".to_string(),
    }
}
