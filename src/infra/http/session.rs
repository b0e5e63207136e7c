//! Login with an issued session token, and logout.

use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::{info, warn};

use crate::application::{error::HttpError, identity::SessionAuthError};
use crate::domain::entities::UserRecord;
use crate::presentation::views::{
    LayoutChrome, LayoutContext, LoginTemplate, LoginView, render_template_response,
};

use super::{HttpState, MaybeViewer, SESSION_COOKIE, auth::safe_next};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginForm {
    token: String,
    next: Option<String>,
}

pub(super) async fn login_form(
    MaybeViewer(viewer): MaybeViewer,
    Query(query): Query<LoginQuery>,
) -> Response {
    render_login(viewer.as_ref(), safe_next(query.next.as_deref()), None)
}

pub(super) async fn login(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref());
    let token = form.token.trim();

    match state.identity.authenticate(token).await {
        Ok(user) => {
            info!(target = "yatube::http::session", username = %user.username, "login");
            let cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(state.cookie_secure);
            (jar.add(cookie), Redirect::to(&next)).into_response()
        }
        Err(SessionAuthError::Unavailable(err)) => {
            HttpError::internal("infra::http::session::login", &err).into_response()
        }
        Err(err) => {
            warn!(target = "yatube::http::session", error = %err, "login rejected");
            render_login(None, next, Some(err.to_string()))
        }
    }
}

pub(super) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && let Err(err) = state.identity.revoke(cookie.value()).await
    {
        warn!(target = "yatube::http::session", error = %err, "failed to revoke session");
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/")).into_response()
}

fn render_login(
    viewer: Option<&UserRecord>,
    next: String,
    error: Option<String>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(viewer, "Log in");
    let view = LayoutContext::new(chrome, LoginView { next, error });
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}
