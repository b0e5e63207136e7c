use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{
        feed::FeedError, follows::FollowError, front_page::FrontPageError, groups::GroupError,
        identity::IdentityError, posts::PostError, repos::RepoError,
    },
    domain::error::DomainError,
    infra::error::InfraError,
    presentation::views,
};

/// Diagnostic details attached to failing responses and logged by the
/// response middleware. Never rendered to the client.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            public_message,
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        Self {
            status,
            public_message,
            report: ErrorReport::from_error(source, status, error),
        }
    }

    pub fn internal(source: &'static str, error: &dyn StdError) -> Self {
        Self::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            error,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn into_report(self) -> ErrorReport {
        self.report
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = match views::render_error_page(self.status, self.public_message) {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(_) => (self.status, self.public_message).into_response(),
        };
        self.report.attach(&mut response);
        response
    }
}

impl From<RepoError> for HttpError {
    fn from(error: RepoError) -> Self {
        HttpError::internal("application::error::repo_error", &error)
    }
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        const SOURCE: &str = "application::error::feed_error";
        match error {
            FeedError::UnknownGroup(_) | FeedError::UnknownAuthor(_) | FeedError::UnknownPost(_) => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Page not found", &error)
            }
            FeedError::AuthenticationRequired => HttpError::from_error(
                SOURCE,
                StatusCode::UNAUTHORIZED,
                "Authentication required",
                &error,
            ),
            FeedError::Repo(err) => HttpError::internal(SOURCE, &err),
        }
    }
}

impl From<FrontPageError> for HttpError {
    fn from(error: FrontPageError) -> Self {
        match error {
            FrontPageError::Feed(err) => err.into(),
            FrontPageError::Render(err) => err.into(),
        }
    }
}

impl From<PostError> for HttpError {
    fn from(error: PostError) -> Self {
        const SOURCE: &str = "application::error::post_error";
        match error {
            PostError::UnknownPost(_) | PostError::UnknownAuthor(_) => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Page not found", &error)
            }
            PostError::Storage(_) | PostError::Repo(_) => HttpError::internal(SOURCE, &error),
        }
    }
}

impl From<FollowError> for HttpError {
    fn from(error: FollowError) -> Self {
        const SOURCE: &str = "application::error::follow_error";
        match error {
            FollowError::UnknownAuthor(_) | FollowError::NotFollowing(_) => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Page not found", &error)
            }
            FollowError::Repo(err) => HttpError::internal(SOURCE, &err),
        }
    }
}

impl From<GroupError> for HttpError {
    fn from(error: GroupError) -> Self {
        const SOURCE: &str = "application::error::group_error";
        match error {
            GroupError::UnknownGroup(_) => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Page not found", &error)
            }
            _ => HttpError::internal(SOURCE, &error),
        }
    }
}

impl From<IdentityError> for HttpError {
    fn from(error: IdentityError) -> Self {
        HttpError::internal("application::error::identity_error", &error)
    }
}

/// Top-level failure of a command or of server start-up.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
