//! Users and their login sessions.
//!
//! Session tokens are opaque: `ys_<prefix>_<secret>`. Only the SHA-256 of the
//! secret is persisted and lookups go through the prefix.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    CreateSessionParams, RepoError, SessionsRepo, UsersRepo, UsersWriteRepo,
};
use crate::domain::entities::UserRecord;
use crate::domain::error::DomainError;
use crate::domain::users::validate_username;

const TOKEN_PREFIX: &str = "ys";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
    #[error("user `{0}` not found")]
    UnknownUser(String),
    #[error("session lifetime reaches past the supported date range")]
    TtlOutOfRange,
}

#[derive(Debug, Error)]
pub enum SessionAuthError {
    #[error("invalid session token")]
    Invalid,
    #[error("expired session token")]
    Expired,
    /// The session store could not be asked; the token itself may be fine.
    #[error("session store unavailable")]
    Unavailable(#[source] RepoError),
}

#[derive(Debug, Clone)]
pub struct SessionIssued {
    pub user: UserRecord,
    pub token: String,
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UsersRepo>,
    users_write: Arc<dyn UsersWriteRepo>,
    sessions: Arc<dyn SessionsRepo>,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        users_write: Arc<dyn UsersWriteRepo>,
        sessions: Arc<dyn SessionsRepo>,
    ) -> Self {
        Self {
            users,
            users_write,
            sessions,
        }
    }

    pub async fn create_user(&self, username: &str) -> Result<UserRecord, IdentityError> {
        let username = username.trim();
        validate_username(username)?;

        if self.users.find_user_by_username(username).await?.is_some() {
            return Err(IdentityError::UsernameTaken(username.to_string()));
        }

        let user = match self.users_write.create_user(username).await {
            Ok(user) => user,
            Err(RepoError::Duplicate { .. }) => {
                return Err(IdentityError::UsernameTaken(username.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        info!(target = "yatube::identity", user_id = user.id, username = %user.username, "user created");
        Ok(user)
    }

    pub async fn delete_user(&self, username: &str) -> Result<(), IdentityError> {
        let user = self.require_user(username).await?;
        self.users_write.delete_user(user.id).await?;
        info!(target = "yatube::identity", user_id = user.id, username = %user.username, "user deleted");
        Ok(())
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, IdentityError> {
        Ok(self.users.find_user_by_username(username).await?)
    }

    /// Issue a new session for `username`. `ttl` of `None` never expires.
    pub async fn issue_session(
        &self,
        username: &str,
        ttl: Option<Duration>,
    ) -> Result<SessionIssued, IdentityError> {
        let user = self.require_user(username).await?;

        let prefix = generate_prefix();
        let secret = generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");
        let expires_at = match ttl {
            Some(ttl) => Some(
                OffsetDateTime::now_utc()
                    .checked_add(ttl)
                    .ok_or(IdentityError::TtlOutOfRange)?,
            ),
            None => None,
        };

        self.sessions
            .create_session(CreateSessionParams {
                user_id: user.id,
                prefix,
                hashed_secret: hash_secret(&secret),
                expires_at,
            })
            .await?;

        Ok(SessionIssued {
            user,
            token,
            expires_at,
        })
    }

    pub async fn authenticate(&self, token: &str) -> Result<UserRecord, SessionAuthError> {
        let parsed = parse_token(token).ok_or(SessionAuthError::Invalid)?;
        let record = self
            .sessions
            .find_session_by_prefix(&parsed.prefix)
            .await
            .map_err(SessionAuthError::Unavailable)?
            .ok_or(SessionAuthError::Invalid)?;

        let hashed_input = hash_secret(&parsed.secret);
        if record.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(SessionAuthError::Invalid);
        }

        if let Some(expires_at) = record.expires_at
            && expires_at <= OffsetDateTime::now_utc()
        {
            return Err(SessionAuthError::Expired);
        }

        self.users
            .find_user_by_id(record.user_id)
            .await
            .map_err(SessionAuthError::Unavailable)?
            .ok_or(SessionAuthError::Invalid)
    }

    /// Forget the session behind `token`. Unknown tokens are ignored.
    pub async fn revoke(&self, token: &str) -> Result<(), IdentityError> {
        let Some(parsed) = parse_token(token) else {
            return Ok(());
        };
        if let Some(record) = self.sessions.find_session_by_prefix(&parsed.prefix).await?
            && record.hashed_secret.ct_eq(&hash_secret(&parsed.secret)).unwrap_u8() == 1
        {
            self.sessions.delete_session(record.id).await?;
        }
        Ok(())
    }

    async fn require_user(&self, username: &str) -> Result<UserRecord, IdentityError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| IdentityError::UnknownUser(username.to_string()))
    }
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_prefix() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

struct ParsedToken {
    prefix: String,
    secret: String,
}

fn parse_token(token: &str) -> Option<ParsedToken> {
    let mut parts = token.trim().splitn(3, '_');
    if parts.next()? != TOKEN_PREFIX {
        return None;
    }
    let prefix = parts.next()?;
    let secret = parts.next()?;
    if prefix.is_empty() || secret.len() < MIN_SECRET_LEN {
        return None;
    }
    Some(ParsedToken {
        prefix: prefix.to_string(),
        secret: secret.to_string(),
    })
}
