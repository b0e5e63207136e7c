use crate::domain::error::DomainError;

pub const USERNAME_MAX_CHARS: usize = 150;

/// First path segments claimed by fixed routes; a user with one of these
/// names could never reach their profile.
pub const RESERVED_USERNAMES: &[&str] = &["new", "follow", "group", "auth", "about", "media"];

pub fn validate_username(username: &str) -> Result<(), DomainError> {
    if username.is_empty() {
        return Err(DomainError::validation("username", "must not be empty"));
    }
    if username.chars().count() > USERNAME_MAX_CHARS {
        return Err(DomainError::validation(
            "username",
            format!("must be at most {USERNAME_MAX_CHARS} characters"),
        ));
    }
    if !username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '.' | '@' | '+' | '-' | '_'))
    {
        return Err(DomainError::validation(
            "username",
            "may contain only letters, digits and . @ + - _",
        ));
    }
    if RESERVED_USERNAMES.contains(&username) {
        return Err(DomainError::validation(
            "username",
            format!("`{username}` is reserved"),
        ));
    }
    Ok(())
}
