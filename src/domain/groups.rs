use crate::domain::error::DomainError;

pub const SLUG_MAX_CHARS: usize = 200;
pub const TITLE_MAX_CHARS: usize = 200;

pub fn validate_slug(slug: &str) -> Result<(), DomainError> {
    if slug.is_empty() {
        return Err(DomainError::validation("slug", "must not be empty"));
    }
    if slug.len() > SLUG_MAX_CHARS {
        return Err(DomainError::validation(
            "slug",
            format!("must be at most {SLUG_MAX_CHARS} characters"),
        ));
    }
    if !slug
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(DomainError::validation(
            "slug",
            "may contain only letters, digits, hyphens and underscores",
        ));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), DomainError> {
    let count = title.trim().chars().count();
    if count == 0 {
        return Err(DomainError::validation("title", "must not be empty"));
    }
    if count > TITLE_MAX_CHARS {
        return Err(DomainError::validation(
            "title",
            format!("must be at most {TITLE_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}
