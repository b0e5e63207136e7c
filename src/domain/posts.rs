use std::fmt;

use crate::domain::entities::{GroupRecord, PostRecord};

/// Number of characters a post contributes to its display name.
pub const PREVIEW_CHARS: usize = 15;

/// First [`PREVIEW_CHARS`] characters of the post body.
pub fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Trimmed body text, or `None` when nothing but whitespace was supplied.
pub fn normalize_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl PostRecord {
    pub fn preview(&self) -> String {
        preview(&self.text)
    }

    pub fn is_authored_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }
}

impl fmt::Display for PostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview())
    }
}

impl fmt::Display for GroupRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}
