//! Post creation and editing with explicit form validation.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    CreatePostParams, GroupsRepo, PostListItem, PostsRepo, PostsWriteRepo, RepoError,
    UpdatePostParams, UsersRepo,
};
use crate::domain::entities::{PostRecord, UserRecord};
use crate::domain::posts::normalize_text;
use crate::infra::uploads::{UploadStorage, UploadStorageError};

pub const FIELD_TEXT: &str = "text";
pub const FIELD_GROUP: &str = "group";
pub const FIELD_IMAGE: &str = "image";

const MSG_REQUIRED: &str = "This field is required.";
const MSG_INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
const MSG_EMPTY_FILE: &str = "The submitted file is empty.";
const MSG_INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Field-level validation messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
}

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Bytes,
}

/// Raw post form input, exactly as submitted.
#[derive(Debug, Clone, Default)]
pub struct PostFormInput {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<ImageUpload>,
    /// `image-clear` checkbox on the edit form.
    pub clear_image: bool,
}

/// Input that passed field validation.
#[derive(Debug, Clone)]
pub struct ValidPostInput {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<ImageUpload>,
    pub clear_image: bool,
}

/// Field checks that need no storage access: required text, group id
/// syntax, and image payload sniffing.
pub fn validate_post_fields(input: &PostFormInput) -> Result<ValidPostInput, FormErrors> {
    let mut errors = FormErrors::default();

    let text = normalize_text(&input.text);
    if text.is_none() {
        errors.add(FIELD_TEXT, MSG_REQUIRED);
    }

    let group_id = parse_group_id(input.group.as_deref()).unwrap_or_else(|_| {
        errors.add(FIELD_GROUP, MSG_INVALID_CHOICE);
        None
    });

    if let Some(image) = input.image.as_ref() {
        if image.data.is_empty() {
            errors.add(FIELD_IMAGE, MSG_EMPTY_FILE);
        } else if !is_recognized_image(&image.data) {
            errors.add(FIELD_IMAGE, MSG_INVALID_IMAGE);
        }
    }

    match text {
        Some(text) if errors.is_empty() => Ok(ValidPostInput {
            text,
            group_id,
            image: input.image.clone(),
            clear_image: input.clear_image,
        }),
        _ => Err(errors),
    }
}

/// Empty selection means "no group"; anything else must be a numeric id.
fn parse_group_id(raw: Option<&str>) -> Result<Option<i64>, ()> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<i64>().map(Some).map_err(|_| ()),
    }
}

fn is_recognized_image(data: &[u8]) -> bool {
    imagesize::blob_size(data)
        .map(|size| size.width > 0 && size.height > 0)
        .unwrap_or(false)
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post {0} not found")]
    UnknownPost(i64),
    #[error("author `{0}` not found")]
    UnknownAuthor(String),
    #[error("failed to store image: {0}")]
    Storage(#[from] UploadStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub enum PostSubmission {
    Saved(PostRecord),
    Invalid(FormErrors),
}

/// Whether the actor may open the edit form for a post.
#[derive(Debug, Clone)]
pub enum EditAccess {
    Allowed(PostListItem),
    /// Someone other than the author; carries the post so the caller can
    /// send them to its read-only page.
    Forbidden(PostListItem),
}

#[derive(Debug, Clone)]
pub enum EditOutcome {
    Updated(PostRecord),
    Forbidden(PostListItem),
    Invalid {
        item: PostListItem,
        errors: FormErrors,
    },
}

#[derive(Clone)]
pub struct PostService {
    users: Arc<dyn UsersRepo>,
    groups: Arc<dyn GroupsRepo>,
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    uploads: Arc<UploadStorage>,
}

impl PostService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        groups: Arc<dyn GroupsRepo>,
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        uploads: Arc<UploadStorage>,
    ) -> Self {
        Self {
            users,
            groups,
            posts,
            posts_write,
            uploads,
        }
    }

    /// Full validation of a post form: field checks plus group existence.
    /// The outer error is a storage failure, the inner one the field report.
    pub async fn validate_form(
        &self,
        input: &PostFormInput,
    ) -> Result<Result<ValidPostInput, FormErrors>, PostError> {
        let checked = validate_post_fields(input);
        let mut errors = match &checked {
            Ok(_) => FormErrors::default(),
            Err(errors) => errors.clone(),
        };

        if !errors.has(FIELD_GROUP)
            && let Ok(Some(group_id)) = parse_group_id(input.group.as_deref())
            && self.groups.find_group_by_id(group_id).await?.is_none()
        {
            errors.add(FIELD_GROUP, MSG_INVALID_CHOICE);
        }

        match checked {
            Ok(valid) if errors.is_empty() => Ok(Ok(valid)),
            _ => Ok(Err(errors)),
        }
    }

    pub async fn create_post(
        &self,
        author: &UserRecord,
        input: PostFormInput,
    ) -> Result<PostSubmission, PostError> {
        let valid = match self.validate_form(&input).await? {
            Ok(valid) => valid,
            Err(errors) => return Ok(PostSubmission::Invalid(errors)),
        };

        let image = match valid.image.as_ref() {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };

        let post = self
            .posts_write
            .create_post(CreatePostParams {
                author_id: author.id,
                text: valid.text,
                group_id: valid.group_id,
                image,
            })
            .await?;

        info!(
            target = "yatube::posts",
            post_id = post.id,
            author = %author.username,
            group_id = ?post.group_id,
            "post created"
        );
        Ok(PostSubmission::Saved(post))
    }

    pub async fn edit_access(
        &self,
        actor: &UserRecord,
        username: &str,
        post_id: i64,
    ) -> Result<EditAccess, PostError> {
        let item = self.load_post(username, post_id).await?;
        if item.post.is_authored_by(actor.id) {
            Ok(EditAccess::Allowed(item))
        } else {
            Ok(EditAccess::Forbidden(item))
        }
    }

    pub async fn edit_post(
        &self,
        actor: &UserRecord,
        username: &str,
        post_id: i64,
        input: PostFormInput,
    ) -> Result<EditOutcome, PostError> {
        let item = match self.edit_access(actor, username, post_id).await? {
            EditAccess::Allowed(item) => item,
            EditAccess::Forbidden(item) => return Ok(EditOutcome::Forbidden(item)),
        };

        let valid = match self.validate_form(&input).await? {
            Ok(valid) => valid,
            Err(errors) => return Ok(EditOutcome::Invalid { item, errors }),
        };

        let previous_image = item.post.image.clone();
        let image = match valid.image.as_ref() {
            Some(upload) => Some(self.store_image(upload).await?),
            None if valid.clear_image => None,
            None => previous_image.clone(),
        };

        let post = self
            .posts_write
            .update_post(UpdatePostParams {
                id: item.post.id,
                text: valid.text,
                group_id: valid.group_id,
                image: image.clone(),
            })
            .await?;

        if let Some(previous) = previous_image
            && image.as_deref() != Some(previous.as_str())
        {
            self.uploads.delete(&previous).await?;
        }

        info!(
            target = "yatube::posts",
            post_id = post.id,
            author = %actor.username,
            "post updated"
        );
        Ok(EditOutcome::Updated(post))
    }

    /// The post `post_id` if it exists and was written by `username`.
    pub async fn load_post(&self, username: &str, post_id: i64) -> Result<PostListItem, PostError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| PostError::UnknownAuthor(username.to_string()))?;
        self.posts
            .find_post(post_id)
            .await?
            .filter(|item| item.post.author_id == author.id)
            .ok_or(PostError::UnknownPost(post_id))
    }

    async fn store_image(&self, upload: &ImageUpload) -> Result<String, PostError> {
        let stored = self
            .uploads
            .store_post_image(&upload.filename, upload.data.clone())
            .await?;
        Ok(stored.stored_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    fn input(text: &str) -> PostFormInput {
        PostFormInput {
            text: text.to_string(),
            ..PostFormInput::default()
        }
    }

    #[test]
    fn blank_text_is_required() {
        let errors = validate_post_fields(&input("   ")).expect_err("blank text rejected");
        assert_eq!(errors.get(FIELD_TEXT), [MSG_REQUIRED.to_string()]);
        assert!(!errors.has(FIELD_GROUP));
    }

    #[test]
    fn text_is_trimmed_and_group_optional() {
        let valid = validate_post_fields(&input("  hello  ")).expect("valid input");
        assert_eq!(valid.text, "hello");
        assert_eq!(valid.group_id, None);
    }

    #[test]
    fn empty_group_value_means_no_group() {
        let mut form = input("text");
        form.group = Some(String::new());
        assert_eq!(validate_post_fields(&form).expect("valid").group_id, None);
    }

    #[test]
    fn malformed_group_is_invalid_choice() {
        let mut form = input("text");
        form.group = Some("cats".into());
        let errors = validate_post_fields(&form).expect_err("group rejected");
        assert!(errors.has(FIELD_GROUP));
        assert!(!errors.has(FIELD_TEXT));
    }

    #[test]
    fn gif_upload_is_accepted() {
        let mut form = input("with image");
        form.image = Some(ImageUpload {
            filename: "small.gif".into(),
            data: Bytes::from_static(SMALL_GIF),
        });
        let valid = validate_post_fields(&form).expect("gif accepted");
        assert!(valid.image.is_some());
    }

    #[test]
    fn non_image_and_empty_uploads_are_rejected() {
        let mut form = input("with image");
        form.image = Some(ImageUpload {
            filename: "notes.txt".into(),
            data: Bytes::from_static(b"just some text"),
        });
        let errors = validate_post_fields(&form).expect_err("text file rejected");
        assert_eq!(errors.get(FIELD_IMAGE), [MSG_INVALID_IMAGE.to_string()]);

        form.image = Some(ImageUpload {
            filename: "empty.gif".into(),
            data: Bytes::new(),
        });
        let errors = validate_post_fields(&form).expect_err("empty file rejected");
        assert_eq!(errors.get(FIELD_IMAGE), [MSG_EMPTY_FILE.to_string()]);
    }

    #[test]
    fn errors_accumulate_across_fields() {
        let mut form = input("");
        form.group = Some("x".into());
        let errors = validate_post_fields(&form).expect_err("invalid");
        assert!(errors.has(FIELD_TEXT));
        assert!(errors.has(FIELD_GROUP));
    }
}
