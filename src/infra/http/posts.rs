//! Post form and comment handlers.

use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{Multipart, multipart::MultipartError};
use serde::Deserialize;
use tracing::warn;

use crate::{
    application::{
        comments::CommentOutcome,
        error::HttpError,
        posts::{EditAccess, EditOutcome, ImageUpload, PostFormInput, PostSubmission},
    },
    presentation::views::{
        LayoutChrome, LayoutContext, PostFormTemplate, PostFormView, post_href,
        render_not_found_response, render_template_response,
    },
};

use super::{
    HttpState, MaybeViewer, RequireViewer, auth::login_url, error_response, parse_post_id,
};

const SOURCE: &str = "infra::http::posts";

pub(super) async fn new_post_form(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
) -> Response {
    let chrome = LayoutChrome::for_viewer(Some(&viewer), "New post");
    match state.groups.list().await {
        Ok(groups) => render_form(chrome, PostFormView::create(&groups)),
        Err(err) => error_response(err, chrome),
    }
}

pub(super) async fn create_post(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    mut multipart: Multipart,
) -> Response {
    let chrome = LayoutChrome::for_viewer(Some(&viewer), "New post");
    let input = match read_post_form(&mut multipart).await {
        Ok(input) => input,
        Err(err) => return err.into_response(),
    };
    let (text, group) = (input.text.clone(), input.group.clone());

    match state.posts.create_post(&viewer, input).await {
        Ok(PostSubmission::Saved(_)) => Redirect::to("/").into_response(),
        Ok(PostSubmission::Invalid(errors)) => match state.groups.list().await {
            Ok(groups) => {
                let form = PostFormView::create(&groups).with_submission(
                    &text,
                    group.as_deref(),
                    &errors,
                );
                render_form(chrome, form)
            }
            Err(err) => error_response(err, chrome),
        },
        Err(err) => error_response(err, chrome),
    }
}

pub(super) async fn edit_post_form(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path((username, post_id)): Path<(String, String)>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(Some(&viewer), "Edit post");
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(chrome);
    };

    let item = match state.posts.edit_access(&viewer, &username, post_id).await {
        Ok(EditAccess::Allowed(item)) => item,
        Ok(EditAccess::Forbidden(_)) => {
            return Redirect::to(&post_href(&username, post_id)).into_response();
        }
        Err(err) => return error_response(err, chrome),
    };

    match state.groups.list().await {
        Ok(groups) => render_form(chrome, PostFormView::edit(&item, &groups)),
        Err(err) => error_response(err, chrome),
    }
}

pub(super) async fn edit_post(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path((username, post_id)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Response {
    let chrome = LayoutChrome::for_viewer(Some(&viewer), "Edit post");
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(chrome);
    };
    let input = match read_post_form(&mut multipart).await {
        Ok(input) => input,
        Err(err) => return err.into_response(),
    };
    let (text, group) = (input.text.clone(), input.group.clone());

    match state
        .posts
        .edit_post(&viewer, &username, post_id, input)
        .await
    {
        Ok(EditOutcome::Updated(_)) | Ok(EditOutcome::Forbidden(_)) => {
            Redirect::to(&post_href(&username, post_id)).into_response()
        }
        Ok(EditOutcome::Invalid { item, errors }) => match state.groups.list().await {
            Ok(groups) => {
                let form = PostFormView::edit(&item, &groups).with_submission(
                    &text,
                    group.as_deref(),
                    &errors,
                );
                render_form(chrome, form)
            }
            Err(err) => error_response(err, chrome),
        },
        Err(err) => error_response(err, chrome),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentForm {
    text: String,
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    MaybeViewer(viewer): MaybeViewer,
    Path((username, post_id)): Path<(String, String)>,
    Form(form): Form<CommentForm>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(viewer.as_ref(), "");
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(chrome);
    };
    let post_page = post_href(&username, post_id);

    match state
        .comments
        .add_comment(viewer.as_ref(), &username, post_id, &form.text)
        .await
    {
        Ok(CommentOutcome::DroppedAnonymous) => {
            Redirect::to(&login_url(&post_page)).into_response()
        }
        Ok(CommentOutcome::Created(_)) | Ok(CommentOutcome::DroppedBlank) => {
            Redirect::to(&post_page).into_response()
        }
        Err(err) => error_response(err, chrome),
    }
}

fn render_form(chrome: LayoutChrome, form: PostFormView) -> Response {
    let chrome = chrome.with_title(form.title());
    let view = LayoutContext::new(chrome, form);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

/// Collect the post form fields. A file input left empty by the browser
/// arrives as a part with no filename and no bytes and is treated as absent.
async fn read_post_form(multipart: &mut Multipart) -> Result<PostFormInput, HttpError> {
    let mut input = PostFormInput::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("text") => input.text = field.text().await.map_err(multipart_error)?,
            Some("group") => input.group = Some(field.text().await.map_err(multipart_error)?),
            Some("image") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                if filename.trim().is_empty() && data.is_empty() {
                    continue;
                }
                input.image = Some(ImageUpload { filename, data });
            }
            Some("image-clear") => input.clear_image = true,
            _ => {}
        }
    }

    Ok(input)
}

fn multipart_error(err: MultipartError) -> HttpError {
    let status = err.status();
    warn!(
        target = "yatube::http::posts",
        status = status.as_u16(),
        error = %err,
        "failed to read multipart payload"
    );
    let public_message = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "Upload too large"
    } else {
        "Invalid form submission"
    };
    HttpError::from_error(SOURCE, status, public_message, &err)
}
