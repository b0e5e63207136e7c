use axum::{http::StatusCode, response::Response};

use crate::domain::entities::UserRecord;
use crate::presentation::views::{
    AboutTemplate, AboutView, LayoutChrome, LayoutContext, render_not_found_response,
    render_template_response,
};

use super::MaybeViewer;

pub(super) async fn about_author(MaybeViewer(viewer): MaybeViewer) -> Response {
    render_about(viewer.as_ref(), AboutView::author())
}

pub(super) async fn about_tech(MaybeViewer(viewer): MaybeViewer) -> Response {
    render_about(viewer.as_ref(), AboutView::tech())
}

pub(super) async fn not_found(MaybeViewer(viewer): MaybeViewer) -> Response {
    render_not_found_response(LayoutChrome::for_viewer(viewer.as_ref(), ""))
}

fn render_about(viewer: Option<&UserRecord>, content: AboutView) -> Response {
    let chrome = LayoutChrome::for_viewer(viewer, content.heading.clone());
    let view = LayoutContext::new(chrome, content);
    render_template_response(AboutTemplate { view }, StatusCode::OK)
}
