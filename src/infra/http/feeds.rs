//! Read-side pages: feeds, profiles, post detail, and the follow toggles.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    application::{feed::FeedScope, pagination::PageQuery},
    presentation::views::{
        GroupTemplate, GroupView, IndexTemplate, IndexView, LayoutChrome, LayoutContext,
        PostDetailView, PostTemplate, ProfileTemplate, ProfileView, group_href, profile_href,
        render_feed_fragment, render_not_found_response, render_template_response,
    },
};

use super::{HttpState, MaybeViewer, RequireViewer, error_response, parse_post_id};

pub(super) async fn index(
    State(state): State<HttpState>,
    MaybeViewer(viewer): MaybeViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(viewer.as_ref(), "");

    match state
        .front_page
        .get_or_render_global_feed(query.page_number())
        .await
    {
        Ok(rendered) => {
            let content = IndexView {
                heading: "Latest posts".to_string(),
                feed_html: rendered.html.to_string(),
            };
            let view = LayoutContext::new(chrome, content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => error_response(err, chrome),
    }
}

pub(super) async fn follow_index(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(Some(&viewer), "Subscriptions");
    let scope = FeedScope::Following(Some(viewer.id));

    let page = match state.feed.compose_feed(&scope, query.page_number()).await {
        Ok(page) => page,
        Err(err) => return error_response(err, chrome),
    };
    let feed_html = match render_feed_fragment(&page, "/follow/") {
        Ok(html) => html,
        Err(err) => return error_response(err, chrome),
    };

    let content = IndexView {
        heading: "Posts by authors you follow".to_string(),
        feed_html,
    };
    let view = LayoutContext::new(chrome, content);
    render_template_response(IndexTemplate { view }, StatusCode::OK)
}

pub(super) async fn group_posts(
    State(state): State<HttpState>,
    MaybeViewer(viewer): MaybeViewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(viewer.as_ref(), "");

    let group_feed = match state.feed.group_feed(&slug, query.page_number()).await {
        Ok(feed) => feed,
        Err(err) => return error_response(err, chrome),
    };
    let feed_html = match render_feed_fragment(&group_feed.page, &group_href(&slug)) {
        Ok(html) => html,
        Err(err) => return error_response(err, chrome),
    };

    let chrome = chrome.with_title(group_feed.group.title.clone());
    let view = LayoutContext::new(chrome, GroupView::new(&group_feed.group, feed_html));
    render_template_response(GroupTemplate { view }, StatusCode::OK)
}

pub(super) async fn profile(
    State(state): State<HttpState>,
    MaybeViewer(viewer): MaybeViewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(viewer.as_ref(), "");

    let profile = match state
        .feed
        .profile_feed(&username, viewer.as_ref(), query.page_number())
        .await
    {
        Ok(profile) => profile,
        Err(err) => return error_response(err, chrome),
    };
    let feed_html = match render_feed_fragment(&profile.page, &profile_href(&username)) {
        Ok(html) => html,
        Err(err) => return error_response(err, chrome),
    };

    let chrome = chrome.with_title(format!("Profile of {}", profile.author.username));
    let content = ProfileView::new(&profile, viewer.as_ref(), feed_html);
    let view = LayoutContext::new(chrome, content);
    render_template_response(ProfileTemplate { view }, StatusCode::OK)
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    MaybeViewer(viewer): MaybeViewer,
    Path((username, post_id)): Path<(String, String)>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(viewer.as_ref(), "");
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(chrome);
    };

    match state.feed.post_detail(&username, post_id).await {
        Ok(detail) => {
            let content = PostDetailView::new(&detail, viewer.as_ref());
            let chrome = chrome.with_title(content.title());
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostTemplate { view }, StatusCode::OK)
        }
        Err(err) => error_response(err, chrome),
    }
}

pub(super) async fn follow_author(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(username): Path<String>,
) -> Response {
    match state.follows.follow(&viewer, &username).await {
        Ok(_) => Redirect::to(&profile_href(&username)).into_response(),
        Err(err) => error_response(err, LayoutChrome::for_viewer(Some(&viewer), "")),
    }
}

pub(super) async fn unfollow_author(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(username): Path<String>,
) -> Response {
    match state.follows.unfollow(&viewer, &username).await {
        Ok(()) => Redirect::to(&profile_href(&username)).into_response(),
        Err(err) => error_response(err, LayoutChrome::for_viewer(Some(&viewer), "")),
    }
}
