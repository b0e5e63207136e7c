use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::{FeedPage, PostDetail, ProfileFeed};
use crate::application::posts::{FIELD_GROUP, FIELD_IMAGE, FIELD_TEXT, FormErrors};
use crate::application::repos::{CommentListItem, PostListItem};
use crate::domain::entities::{GroupRecord, UserRecord};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

const SITE_TITLE: &str = "Yatube";
const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:long] [year]");
const DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:long] [year] [hour]:[minute]");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome.with_title(content.title.clone()), content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Error page body for [`HttpError`]. Rendered with anonymous chrome since
/// the failing request's viewer is not known at that point.
pub fn render_error_page(status: StatusCode, message: &str) -> Result<String, TemplateRenderError> {
    let content = ErrorPageView::for_status(status, message);
    let chrome = LayoutChrome::for_viewer(None, content.title.clone());
    ErrorTemplate {
        view: LayoutContext::new(chrome, content),
    }
    .render()
    .map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_error_page",
            "Template rendering failed",
            err,
        )
    })
}

/// Render the post list and paginator of `page`. Paginator links point at
/// `base_path` with a `page` query parameter.
pub fn render_feed_fragment(
    page: &FeedPage,
    base_path: &str,
) -> Result<String, TemplateRenderError> {
    FeedFragmentTemplate {
        feed: FeedView::from_page(page, base_path),
    }
    .render()
    .map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_feed_fragment",
            "Feed rendering failed",
            err,
        )
    })
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
}

#[derive(Clone)]
pub struct NavigationView {
    pub entries: Vec<NavigationLinkView>,
}

#[derive(Clone)]
pub struct ViewerView {
    pub username: String,
    pub profile_href: String,
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
}

/// Per-request page furniture: brand, navigation and login state.
#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub viewer: Option<ViewerView>,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    pub fn for_viewer(viewer: Option<&UserRecord>, title: impl Into<String>) -> Self {
        let mut entries = vec![
            link("Home", "/"),
            link("About the author", "/about/author/"),
            link("Technologies", "/about/tech/"),
        ];
        if viewer.is_some() {
            entries.push(link("Subscriptions", "/follow/"));
            entries.push(link("New post", "/new/"));
        }

        Self {
            brand: BrandView {
                title: SITE_TITLE.to_string(),
                href: "/".to_string(),
            },
            navigation: NavigationView { entries },
            viewer: viewer.map(|user| ViewerView {
                username: user.username.clone(),
                profile_href: profile_href(&user.username),
            }),
            meta: PageMetaView {
                title: page_title(&title.into()),
            },
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            meta: PageMetaView {
                title: page_title(&title.into()),
            },
            ..self
        }
    }
}

fn link(label: &str, href: &str) -> NavigationLinkView {
    NavigationLinkView {
        label: label.to_string(),
        href: href.to_string(),
    }
}

fn page_title(title: &str) -> String {
    if title.is_empty() {
        SITE_TITLE.to_string()
    } else {
        format!("{title} | {SITE_TITLE}")
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub viewer: Option<ViewerView>,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            viewer: chrome.viewer,
            meta: chrome.meta,
            content,
        }
    }
}

pub fn profile_href(username: &str) -> String {
    format!("/{username}/")
}

pub fn post_href(username: &str, post_id: i64) -> String {
    format!("/{username}/{post_id}/")
}

pub fn group_href(slug: &str) -> String {
    format!("/group/{slug}/")
}

pub fn media_href(stored_path: &str) -> String {
    format!("/media/{stored_path}")
}

fn format_date(value: OffsetDateTime) -> String {
    value.format(DATE_FORMAT).unwrap_or_default()
}

fn format_datetime(value: OffsetDateTime) -> String {
    value.format(DATETIME_FORMAT).unwrap_or_default()
}

#[derive(Clone)]
pub struct GroupBadgeView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PostCardView {
    pub id: i64,
    pub author: String,
    pub author_href: String,
    pub text: String,
    pub published: String,
    pub group: Option<GroupBadgeView>,
    pub image_url: Option<String>,
    pub detail_href: String,
}

impl PostCardView {
    pub fn from_item(item: &PostListItem) -> Self {
        let username = &item.author.username;
        Self {
            id: item.post.id,
            author: username.clone(),
            author_href: profile_href(username),
            text: item.post.text.clone(),
            published: format_date(item.post.created_at),
            group: item.group.as_ref().map(|group| GroupBadgeView {
                title: group.title.clone(),
                href: group_href(&group.slug),
            }),
            image_url: item.post.image.as_deref().map(media_href),
            detail_href: post_href(username, item.post.id),
        }
    }
}

#[derive(Clone)]
pub struct PageLinkView {
    pub number: u32,
    pub href: String,
    pub current: bool,
}

#[derive(Clone)]
pub struct PaginatorView {
    pub number: u32,
    pub num_pages: u32,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub pages: Vec<PageLinkView>,
}

impl PaginatorView {
    fn from_page(page: &FeedPage, base_path: &str) -> Self {
        let window = page.window;
        let href = |number: u32| format!("{base_path}?page={number}");
        Self {
            number: window.number,
            num_pages: window.num_pages,
            previous_href: window.previous_number().map(href),
            next_href: window.next_number().map(href),
            pages: (1..=window.num_pages)
                .map(|number| PageLinkView {
                    number,
                    href: href(number),
                    current: number == window.number,
                })
                .collect(),
        }
    }

    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }
}

#[derive(Clone)]
pub struct FeedView {
    pub posts: Vec<PostCardView>,
    pub paginator: PaginatorView,
}

impl FeedView {
    pub fn from_page(page: &FeedPage, base_path: &str) -> Self {
        Self {
            posts: page.items.iter().map(PostCardView::from_item).collect(),
            paginator: PaginatorView::from_page(page, base_path),
        }
    }
}

#[derive(Template)]
#[template(path = "partials/feed.html")]
pub struct FeedFragmentTemplate {
    pub feed: FeedView,
}

/// Page content wrapping a pre-rendered feed fragment.
pub struct IndexView {
    pub heading: String,
    pub feed_html: String,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexView>,
}

pub struct GroupView {
    pub title: String,
    pub description: String,
    pub feed_html: String,
}

impl GroupView {
    pub fn new(group: &GroupRecord, feed_html: String) -> Self {
        Self {
            title: group.title.clone(),
            description: group.description.clone(),
            feed_html,
        }
    }
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupView>,
}

pub struct ProfileView {
    pub username: String,
    pub posts_count: u64,
    pub followers_count: u64,
    pub following_count: u64,
    pub following: bool,
    /// Follow controls are hidden for guests and on one's own profile.
    pub show_follow_controls: bool,
    pub follow_href: String,
    pub unfollow_href: String,
    pub feed_html: String,
}

impl ProfileView {
    pub fn new(profile: &ProfileFeed, viewer: Option<&UserRecord>, feed_html: String) -> Self {
        let username = profile.author.username.clone();
        Self {
            posts_count: profile.page.window.total,
            followers_count: profile.followers_count,
            following_count: profile.following_count,
            following: profile.following,
            show_follow_controls: viewer.is_some_and(|viewer| viewer.id != profile.author.id),
            follow_href: format!("/{username}/follow/"),
            unfollow_href: format!("/{username}/unfollow/"),
            feed_html,
            username,
        }
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

pub struct CommentView {
    pub author: String,
    pub author_href: String,
    pub text: String,
    pub published: String,
}

impl CommentView {
    fn from_item(item: &CommentListItem) -> Self {
        Self {
            author: item.author.username.clone(),
            author_href: profile_href(&item.author.username),
            text: item.comment.text.clone(),
            published: format_datetime(item.comment.created_at),
        }
    }
}

pub struct PostDetailView {
    pub post: PostCardView,
    pub author_posts_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub can_comment: bool,
    pub edit_href: String,
    pub comment_action: String,
}

impl PostDetailView {
    pub fn new(detail: &PostDetail, viewer: Option<&UserRecord>) -> Self {
        let post = PostCardView::from_item(&detail.item);
        Self {
            author_posts_count: detail.author_posts_count,
            comments: detail.comments.iter().map(CommentView::from_item).collect(),
            can_edit: viewer.is_some_and(|viewer| detail.item.post.is_authored_by(viewer.id)),
            can_comment: viewer.is_some(),
            edit_href: format!("{}edit/", post.detail_href),
            comment_action: format!("{}comment/", post.detail_href),
            post,
        }
    }

    pub fn title(&self) -> String {
        crate::domain::posts::preview(&self.post.text)
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct GroupOptionView {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

pub struct PostFormView {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOptionView>,
    pub no_group_selected: bool,
    pub current_image: Option<String>,
    pub text_errors: Vec<String>,
    pub group_errors: Vec<String>,
    pub image_errors: Vec<String>,
}

impl PostFormView {
    /// Blank creation form.
    pub fn create(groups: &[GroupRecord]) -> Self {
        Self::build(false, "/new/".to_string(), String::new(), None, groups)
    }

    /// Edit form pre-filled from the stored post.
    pub fn edit(item: &PostListItem, groups: &[GroupRecord]) -> Self {
        let selected = item.post.group_id.map(|id| id.to_string());
        let mut view = Self::build(
            true,
            format!("{}edit/", post_href(&item.author.username, item.post.id)),
            item.post.text.clone(),
            selected.as_deref(),
            groups,
        );
        view.current_image = item.post.image.as_deref().map(media_href);
        view
    }

    /// Re-render after a failed submission, keeping what the user typed.
    pub fn with_submission(
        mut self,
        text: &str,
        group: Option<&str>,
        errors: &FormErrors,
    ) -> Self {
        let selected = group.map(str::trim).unwrap_or_default();
        for option in &mut self.groups {
            option.selected = option.id.to_string() == selected;
        }
        self.no_group_selected = !self.groups.iter().any(|option| option.selected);
        self.text = text.to_string();
        self.text_errors = errors.get(FIELD_TEXT).to_vec();
        self.group_errors = errors.get(FIELD_GROUP).to_vec();
        self.image_errors = errors.get(FIELD_IMAGE).to_vec();
        self
    }

    fn build(
        is_edit: bool,
        action: String,
        text: String,
        selected_group: Option<&str>,
        groups: &[GroupRecord],
    ) -> Self {
        let selected = selected_group.unwrap_or_default();
        let groups: Vec<GroupOptionView> = groups
            .iter()
            .map(|group| GroupOptionView {
                id: group.id,
                title: group.title.clone(),
                selected: group.id.to_string() == selected,
            })
            .collect();

        Self {
            is_edit,
            action,
            text,
            no_group_selected: !groups.iter().any(|option| option.selected),
            groups,
            current_image: None,
            text_errors: Vec::new(),
            group_errors: Vec::new(),
            image_errors: Vec::new(),
        }
    }

    pub fn title(&self) -> &'static str {
        if self.is_edit { "Edit post" } else { "New post" }
    }
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

pub struct LoginView {
    pub next: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

pub struct AboutView {
    pub heading: String,
    pub paragraphs: Vec<String>,
}

impl AboutView {
    pub fn author() -> Self {
        Self {
            heading: "About the author".to_string(),
            paragraphs: vec![
                "Yatube is a small community blog: write posts, join groups and follow the authors you like.".to_string(),
                "Each author has a profile page listing their posts and subscriber counts.".to_string(),
            ],
        }
    }

    pub fn tech() -> Self {
        Self {
            heading: "Technologies".to_string(),
            paragraphs: vec![
                "Pages are rendered on the server with askama templates and served by axum.".to_string(),
                "Posts, groups, comments and subscriptions live in PostgreSQL, accessed through sqlx.".to_string(),
                "The front page feed is cached for a short time, so new posts may take a few seconds to appear.".to_string(),
            ],
        }
    }
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub view: LayoutContext<AboutView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub status: u16,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page not found".to_string(),
            status: StatusCode::NOT_FOUND.as_u16(),
            message: "The page you requested does not exist.".to_string(),
        }
    }

    pub fn for_status(status: StatusCode, message: &str) -> Self {
        if status == StatusCode::NOT_FOUND {
            return Self::not_found();
        }
        Self {
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            status: status.as_u16(),
            message: message.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
