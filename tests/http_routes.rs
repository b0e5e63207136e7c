mod support;

use axum::http::{StatusCode, header};

use support::{MultipartBody, SMALL_GIF, TestApp, body_text, location};

#[tokio::test]
async fn index_lists_posts_and_static_pages_render() {
    let app = TestApp::new();
    let leo = app.user("leo").await;
    app.post(&leo, "hello from leo", None).await;

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("hello from leo"));

    for uri in ["/about/author/", "/about/tech/", "/auth/login/"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn guests_are_sent_to_login_with_next() {
    let app = TestApp::new();
    let leo = app.user("leo").await;
    let post = app.post(&leo, "text", None).await;

    let cases = [
        ("/new/".to_string(), "/auth/login/?next=%2Fnew%2F".to_string()),
        ("/follow/".to_string(), "/auth/login/?next=%2Ffollow%2F".to_string()),
        (
            format!("/leo/{}/edit/", post.id),
            format!("/auth/login/?next=%2Fleo%2F{}%2Fedit%2F", post.id),
        ),
        ("/leo/follow/".to_string(), "/auth/login/?next=%2Fleo%2Ffollow%2F".to_string()),
    ];

    for (uri, expected) in cases {
        let response = app.get(&uri, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), expected);
    }
}

#[tokio::test]
async fn unknown_resources_render_the_not_found_page() {
    let app = TestApp::new();
    let leo = app.user("leo").await;
    let post = app.post(&leo, "text", None).await;
    app.user("ann").await;

    for uri in [
        "/ghost/".to_string(),
        "/group/nope/".to_string(),
        "/leo/abc/".to_string(),
        "/leo/0/".to_string(),
        format!("/ann/{}/", post.id),
        "/leo/9999/".to_string(),
        "/media/posts/missing.gif".to_string(),
        "/media/../Cargo.toml".to_string(),
        "/a/b/c/d/".to_string(),
    ] {
        let response = app.get(&uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn login_sets_cookie_and_logout_revokes_it() {
    let app = TestApp::new();
    app.user("leo").await;
    let issued = app
        .state
        .identity
        .issue_session("leo", None)
        .await
        .expect("issue session");

    let body = format!("token={}&next=%2Ffollow%2F", issued.token);
    let response = app.post_form("/auth/login/", &body, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/follow/");
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("session cookie")
        .to_string();
    assert!(set_cookie.starts_with("yatube_session="));
    assert!(set_cookie.contains("HttpOnly"));

    let cookie = format!("yatube_session={}", issued.token);
    let response = app.get("/new/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.post_form("/auth/logout/", "", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = app.get("/new/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER, "token was revoked");
}

#[tokio::test]
async fn bad_token_rerenders_login_and_offsite_next_is_dropped() {
    let app = TestApp::new();
    app.user("leo").await;

    let response = app
        .post_form("/auth/login/", "token=ys_nope_short", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let issued = app
        .state
        .identity
        .issue_session("leo", None)
        .await
        .expect("issue session");
    let body = format!("token={}&next=https%3A%2F%2Fevil.example", issued.token);
    let response = app.post_form("/auth/login/", &body, None).await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn creating_a_post_redirects_home_and_stores_the_image() {
    let app = TestApp::new();
    let (_, cookie) = app.login("leo").await;
    let group = app.group("cats", "Cats").await;

    let form = MultipartBody::new()
        .text("text", "a cat picture")
        .text("group", &group.id.to_string())
        .file("image", "Small Cat.gif", "image/gif", SMALL_GIF);
    let response = app.post_multipart("/new/", &form, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(app.repos.post_count().await, 1);

    let response = app.get("/group/cats/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("a cat picture"));

    let page = app
        .state
        .feed
        .group_feed("cats", yatube::application::pagination::PageNumber::FIRST)
        .await
        .expect("group feed");
    let image = page.page.items[0]
        .post
        .image
        .clone()
        .expect("stored image path");
    assert!(image.starts_with("posts/"));
    assert!(image.ends_with("small-cat.gif"));

    let response = app.get(&format!("/media/{image}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("image/gif")
    );
}

#[tokio::test]
async fn invalid_post_forms_rerender_with_ok() {
    let app = TestApp::new();
    let (_, cookie) = app.login("leo").await;

    let blank = MultipartBody::new()
        .text("text", "   ")
        .text("group", "")
        .file("image", "", "application/octet-stream", b"");
    let response = app.post_multipart("/new/", &blank, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let not_an_image = MultipartBody::new()
        .text("text", "has text")
        .file("image", "notes.txt", "text/plain", b"plain text, not pixels");
    let response = app
        .post_multipart("/new/", &not_an_image, Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("has text"), "submitted text is kept");

    let unknown_group = MultipartBody::new()
        .text("text", "has text")
        .text("group", "4242");
    let response = app
        .post_multipart("/new/", &unknown_group, Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(app.repos.post_count().await, 0);
}

#[tokio::test]
async fn only_the_author_can_edit() {
    let app = TestApp::new();
    let (leo, leo_cookie) = app.login("leo").await;
    let (_, ann_cookie) = app.login("ann").await;
    let post = app.post(&leo, "original", None).await;
    let edit_uri = format!("/leo/{}/edit/", post.id);
    let post_uri = format!("/leo/{}/", post.id);

    let response = app.get(&edit_uri, Some(&ann_cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), post_uri);

    let form = MultipartBody::new().text("text", "hijacked");
    let response = app.post_multipart(&edit_uri, &form, Some(&ann_cookie)).await;
    assert_eq!(location(&response), post_uri);
    assert_eq!(
        app.repos.post(post.id).await.expect("post").text,
        "original"
    );

    let response = app.get(&edit_uri, Some(&leo_cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let form = MultipartBody::new().text("text", "revised");
    let response = app.post_multipart(&edit_uri, &form, Some(&leo_cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), post_uri);
    assert_eq!(app.repos.post(post.id).await.expect("post").text, "revised");
}

#[tokio::test]
async fn comments_require_a_viewer() {
    let app = TestApp::new();
    let (leo, cookie) = app.login("leo").await;
    let post = app.post(&leo, "discuss", None).await;
    let comment_uri = format!("/leo/{}/comment/", post.id);
    let post_uri = format!("/leo/{}/", post.id);

    let response = app.post_form(&comment_uri, "text=hi", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        format!("/auth/login/?next=%2Fleo%2F{}%2F", post.id)
    );
    assert_eq!(app.repos.comment_count().await, 0);

    let response = app.post_form(&comment_uri, "text=++", Some(&cookie)).await;
    assert_eq!(location(&response), post_uri);
    assert_eq!(app.repos.comment_count().await, 0);

    let response = app
        .post_form(&comment_uri, "text=first+comment", Some(&cookie))
        .await;
    assert_eq!(location(&response), post_uri);
    assert_eq!(app.repos.comment_count().await, 1);

    let body = body_text(app.get(&post_uri, None).await).await;
    assert!(body.contains("first comment"));
}

#[tokio::test]
async fn follow_toggles_redirect_to_the_profile() {
    let app = TestApp::new();
    let (_, cookie) = app.login("leo").await;
    let ann = app.user("ann").await;
    app.post(&ann, "ann writes", None).await;

    let response = app.get("/ann/unfollow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.post_form("/ann/follow/", "", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/ann/");

    let body = body_text(app.get("/follow/", Some(&cookie)).await).await;
    assert!(body.contains("ann writes"));

    let response = app.get("/ann/unfollow/", Some(&cookie)).await;
    assert_eq!(location(&response), "/ann/");

    let body = body_text(app.get("/follow/", Some(&cookie)).await).await;
    assert!(!body.contains("ann writes"));

    let response = app.get("/ghost/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn index_serves_a_stale_snapshot_until_invalidated() {
    let app = TestApp::new();
    let (leo, cookie) = app.login("leo").await;
    app.post(&leo, "before snapshot", None).await;

    let body = body_text(app.get("/", None).await).await;
    assert!(body.contains("before snapshot"));

    let form = MultipartBody::new().text("text", "after snapshot");
    let response = app.post_multipart("/new/", &form, Some(&cookie)).await;
    assert_eq!(location(&response), "/");

    let body = body_text(app.get("/", None).await).await;
    assert!(!body.contains("after snapshot"));

    let body = body_text(app.get("/leo/", None).await).await;
    assert!(body.contains("after snapshot"), "other feeds are not cached");

    app.state.front_page.invalidate();
    let body = body_text(app.get("/", None).await).await;
    assert!(body.contains("after snapshot"));
}
