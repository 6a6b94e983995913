//! HTTP tests for the MyList routes, driven through the full router.


use axum::body::Body;
use axum::http::{Request, StatusCode};
use mylist_core::{ContentId, EntityIdType, EpisodeId, ListPage, UserId};
use serde_json::json;
use test_support::*;

fn page(body: serde_json::Value) -> ListPage {
    serde_json::from_value(body).expect("Failed to parse page")
}

#[tokio::test]
async fn test_add_then_paginate_newest_first() {
    let app = test_app();
    let user = app.user();
    let (a, b) = (app.fixture.inception, app.fixture.interstellar);

    let (status, record) = app.add_movie(a).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["contentType"], "movie");
    assert_eq!(record["snapshot"]["title"], "Inception");
    assert_eq!(app.store.len(), 1);

    let (status, body) = app.list(user, "limit=1").await;
    assert_eq!(status, StatusCode::OK);
    let first = page(body);
    assert_eq!(first.items.len(), 1);
    assert_eq!(first.items[0].content_id, a);
    assert_eq!(first.next_cursor, None);

    let (status, _) = app.add_movie(b).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.list(user, "limit=1").await;
    let newest = page(body);
    assert_eq!(newest.items.len(), 1);
    assert_eq!(newest.items[0].content_id, b);
    let cursor = newest.next_cursor.expect("a second page exists");

    let (status, body) = app.list(user, &cursor_query(1, &cursor)).await;
    assert_eq!(status, StatusCode::OK);
    let older = page(body);
    assert_eq!(older.items.len(), 1);
    assert_eq!(older.items[0].content_id, a);
    assert_eq!(older.next_cursor, None);
}

#[tokio::test]
async fn test_walk_every_page() {
    let app = test_app();
    let user = app.user();
    let movies = app.fixture.add_movies(7);
    for id in &movies {
        let (status, _) = app.add_movie(*id).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let mut seen = Vec::new();
    let mut query = "limit=3".to_string();
    loop {
        let (status, body) = app.list(user, &query).await;
        assert_eq!(status, StatusCode::OK);
        let page = page(body);
        assert!(page.items.len() <= 3);
        mylist_test_utils::assertions::assert_strictly_descending(&page.items);
        seen.extend(page.items.iter().map(|r| r.content_id));
        match page.next_cursor {
            Some(cursor) => query = cursor_query(3, &cursor),
            None => break,
        }
    }

    let expected: Vec<ContentId> = movies.into_iter().rev().collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_duplicate_add_returns_existing_record() {
    let app = test_app();
    let id = app.fixture.inception;

    let (first_status, first) = app.add_movie(id).await;
    let (second_status, second) = app.add_movie(id).await;

    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["addedAt"], second["addedAt"]);
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn test_add_show_episode() {
    let app = test_app();
    let body = json!({
        "contentId": app.fixture.dark,
        "contentType": "show",
        "episodeId": app.fixture.dark_pilot,
    });

    let (status, record) = app.add(app.user(), body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["contentType"], "show");
    assert_eq!(record["episodeId"], json!(app.fixture.dark_pilot));
    assert_eq!(record["snapshot"]["title"], "Dark");
}

#[tokio::test]
async fn test_supplied_snapshot_is_kept() {
    let app = test_app();
    let body = json!({
        "contentId": app.fixture.inception,
        "contentType": "movie",
        "snapshot": {"title": "Inception (Director's Cut)", "genres": ["Heist"]},
    });

    let (status, record) = app.add(app.user(), body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["snapshot"]["title"], "Inception (Director's Cut)");
    assert_eq!(record["snapshot"]["genres"], json!(["Heist"]));
}

#[tokio::test]
async fn test_add_error_codes() {
    let app = test_app();
    let user = app.user();
    let f = &app.fixture;

    let cases = vec![
        (
            json!({"contentId": "nope", "contentType": "movie"}),
            StatusCode::BAD_REQUEST,
            "INVALID_ID",
        ),
        (
            json!({"contentId": f.inception, "contentType": "podcast"}),
            StatusCode::BAD_REQUEST,
            "INVALID_CONTENT_TYPE",
        ),
        (
            json!({"contentId": f.inception, "contentType": "movie", "episodeId": f.dark_pilot}),
            StatusCode::BAD_REQUEST,
            "EPISODE_NOT_ALLOWED",
        ),
        (
            json!({"contentId": f.inception, "contentType": "movie", "snapshot": {"title": "  "}}),
            StatusCode::BAD_REQUEST,
            "INVALID_SNAPSHOT",
        ),
        (
            json!({"contentId": f.inception, "contentType": "movie", "snapshot": {"genres": ["Sci-Fi"]}}),
            StatusCode::BAD_REQUEST,
            "INVALID_SNAPSHOT",
        ),
        (
            json!({"contentId": f.inception}),
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
        ),
        (
            json!({"contentId": f.inception, "contentType": "movie", "snapshot": "Inception"}),
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
        ),
        (
            json!({"contentId": ContentId::now_v7(), "contentType": "movie"}),
            StatusCode::NOT_FOUND,
            "CONTENT_NOT_FOUND",
        ),
        (
            json!({"contentId": f.dark, "contentType": "movie"}),
            StatusCode::NOT_FOUND,
            "CONTENT_NOT_FOUND",
        ),
        (
            json!({"contentId": f.dark, "contentType": "show", "episodeId": EpisodeId::now_v7()}),
            StatusCode::NOT_FOUND,
            "EPISODE_NOT_FOUND",
        ),
        (
            json!({"contentId": f.dark, "contentType": "show", "episodeId": f.severance_pilot}),
            StatusCode::CONFLICT,
            "EPISODE_SHOW_MISMATCH",
        ),
    ];

    for (body, expected_status, expected_code) in cases {
        let (status, response) = app.add(user, body.clone()).await;
        assert_eq!(status, expected_status, "body: {}", body);
        assert_eq!(error_code(&response), expected_code, "body: {}", body);
        assert!(response["message"].as_str().is_some(), "body: {}", body);
    }
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_structured_error() {
    let app = test_app();
    let user = app.user();

    let not_json = Request::builder()
        .uri("/api/v1/mylist")
        .method("POST")
        .header("x-user-id", user.to_string())
        .header("content-type", "application/json")
        .body(Body::from("{\"contentId\": "))
        .expect("Failed to build request");
    let (status, body) = app.send(not_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_REQUEST");

    let no_content_type = Request::builder()
        .uri("/api/v1/mylist")
        .method("POST")
        .header("x-user-id", user.to_string())
        .body(Body::from(
            json!({"contentId": app.fixture.inception, "contentType": "movie"}).to_string(),
        ))
        .expect("Failed to build request");
    let (status, body) = app.send(no_content_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_REQUEST");
}

#[tokio::test]
async fn test_unknown_user_cannot_add() {
    let app = test_app();
    let stranger = UserId::now_v7();
    let (status, body) = app
        .add(
            stranger,
            json!({"contentId": app.fixture.inception, "contentType": "movie"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_user_header_required() {
    let app = test_app();

    let missing = Request::builder()
        .uri("/api/v1/mylist")
        .body(Body::empty())
        .expect("Failed to build request");
    let (status, body) = app.send(missing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "MISSING_USER");

    let malformed = Request::builder()
        .uri("/api/v1/mylist")
        .header("x-user-id", "user-42")
        .body(Body::empty())
        .expect("Failed to build request");
    let (status, body) = app.send(malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_ID");
}

#[tokio::test]
async fn test_remove() {
    let app = test_app();
    let user = app.user();
    let id = app.fixture.inception;
    app.add_movie(id).await;

    let (status, body) = app.remove(user, &id.to_string()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
    assert!(app.store.is_empty());

    let (status, body) = app.remove(user, &id.to_string()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "ITEM_NOT_FOUND");

    let (status, body) = app.remove(user, "not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_ID");
}

#[tokio::test]
async fn test_remove_only_touches_own_list() {
    let app = test_app();
    let other = app.fixture.add_user();
    let id = app.fixture.inception;
    app.add_movie(id).await;

    let (status, _) = app.remove(other, &id.to_string()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn test_invalid_list_parameters() {
    let app = test_app();
    let user = app.user();

    let (status, body) = app.list(user, "cursor=definitely-not-a-cursor").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_CURSOR");

    let (status, body) = app.list(user, "contentType=song").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_CONTENT_TYPE");

    for query in ["limit=abc", "includeTotal=yes"] {
        let (status, body) = app.list(user, query).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "query: {}", query);
        assert_eq!(error_code(&body), "INVALID_REQUEST", "query: {}", query);
    }

    // An empty cursor means the first page.
    let (status, _) = app.list(user, "cursor=").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_limit_is_clamped() {
    let app = test_app();
    let user = app.user();
    for id in app.fixture.add_movies(3) {
        app.add_movie(id).await;
    }

    for query in ["limit=0", "limit=-5", ""] {
        let (status, body) = app.list(user, query).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page(body).items.len(), 3, "query: {}", query);
    }

    let (status, body) = app.list(user, "limit=100000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page(body).next_cursor, None);
}

#[tokio::test]
async fn test_filter_and_total() {
    let app = test_app();
    let user = app.user();
    app.add_movie(app.fixture.inception).await;
    app.add_movie(app.fixture.interstellar).await;
    app.add(user, json!({"contentId": app.fixture.dark, "contentType": "show"}))
        .await;

    let (_, body) = app.list(user, "contentType=show&includeTotal=true").await;
    let shows = page(body);
    assert_eq!(shows.items.len(), 1);
    assert_eq!(shows.items[0].content_id, app.fixture.dark);
    assert_eq!(shows.total, Some(1));

    let (_, body) = app.list(user, "limit=1&includeTotal=true").await;
    let all = page(body);
    assert_eq!(all.items.len(), 1);
    assert_eq!(all.total, Some(3));

    let (_, body) = app.list(user, "limit=1").await;
    assert!(body.get("total").is_none());
}

#[tokio::test]
async fn test_mutations_invalidate_cached_pages() {
    let app = test_app();
    let user = app.user();
    app.add_movie(app.fixture.inception).await;

    let (_, body) = app.list(user, "limit=5").await;
    assert_eq!(page(body).items.len(), 1);

    app.add_movie(app.fixture.interstellar).await;
    let (_, body) = app.list(user, "limit=5").await;
    let after_add = page(body);
    assert_eq!(after_add.items.len(), 2);
    assert_eq!(after_add.items[0].content_id, app.fixture.interstellar);

    app.remove(user, &app.fixture.inception.to_string()).await;
    let (_, body) = app.list(user, "limit=5").await;
    let after_remove = page(body);
    assert_eq!(after_remove.items.len(), 1);
    assert_eq!(after_remove.items[0].content_id, app.fixture.interstellar);
}

#[tokio::test]
async fn test_lists_are_per_user() {
    let app = test_app();
    let other = app.fixture.add_user();
    app.add_movie(app.fixture.inception).await;

    let (_, body) = app.list(other, "").await;
    assert!(page(body).items.is_empty());
}

#[tokio::test]
async fn test_snapshot_survives_catalog_edit() {
    let app = test_app_uncached();
    app.add_movie(app.fixture.inception).await;
    assert!(app
        .fixture
        .catalog
        .rename_movie(app.fixture.inception, "Inception (2010)"));

    let (_, body) = app.list(app.user(), "").await;
    assert_eq!(page(body).items[0].snapshot.title, "Inception");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = test_app();

    let ping = Request::builder()
        .uri("/health/ping")
        .body(Body::empty())
        .expect("Failed to build request");
    let (status, body) = app.send(ping).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "pong");

    let live = Request::builder()
        .uri("/health/live")
        .body(Body::empty())
        .expect("Failed to build request");
    let (status, body) = app.send(live).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let ready = Request::builder()
        .uri("/health/ready")
        .body(Body::empty())
        .expect("Failed to build request");
    let (status, body) = app.send(ready).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["details"]["store"]["status"], "healthy");
    assert_eq!(body["details"]["cache"]["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_and_openapi() {
    let app = test_app();
    app.list(app.user(), "").await;

    let metrics = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .expect("Failed to build request");
    let (status, body) = app.send(metrics).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_str()
        .is_some_and(|text| text.contains("mylist_http_requests_total")));

    let garbage = "zz-metrics-label-check";
    let (status, _) = app.remove(app.user(), garbage).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let metrics = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .expect("Failed to build request");
    let (_, body) = app.send(metrics).await;
    let text = body.as_str().unwrap_or_default();
    assert!(text.contains(r#"path="/api/v1/mylist/:content_id""#));
    assert!(!text.contains(garbage));

    let openapi = Request::builder()
        .uri("/openapi.json")
        .body(Body::empty())
        .expect("Failed to build request");
    let (status, body) = app.send(openapi).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "MyList API");
}
