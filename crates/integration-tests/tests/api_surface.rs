//! HTTP-level checks: the envelope shape, session cookies, and guard
//! behavior through the real router.

use std::sync::Arc;

use api_adapters::{router, AppState, SessionManager};
use auth_adapters::ArgonPasswordHasher;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use services::communities::CommunityService;
use services::content::ContentService;
use services::feed::FeedService;
use services::roles::RoleService;
use services::topics::TopicService;
use services::users::UserService;
use services::votes::VoteService;
use storage_adapters::{LocalMediaStore, MemoryStore, TracingMailer};
use tower::ServiceExt;
use uuid::Uuid;

fn app() -> Router {
    let store = Arc::new(MemoryStore::new());
    let media_root = std::env::temp_dir().join(format!("warren-api-{}", Uuid::new_v4()));
    let state = AppState {
        content: Arc::new(ContentService::new(store.clone(), store.clone())),
        feed: Arc::new(FeedService::new(store.clone(), store.clone(), store.clone())),
        votes: Arc::new(VoteService::new(store.clone(), store.clone())),
        roles: Arc::new(RoleService::new(store.clone(), store.clone())),
        communities: Arc::new(CommunityService::new(
            store.clone(),
            store.clone(),
            store.clone(),
        )),
        topics: Arc::new(TopicService::new(store.clone())),
        users: Arc::new(UserService::new(
            store.clone(),
            Arc::new(ArgonPasswordHasher::new()),
            store.clone(),
            Arc::new(TracingMailer::new()),
        )),
        sessions: Arc::new(SessionManager::new(store.clone())),
        media: Arc::new(LocalMediaStore::new(media_root, "/static/media".into())),
    };
    router(state)
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, cookie, body)
}

async fn register(app: &Router, username: &str) -> String {
    let (status, cookie, body) = send(
        app,
        json_request(
            "POST",
            "/api/register",
            None,
            json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "hunter22",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    assert_eq!(body["data"]["username"], username);
    cookie.expect("register must set a session cookie")
}

#[tokio::test]
async fn register_sets_a_session_cookie_and_me_resolves_it() {
    let app = app();
    let cookie = register(&app, "alice").await;

    let (status, _, body) = send(
        &app,
        json_request("GET", "/api/me", Some(&cookie), Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
}

#[tokio::test]
async fn invalid_registration_returns_field_errors() {
    let app = app();
    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/api/register",
            None,
            json!({ "username": "x", "email": "nope", "password": "!" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn guarded_routes_reject_anonymous_callers() {
    let app = app();
    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/api/communities",
            None,
            json!({ "name": "cats", "description": "", "topicIds": [] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errors"][0]["field"], "auth");
}

#[tokio::test]
async fn community_post_and_feed_roundtrip() {
    let app = app();
    let cookie = register(&app, "alice").await;

    let (status, _, topic) = send(
        &app,
        json_request(
            "POST",
            "/api/topics",
            Some(&cookie),
            json!({ "title": "pets" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let topic_id = topic["data"]["id"].as_str().unwrap().to_string();

    let (status, _, community) = send(
        &app,
        json_request(
            "POST",
            "/api/communities",
            Some(&cookie),
            json!({ "name": "cats", "description": "cat pictures", "topicIds": [topic_id] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(community["data"]["totalMemberships"], 1);
    let community_id = community["data"]["community"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, _, post) = send(
        &app,
        json_request(
            "POST",
            "/api/posts/text",
            Some(&cookie),
            json!({ "title": "hi", "text": "hello", "communityId": community_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["data"]["item"]["kind"], "TEXT_POST");
    let post_id = post["data"]["item"]["id"].as_str().unwrap().to_string();

    let (status, _, feed) = send(
        &app,
        json_request("GET", "/api/feed?limit=10", None, Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["data"]["hasMore"], false);
    assert_eq!(feed["data"]["items"][0]["id"], post_id.as_str());

    // Unknown posts come back as data: null, not an error.
    let (status, _, missing) = send(
        &app,
        json_request(
            "GET",
            &format!("/api/posts/{}", Uuid::now_v7()),
            None,
            Value::Null,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(missing["data"].is_null());
}

#[tokio::test]
async fn duplicate_community_names_conflict_over_http() {
    let app = app();
    let cookie = register(&app, "alice").await;

    let (_, _, topic) = send(
        &app,
        json_request(
            "POST",
            "/api/topics",
            Some(&cookie),
            json!({ "title": "pets" }),
        ),
    )
    .await;
    let topic_id = topic["data"]["id"].as_str().unwrap().to_string();

    let create = |cookie: String, topic_id: String| {
        json_request(
            "POST",
            "/api/communities",
            Some(&cookie),
            json!({ "name": "cats", "description": "", "topicIds": [topic_id] }),
        )
    };
    let (status, _, _) = send(&app, create(cookie.clone(), topic_id.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(&app, create(cookie, topic_id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errors"][0]["field"], "name");
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = app();
    let cookie = register(&app, "alice").await;

    let (status, cleared, _) = send(
        &app,
        json_request("POST", "/api/logout", Some(&cookie), Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared.as_deref(), Some("sid="));

    let (status, _, _) = send(
        &app,
        json_request("GET", "/api/me", Some(&cookie), Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
