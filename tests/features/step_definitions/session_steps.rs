//! Steps for session lifecycle scenarios

use axum::body::Body;
use axum::http::Request;
use cucumber::{given, then, when};

use crate::common::{TEST_ORIGIN, TEST_PASSWORD};
use crate::features::TestWorld;

#[when(expr = "I log in as {string} with password {string}")]
async fn log_in_with_password(world: &mut TestWorld, username: String, password: String) {
    let response = world
        .app()
        .post_json(
            "/api/v1/auth/login",
            serde_json::json!({"username": username, "password": password}),
        )
        .await;
    world.session_token = response.cookie("sessionId");
    world.last_response = Some(response);
}

#[when(expr = "I log in as {string} with the correct password")]
async fn log_in_correct(world: &mut TestWorld, username: String) {
    log_in_with_password(world, username, TEST_PASSWORD.to_string()).await;
}

#[when("I request my identity")]
async fn request_identity(world: &mut TestWorld) {
    let response = match &world.session_token {
        Some(token) => world.app().authed_get("/api/v1/auth/me", token).await,
        None => {
            world
                .app()
                .request(
                    Request::builder()
                        .method("GET")
                        .uri("/api/v1/auth/me")
                        .header("Origin", TEST_ORIGIN)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
        }
    };
    world.last_response = Some(response);
}

#[when("I log out")]
async fn log_out(world: &mut TestWorld) {
    let mut builder = Request::builder().method("POST").uri("/api/v1/auth/logout");
    if let Some(token) = &world.session_token {
        builder = builder.header("Cookie", format!("sessionId={}", token));
    }
    let response = world
        .app()
        .request(builder.body(Body::empty()).unwrap())
        .await;
    world.last_response = Some(response);
}

#[when("I refresh my session")]
async fn refresh_session(world: &mut TestWorld) {
    let mut builder = Request::builder().method("POST").uri("/api/v1/auth/refresh");
    if let Some(token) = &world.session_token {
        builder = builder.header("Cookie", format!("sessionId={}", token));
    }
    let response = world
        .app()
        .request(builder.body(Body::empty()).unwrap())
        .await;
    world.last_response = Some(response);
}

#[given("my session token is garbage")]
async fn garbage_token(world: &mut TestWorld) {
    world.session_token = Some("a".repeat(128));
}

#[then("a session cookie should be set")]
async fn session_cookie_set(world: &mut TestWorld) {
    assert!(world.response().cookie("sessionId").is_some());
}

#[then(expr = "the identity should be {string}")]
async fn identity_is(world: &mut TestWorld, user_id: String) {
    let body: serde_json::Value = world.response().json();
    assert_eq!(body["user_id"], user_id.as_str());
}
