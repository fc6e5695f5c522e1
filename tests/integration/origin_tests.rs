//! Origin-validation tests against the full pipeline

use axum::body::Body;
use axum::http::Request;

use crate::common::{test_config, TestApp, TEST_ORIGIN};

async fn me_with_headers(app: &TestApp, token: &str, headers: &[(&str, &str)]) -> crate::common::TestResponse {
    let mut builder = Request::builder()
        .method("GET")
        .uri("/api/v1/auth/me")
        .header("Cookie", format!("sessionId={}", token));
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.request(builder.body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn test_allowed_origin_passes() {
    let app = TestApp::new().await;
    let token = app.login_ok("viewer").await;
    me_with_headers(&app, &token, &[("Origin", TEST_ORIGIN)])
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_forged_origin_is_rejected_before_session_lookup() {
    let app = TestApp::new().await;
    let token = app.login_ok("viewer").await;

    let response = me_with_headers(&app, &token, &[("Origin", "https://evil.example")]).await;
    response.assert_forbidden().assert_code("INVALID_ORIGIN");
    // The session cookie may be healthy; it is never cleared on origin failure
    assert!(response.cleared_cookies().is_empty());

    // The session itself survived
    me_with_headers(&app, &token, &[("Origin", TEST_ORIGIN)])
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_missing_origin_and_referer_is_rejected() {
    let app = TestApp::new().await;
    let token = app.login_ok("viewer").await;
    me_with_headers(&app, &token, &[])
        .await
        .assert_forbidden()
        .assert_code("INVALID_ORIGIN");
}

#[tokio::test]
async fn test_referer_prefix_accepted_without_origin() {
    let app = TestApp::new().await;
    let token = app.login_ok("viewer").await;
    let referer = format!("{}/campaigns/42", TEST_ORIGIN);
    me_with_headers(&app, &token, &[("Referer", referer.as_str())])
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_custom_header_fallback() {
    let mut config = test_config();
    config.session.origin.require_custom_header = true;
    config.session.origin.custom_header_pattern = Some("^XMLHttpRequest$".to_string());
    let app = TestApp::with_config(config);
    let token = app.login_ok("viewer").await;

    // Origin and Referer both absent; the custom header carries the proof
    me_with_headers(&app, &token, &[("X-Requested-With", "XMLHttpRequest")])
        .await
        .assert_ok();

    me_with_headers(&app, &token, &[("X-Requested-With", "curl")])
        .await
        .assert_forbidden()
        .assert_code("INVALID_ORIGIN");
}

#[tokio::test]
async fn test_validation_disabled_allows_any_origin() {
    let mut config = test_config();
    config.session.origin.require_validation = false;
    let app = TestApp::with_config(config);
    let token = app.login_ok("viewer").await;

    me_with_headers(&app, &token, &[("Origin", "https://evil.example")])
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_empty_allow_list_derives_from_host() {
    let mut config = test_config();
    config.session.origin.allowed_origins = Vec::new();
    let app = TestApp::with_config(config);
    let token = app.login_ok("viewer").await;

    me_with_headers(
        &app,
        &token,
        &[("Host", "campaignhub.test"), ("Origin", "https://campaignhub.test")],
    )
    .await
    .assert_ok();

    me_with_headers(
        &app,
        &token,
        &[("Host", "campaignhub.test"), ("Origin", "https://evil.example")],
    )
    .await
    .assert_forbidden();
}
