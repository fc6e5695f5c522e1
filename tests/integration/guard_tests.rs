//! Permission and role guard tests on the campaign routes

use crate::common::{TestApp, TEST_API_KEY};

#[tokio::test]
async fn test_viewer_can_read_campaigns() {
    let app = TestApp::new().await;
    let token = app.login_ok("viewer").await;
    let response = app.authed_get("/api/v1/campaigns", &token).await;
    response.assert_ok();
    let campaigns: Vec<serde_json::Value> = response.json();
    assert!(campaigns.is_empty());
}

#[tokio::test]
async fn test_viewer_cannot_create_campaigns() {
    let app = TestApp::new().await;
    let token = app.login_ok("viewer").await;
    let response = app
        .authed_post_json(
            "/api/v1/campaigns",
            &token,
            serde_json::json!({"name": "Spring Launch"}),
        )
        .await;
    response.assert_forbidden();
    assert_eq!(app.state.campaigns.list().await.len(), 0);
}

#[tokio::test]
async fn test_editor_campaign_lifecycle() {
    let app = TestApp::new().await;
    let token = app.login_ok("editor").await;

    let created = app
        .authed_post_json(
            "/api/v1/campaigns",
            &token,
            serde_json::json!({"name": "Spring Launch", "description": "Q2 push"}),
        )
        .await;
    created.assert_created();
    let campaign: serde_json::Value = created.json();
    assert_eq!(campaign["name"], "Spring Launch");
    assert_eq!(campaign["owner_id"], "editor");
    let id = campaign["id"].as_str().unwrap().to_string();

    let fetched = app
        .authed_get(&format!("/api/v1/campaigns/{}", id), &token)
        .await;
    fetched.assert_ok();

    let deleted = app
        .authed_delete(&format!("/api/v1/campaigns/{}", id), &token)
        .await;
    deleted.assert_ok();

    app.authed_get(&format!("/api/v1/campaigns/{}", id), &token)
        .await
        .assert_not_found();
}

#[tokio::test]
async fn test_viewer_cannot_delete() {
    let app = TestApp::new().await;
    let editor = app.login_ok("editor").await;
    let created = app
        .authed_post_json(
            "/api/v1/campaigns",
            &editor,
            serde_json::json!({"name": "Protected"}),
        )
        .await;
    created.assert_created();
    let id = created.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let viewer = app.login_ok("viewer").await;
    app.authed_delete(&format!("/api/v1/campaigns/{}", id), &viewer)
        .await
        .assert_forbidden();

    // Still there
    app.authed_get(&format!("/api/v1/campaigns/{}", id), &viewer)
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_invalid_campaign_name_rejected() {
    let app = TestApp::new().await;
    let token = app.login_ok("editor").await;
    app.authed_post_json(
        "/api/v1/campaigns",
        &token,
        serde_json::json!({"name": "   "}),
    )
    .await
    .assert_bad_request();
}

#[tokio::test]
async fn test_unknown_campaign_is_not_found() {
    let app = TestApp::new().await;
    let token = app.login_ok("viewer").await;
    app.authed_get(
        "/api/v1/campaigns/00000000-0000-0000-0000-000000000000",
        &token,
    )
    .await
    .assert_not_found();
}

#[tokio::test]
async fn test_api_key_context_has_no_campaign_permissions() {
    // The API-key context carries no grants; guarded routes must deny it
    let app = TestApp::new().await;
    app.bearer_get("/api/v1/campaigns", TEST_API_KEY)
        .await
        .assert_forbidden();
}

#[tokio::test]
async fn test_editor_cannot_reach_admin_surface() {
    let app = TestApp::new().await;
    let token = app.login_ok("editor").await;
    app.authed_get("/api/v1/admin/sessions/editor", &token)
        .await
        .assert_forbidden();
}
