//! Session administration tests (admin-only surface)

use crate::common::TestApp;

#[tokio::test]
async fn test_admin_lists_user_sessions() {
    let app = TestApp::new().await;
    let admin = app.login_ok("admin").await;
    let editor = app.login_ok("editor").await;
    let _second = app.login_ok("editor").await;

    let response = app.authed_get("/api/v1/admin/sessions/editor", &admin).await;
    response.assert_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["user_id"], "editor");
    let sessions = body["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    // Listings expose truncated tokens only
    for session in sessions {
        let token = session["session"].as_str().unwrap();
        assert!(token.len() < editor.len());
        assert!(!editor.starts_with(token));
    }
}

#[tokio::test]
async fn test_admin_revokes_all_user_sessions() {
    let app = TestApp::new().await;
    let admin = app.login_ok("admin").await;
    let editor = app.login_ok("editor").await;

    let response = app
        .authed_delete("/api/v1/admin/sessions/editor", &admin)
        .await;
    response.assert_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["revoked"], 1);

    // The editor's session is dead; the admin's survives
    app.authed_get("/api/v1/auth/me", &editor)
        .await
        .assert_unauthorized()
        .assert_code("SESSION_NOT_FOUND");
    app.authed_get("/api/v1/auth/me", &admin).await.assert_ok();
}

#[tokio::test]
async fn test_admin_revokes_single_session_by_token() {
    let app = TestApp::new().await;
    let admin = app.login_ok("admin").await;
    let editor = app.login_ok("editor").await;

    app.authed_post_json(
        "/api/v1/admin/sessions/revoke",
        &admin,
        serde_json::json!({"token": editor}),
    )
    .await
    .assert_ok();

    app.authed_get("/api/v1/auth/me", &editor)
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn test_revoking_unknown_token_is_idempotent() {
    let app = TestApp::new().await;
    let admin = app.login_ok("admin").await;
    app.authed_post_json(
        "/api/v1/admin/sessions/revoke",
        &admin,
        serde_json::json!({"token": "f".repeat(128)}),
    )
    .await
    .assert_ok();
}

#[tokio::test]
async fn test_non_admin_roles_are_denied() {
    let app = TestApp::new().await;
    for username in ["editor", "viewer"] {
        let token = app.login_ok(username).await;
        app.authed_get("/api/v1/admin/sessions/editor", &token)
            .await
            .assert_forbidden();
        app.authed_post_json(
            "/api/v1/admin/sessions/revoke",
            &token,
            serde_json::json!({"token": "f".repeat(128)}),
        )
        .await
        .assert_forbidden();
    }
}
