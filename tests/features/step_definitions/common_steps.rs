//! Common step definitions used across features

use cucumber::{given, then};

use crate::common::TestApp;
use crate::features::TestWorld;

#[given("a running API with the standard user registry")]
async fn running_api(world: &mut TestWorld) {
    world.app = Some(TestApp::new().await);
}

#[given(expr = "I am logged in as {string}")]
async fn logged_in_as(world: &mut TestWorld, username: String) {
    let (response, token) = world.app().login(&username).await;
    response.assert_ok();
    world.session_token = Some(token.expect("Login did not set a session cookie"));
}

#[given("I am not logged in")]
async fn not_logged_in(world: &mut TestWorld) {
    world.session_token = None;
}

#[given(expr = "login fails {int} times for {string}")]
async fn failed_logins(world: &mut TestWorld, count: u32, username: String) {
    for _ in 0..count {
        let response = world
            .app()
            .post_json(
                "/api/v1/auth/login",
                serde_json::json!({"username": username, "password": "definitely-wrong"}),
            )
            .await;
        world.last_response = Some(response);
    }
}

#[then(expr = "the response status should be {int}")]
async fn response_status(world: &mut TestWorld, status: u16) {
    assert_eq!(
        world.response().status.as_u16(),
        status,
        "Body: {}",
        world.response().text()
    );
}

#[then(expr = "the error code should be {string}")]
async fn error_code(world: &mut TestWorld, code: String) {
    assert_eq!(world.response().error_code().as_deref(), Some(code.as_str()));
}

#[then("the session cookies should be cleared")]
async fn cookies_cleared(world: &mut TestWorld) {
    assert_eq!(world.response().cleared_cookies().len(), 3);
}

#[then("no cookies should be cleared")]
async fn no_cookies_cleared(world: &mut TestWorld) {
    assert!(world.response().cleared_cookies().is_empty());
}
