//! Security headers middleware
//!
//! Adds security headers to all responses to protect against common web
//! vulnerabilities, and enforces JSON content types on state-changing
//! requests.

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::utils::error::ErrorResponse;

/// Middleware that adds security headers to all responses
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();

    // Strict-Transport-Security (HSTS)
    // Forces browsers to use HTTPS for all future requests to this domain
    headers.insert(
        "Strict-Transport-Security",
        "max-age=31536000; includeSubDomains".parse().unwrap(),
    );

    // Prevents browsers from MIME-sniffing a response away from the declared content-type
    headers.insert("X-Content-Type-Options", "nosniff".parse().unwrap());

    // The API is never legitimately framed
    headers.insert("X-Frame-Options", "DENY".parse().unwrap());

    // Enables the browser's built-in XSS filter (legacy, but still useful for older browsers)
    headers.insert("X-XSS-Protection", "1; mode=block".parse().unwrap());

    // Controls how much referrer information is included with requests
    headers.insert(
        "Referrer-Policy",
        "strict-origin-when-cross-origin".parse().unwrap(),
    );

    // Restricts which browser features can be used
    headers.insert(
        "Permissions-Policy",
        "accelerometer=(), camera=(), geolocation=(), gyroscope=(), magnetometer=(), microphone=(), payment=(), usb=()"
            .parse()
            .unwrap(),
    );

    // Restrictive CSP; this server only emits JSON, the frontend is served elsewhere
    headers.insert(
        "Content-Security-Policy",
        "default-src 'none'; frame-ancestors 'none'; base-uri 'none'"
            .parse()
            .unwrap(),
    );

    // API responses carry session-derived data; never cache
    headers.insert(
        "Cache-Control",
        "no-store, no-cache, must-revalidate, private".parse().unwrap(),
    );

    response
}

/// Reject state-changing requests with a body that is not declared as JSON.
///
/// Multipart uploads are exempt; requests without a content type (e.g. an
/// empty-body POST) pass through and fail later at extraction if a body was
/// expected.
pub async fn content_type_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method();
    if matches!(*method, Method::POST | Method::PUT | Method::PATCH) {
        if let Some(content_type) = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            let is_json = content_type.starts_with("application/json");
            let is_multipart = content_type.starts_with("multipart/form-data");
            if !is_json && !is_multipart {
                let body = ErrorResponse::new(
                    "unsupported_media_type",
                    "Request body must be application/json",
                );
                return (StatusCode::UNSUPPORTED_MEDIA_TYPE, Json(body)).into_response();
            }
        }
    }
    next.run(request).await
}
