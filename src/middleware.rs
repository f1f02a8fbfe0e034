use axum::http::{HeaderValue, header, Request, StatusCode};
use axum::response::Response;
use axum::middleware::Next;
use axum::body::Body;

use crate::config::Config;

/// sha256 hex of the accepted api key, injected as a request extension
#[derive(Clone, Debug)]
pub struct ApiKeyHash(pub String);

pub const API_KEY_HEADER: &str = "X-API-Key";

// reject requests whose X-API-Key does not hash to the configured value
pub async fn require_api_key(
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let expected = req
        .extensions()
        .get::<ApiKeyHash>()
        .ok_or_else(|| {
            tracing::error!("ApiKeyHash extension missing from api router");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing {} header on {}", API_KEY_HEADER, req.uri().path());
            StatusCode::UNAUTHORIZED
        })?;

    if Config::hash_api_key(provided) != expected.0 {
        tracing::warn!("🚫 Invalid API key for {}", req.uri().path());
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(req).await)
}

/// hardening headers for everything we serve
pub async fn add_security_headers(
    req: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        HeaderValue::from_static("DENY"),
    );
    // qr images come from the external generator
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data: blob: https://api.qrserver.com"),
    );

    response
}
