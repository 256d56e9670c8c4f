//! API Middleware
//!
//! Authentication and request logging middleware.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::domain::CallerContext;
use crate::error::AppError;
use crate::repository::hash_api_key;

use super::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

// =========================================================================
// API Key Authentication Middleware
// =========================================================================

/// Resolve the `X-API-Key` header into a `CallerContext` request extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|key| !key.is_empty())
        .ok_or(AppError::MissingApiKey)?;

    let record = state
        .api_keys
        .find_by_hash(&hash_api_key(api_key))
        .await
        .inspect_err(|e| tracing::error!(error = %e, "API key lookup failed"))?
        .ok_or(AppError::InvalidApiKey)?;

    if !record.is_active {
        tracing::warn!(api_key_id = %record.id, "Disabled API key used");
        return Err(AppError::ApiKeyDisabled);
    }

    let mut context = CallerContext::new(record.role).with_api_key(record.id);
    if let Some(user_id) = record.user_id {
        context = context.with_user(user_id);
    }
    if let Some(correlation_id) = correlation_id(&headers) {
        context = context.with_correlation_id(correlation_id);
    }
    context.ensure_correlation_id();

    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

/// Correlation ID from `X-Correlation-Id`, falling back to `X-Request-Id`.
fn correlation_id(headers: &HeaderMap) -> Option<Uuid> {
    [CORRELATION_ID_HEADER, REQUEST_ID_HEADER]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|v| v.to_str().ok())
        .find_map(|s| Uuid::parse_str(s).ok())
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["x-api-key", "authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = mask_headers_for_logging(request.headers());

    let caller = request.extensions().get::<CallerContext>();
    let correlation_id = caller.and_then(|ctx| ctx.correlation_id);
    let role = caller.map(|ctx| ctx.role);
    let user_id = caller.and_then(|ctx| ctx.user_id);

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        correlation_id = ?correlation_id,
        role = ?role,
        user_id = ?user_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        correlation_id = ?correlation_id,
        "Request completed"
    );

    response
}
