//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;
mod state;

use axum::http::HeaderName;
use axum::{middleware as axum_middleware, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the application router with every middleware layer applied.
pub fn create_app(state: AppState) -> Router {
    // Layers run last-added first: auth resolves the caller before logging sees it
    let protected = routes::protected_routes()
        .route_layer(axum_middleware::from_fn(middleware::logging_middleware))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let request_id = HeaderName::from_static(middleware::REQUEST_ID_HEADER);

    Router::new()
        .merge(routes::public_routes())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
