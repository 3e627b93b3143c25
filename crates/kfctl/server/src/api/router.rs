//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use kfctl_types::{CREATE_DEPLOYMENT_PATH, HEALTH_PATH};
use tower_http::trace::TraceLayer;

/// Create the router.
///
/// The health route is always present; the create route only once
/// endpoints have been registered.
pub fn create_router(state: AppState, with_deployments: bool, max_body_size: usize) -> Router {
    let mut router = Router::new().route(HEALTH_PATH, get(handlers::health_check));

    if with_deployments {
        router = router.route(CREATE_DEPLOYMENT_PATH, post(handlers::create_deployment));
    }

    router
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
