//! Route definitions for the API server

use crate::{handlers, state::AppState};
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Collection path for managed groups
pub const MANAGED_GROUPS_PATH: &str = "/v1/managed-groups";

/// Create the application router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            MANAGED_GROUPS_PATH,
            get(handlers::list_managed_groups).post(handlers::create_managed_group),
        )
        .route(
            &format!("{}/:id", MANAGED_GROUPS_PATH),
            get(handlers::get_managed_group)
                .patch(handlers::update_managed_group)
                .delete(handlers::delete_managed_group),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
