pub mod health;

use axum::{routing::get, Router};

use crate::audit::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/audit/list",
            get(handlers::handle_list_audits).post(handlers::handle_create_audit),
        )
        .route("/audit/:id", get(handlers::handle_get_audit))
        .with_state(state)
}
