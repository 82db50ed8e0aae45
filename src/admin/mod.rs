//! Read-only operator API. Mounted only when `admin.enabled`.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/pending", get(get_pending))
        .route("/admin/intents", get(get_intents))
        .layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
