//! Router setup.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::correlator::Correlator;
use crate::handlers;

/// Application configuration for the edge router.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Enable request tracing.
    pub enable_tracing: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            enable_tracing: true,
        }
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct EdgeState {
    pub correlator: Arc<Correlator>,
}

/// Build the full route table.
pub fn create_app(state: EdgeState, config: AppConfig) -> Router {
    let app = Router::new()
        // Liveness: edge-local, and through the core.
        .route("/ping", get(handlers::ping))
        .route("/ping-core", get(handlers::ping_core))
        // Auth
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/refresh-token", post(handlers::auth::refresh_token))
        .route(
            "/api/auth/change-password",
            post(handlers::auth::change_password),
        )
        // Classes
        .route("/api/classes", get(handlers::classes::get_classes))
        .route(
            "/api/me/classes",
            get(handlers::classes::get_me_classes).post(handlers::classes::post_me_classes),
        )
        .route(
            "/api/me/classes/:id",
            get(handlers::classes::get_class_details)
                .put(handlers::classes::put_class)
                .delete(handlers::classes::delete_class),
        )
        .route("/api/me/classes/:id/owner", get(handlers::classes::get_class_owner))
        .route("/api/me/classes/:id/name", get(handlers::classes::get_class_name))
        .route(
            "/api/me/classes/:id/description",
            get(handlers::classes::get_class_description),
        )
        .route(
            "/api/me/classes/:id/bigNote",
            get(handlers::classes::get_class_bignote),
        )
        .route("/api/me/classes/:id/title", get(handlers::classes::get_class_title))
        // Notes
        .route(
            "/api/me/classes/:id/upload-note",
            post(handlers::notes::upload_note),
        )
        .route(
            "/api/me/classes/:id/bigNote/edit-note",
            put(handlers::notes::edit_note),
        )
        .route(
            "/api/me/classes/:id/bigNote/history",
            get(handlers::notes::history),
        )
        .route(
            "/api/me/classes/:id/bigNote/export",
            get(handlers::notes::export),
        )
        .with_state(state);

    if config.enable_tracing {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    }
}
