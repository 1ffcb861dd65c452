//! Router configuration for the HTTP server, grounded on the teacher's
//! `routes.rs`: one `Router::new()` with a route per handler, wired to a
//! shared `AppState`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health))
        .route("/ingest", post(handlers::ingest))
        .route("/query", post(handlers::query))
        .route("/documents/:id", get(handlers::get_document))
        .route("/route", post(handlers::route))
        .route("/invoke", post(handlers::invoke))
        .route("/prompts", post(handlers::register_prompt))
        .route("/prompts/render", post(handlers::render_prompt))
        .with_state(state)
}
