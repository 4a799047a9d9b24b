//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers::BatchPolicy;
use crate::store::Store;

pub use routes::create_router;

/// Shared state behind every route: the store handle and the promotion
/// batching levers.
pub struct AppState<S> {
    pub store: Arc<S>,
    pub batch: BatchPolicy,
}

impl<S> AppState<S> {
    pub fn new(store: Arc<S>, batch: BatchPolicy) -> Self {
        Self { store, batch }
    }
}

// Manual impl: derive(Clone) would require S: Clone, but only the Arc is
// cloned.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            batch: self.batch,
        }
    }
}

/// Assemble the full application: authenticated API routes, an open health
/// check, and request tracing.
pub fn app<S: Store + 'static>(state: AppState<S>) -> Router {
    let api = create_router::<S>()
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware::<S>));

    Router::new()
        .merge(api)
        .route("/health", get(health))
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health() -> &'static str {
    "OK"
}
