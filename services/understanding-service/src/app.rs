use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::understand;
use crate::state::AppState;

/// Every path and method lands on the collector; it sorts out the rest itself.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(understand)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
