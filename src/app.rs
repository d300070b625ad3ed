use axum::http::Method;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::routes::{contracts, failures, health, tickers};
use crate::state::AppState;

/// Read-only query surface over the options store.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/contracts", contracts::router())
        .nest("/api/tickers", tickers::router())
        .nest("/api/failures", failures::router())
        .layer(cors)
        .with_state(state)
}
