use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::error;

use crate::db::fetch_failure_queries::{self, TickerFetchFailure};
use crate::errors::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_failures))
}

/// Symbols whose most recent poll failed, newest first.
pub async fn list_failures(State(state): State<AppState>) -> Result<Json<Vec<TickerFetchFailure>>, AppError> {
    let failures = fetch_failure_queries::list_fetch_failures(&state.pool)
        .await
        .map_err(|e| {
            error!("Failed to list fetch failures: {}", e);
            AppError::StoreUnavailable(e)
        })?;
    Ok(Json(failures))
}
