use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};

use crate::db::ticker_queries;
use crate::errors::AppError;
use crate::models::TickerRecord;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tickers))
        .route("/:symbol", get(get_ticker))
}

pub async fn list_tickers(State(state): State<AppState>) -> Result<Json<Vec<TickerRecord>>, AppError> {
    info!("GET /api/tickers - Listing tickers");
    let tickers = ticker_queries::fetch_all_tickers(&state.pool)
        .await
        .map_err(|e| {
            error!("Failed to list tickers: {}", e);
            AppError::StoreUnavailable(e)
        })?;
    Ok(Json(tickers))
}

pub async fn get_ticker(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TickerRecord>, AppError> {
    info!("GET /api/tickers/{} - Getting ticker", symbol);
    ticker_queries::fetch_ticker(&state.pool, &symbol)
        .await
        .map_err(|e| {
            error!("Failed to fetch ticker {}: {}", symbol, e);
            AppError::StoreUnavailable(e)
        })?
        .map(Json)
        .ok_or(AppError::NotFound)
}
