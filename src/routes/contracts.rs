use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};

use crate::db::contract_queries;
use crate::errors::AppError;
use crate::models::{ContractFilter, ContractSnapshot};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contracts))
}

pub async fn list_contracts(
    Query(filter): Query<ContractFilter>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ContractSnapshot>>, AppError> {
    info!("GET /api/contracts - Querying contracts with {:?}", filter);

    if let (Some(from), Some(to)) = (filter.expiration_from, filter.expiration_to) {
        if from > to {
            return Err(AppError::Validation(format!(
                "expiration_from ({}) is after expiration_to ({})",
                from, to
            )));
        }
    }

    let contracts = contract_queries::query_contracts(&state.pool, &filter)
        .await
        .map_err(|e| {
            error!("Failed to query contracts: {}", e);
            AppError::StoreUnavailable(e)
        })?;

    Ok(Json(contracts))
}
