use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use super::extract::ApiQuery;
use super::ok;
use crate::error::ApiResult;
use crate::registry::TransactionFilter;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<TransactionFilter>,
) -> Json<Value> {
    ok(state.registry.list_transactions(&filter).await)
}

pub async fn get(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(ok(state.registry.get_transaction(&transaction_id).await?))
}
