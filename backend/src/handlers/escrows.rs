use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::extract::ApiJson;
use super::{created, ok};
use crate::error::ApiResult;
use crate::fabric::{number_arg, ESCROW_CONTRACT};
use crate::models::{EscrowAction, NewEscrow};
use crate::registry::{new_escrow_record, require_text};
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    ApiJson(new_escrow): ApiJson<NewEscrow>,
) -> ApiResult<Json<Value>> {
    let escrow = new_escrow_record(new_escrow)?;
    state.registry.ensure_escrow_absent(&escrow.escrow_id).await?;

    state
        .fabric
        .submit(
            ESCROW_CONTRACT,
            "CreateEscrow",
            &[
                escrow.escrow_id.clone(),
                escrow.property_id.clone(),
                escrow.buyer.clone(),
                escrow.seller.clone(),
                number_arg(escrow.amount),
            ],
        )
        .await?;

    let escrow = state.registry.create_escrow(escrow).await?;
    let id = escrow.escrow_id.clone();
    Ok(created("escrowId", &id, escrow))
}

pub async fn list(State(state): State<AppState>) -> Json<Value> {
    ok(state.registry.list_escrows().await)
}

pub async fn get(
    State(state): State<AppState>,
    Path(escrow_id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(ok(state.registry.get_escrow(&escrow_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashRequest {
    #[serde(alias = "txHash")]
    transaction_hash: String,
}

async fn transition(
    state: AppState,
    escrow_id: String,
    action: EscrowAction,
    request: HashRequest,
) -> ApiResult<Json<Value>> {
    require_text("transactionHash", &request.transaction_hash)?;
    state.registry.check_escrow(&escrow_id, action).await?;
    state
        .fabric
        .submit(
            ESCROW_CONTRACT,
            action.chaincode_function(),
            &[escrow_id.clone(), request.transaction_hash.clone()],
        )
        .await?;

    let escrow = state
        .registry
        .transition_escrow(&escrow_id, action, &request.transaction_hash)
        .await?;
    Ok(ok(escrow))
}

pub async fn fund(
    State(state): State<AppState>,
    Path(escrow_id): Path<String>,
    ApiJson(request): ApiJson<HashRequest>,
) -> ApiResult<Json<Value>> {
    transition(state, escrow_id, EscrowAction::Fund, request).await
}

pub async fn release(
    State(state): State<AppState>,
    Path(escrow_id): Path<String>,
    ApiJson(request): ApiJson<HashRequest>,
) -> ApiResult<Json<Value>> {
    transition(state, escrow_id, EscrowAction::Release, request).await
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(escrow_id): Path<String>,
    ApiJson(request): ApiJson<HashRequest>,
) -> ApiResult<Json<Value>> {
    transition(state, escrow_id, EscrowAction::Cancel, request).await
}
