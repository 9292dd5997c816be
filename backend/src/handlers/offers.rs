use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::{ApiJson, ApiQuery};
use super::{created, ok};
use crate::error::ApiResult;
use crate::fabric::{number_arg, OFFER_CONTRACT, PROPERTY_CONTRACT};
use crate::models::{NewOffer, Offer, OfferAction};
use crate::registry::{generate_transaction_id, new_offer_record, require_text, OfferFilter};
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    ApiJson(new_offer): ApiJson<NewOffer>,
) -> ApiResult<Json<Value>> {
    let offer = new_offer_record(new_offer)?;
    state.registry.check_new_offer(&offer).await?;

    state
        .fabric
        .submit(
            OFFER_CONTRACT,
            "CreateOffer",
            &[
                offer.offer_id.clone(),
                offer.property_id.clone(),
                offer.buyer_id.clone(),
                offer.buyer_name.clone(),
                offer.seller_id.clone(),
                offer.seller_name.clone(),
                number_arg(offer.offer_amount),
                offer.message.clone(),
            ],
        )
        .await?;

    let offer = state.registry.create_offer(offer).await?;
    let id = offer.offer_id.clone();
    Ok(created("offerId", &id, offer))
}

pub async fn list(State(state): State<AppState>, ApiQuery(filter): ApiQuery<OfferFilter>) -> Json<Value> {
    ok(state.registry.list_offers(&filter).await)
}

pub async fn pending_verification(State(state): State<AppState>) -> Json<Value> {
    ok(state.registry.pending_admin_verifications().await)
}

pub async fn get(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(ok(state.registry.get_offer(&offer_id).await?))
}

async fn submit_transition(
    state: &AppState,
    offer_id: &str,
    action: OfferAction,
) -> ApiResult<Offer> {
    let offer = state.registry.check_offer(offer_id, action).await?;
    state
        .fabric
        .submit(OFFER_CONTRACT, action.chaincode_function(), &[offer_id.to_string()])
        .await?;
    Ok(offer)
}

pub async fn accept(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
) -> ApiResult<Json<Value>> {
    submit_transition(&state, &offer_id, OfferAction::Accept).await?;
    Ok(ok(state.registry.accept_offer(&offer_id).await?))
}

pub async fn reject(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
) -> ApiResult<Json<Value>> {
    submit_transition(&state, &offer_id, OfferAction::Reject).await?;
    Ok(ok(state.registry.reject_offer(&offer_id).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
) -> ApiResult<Json<Value>> {
    submit_transition(&state, &offer_id, OfferAction::Cancel).await?;
    Ok(ok(state.registry.cancel_offer(&offer_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminVerifyRequest {
    admin_id: String,
    sepolia_tx_hash: String,
}

pub async fn admin_verify(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
    ApiJson(request): ApiJson<AdminVerifyRequest>,
) -> ApiResult<Json<Value>> {
    require_text("sepoliaTxHash", &request.sepolia_tx_hash)?;
    state
        .registry
        .check_admin_verification(&offer_id, &request.admin_id)
        .await?;
    state
        .fabric
        .submit(
            OFFER_CONTRACT,
            OfferAction::AdminVerify.chaincode_function(),
            &[
                offer_id.clone(),
                request.admin_id.clone(),
                request.sepolia_tx_hash.clone(),
            ],
        )
        .await?;

    let offer = state
        .registry
        .admin_verify_offer(&offer_id, &request.admin_id, &request.sepolia_tx_hash)
        .await?;
    Ok(ok(offer))
}

/// Transfers the property on the ledger, closes the offer there, then
/// mirrors both locally.
pub async fn complete(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let offer = state
        .registry
        .check_offer(&offer_id, OfferAction::Complete)
        .await?;
    let transaction_id = generate_transaction_id();

    state
        .fabric
        .submit(
            PROPERTY_CONTRACT,
            "TransferProperty",
            &[
                offer.property_id.clone(),
                offer.buyer_id.clone(),
                offer.buyer_name.clone(),
                transaction_id.clone(),
            ],
        )
        .await?;
    state
        .fabric
        .submit(
            OFFER_CONTRACT,
            OfferAction::Complete.chaincode_function(),
            &[offer_id.clone()],
        )
        .await?;

    let (offer, property, transaction) = state
        .registry
        .complete_offer(&offer_id, transaction_id)
        .await?;
    Ok(created(
        "transactionId",
        &transaction.transaction_id,
        json!({ "offer": offer, "property": property, "transaction": transaction }),
    ))
}

pub async fn history(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let transactions = state.registry.offer_history(&offer_id).await?;
    let ledger_history = state
        .fabric
        .evaluate(OFFER_CONTRACT, "GetOfferHistory", &[offer_id.clone()])
        .await?;
    Ok(Json(json!({
        "success": true,
        "data": transactions,
        "ledgerHistory": ledger_history,
    })))
}
