use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::{ApiJson, ApiQuery};
use super::{created, ok};
use crate::error::ApiResult;
use crate::fabric::{number_arg, PROPERTY_CONTRACT};
use crate::models::{NewProperty, PropertyStatus};
use crate::registry::{
    generate_transaction_id, new_property_record, require_positive, require_text, PropertyFilter,
};
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(new_property): ApiJson<NewProperty>,
) -> ApiResult<Json<Value>> {
    let property = new_property_record(new_property)?;
    state
        .registry
        .ensure_property_absent(&property.property_id)
        .await?;

    state
        .fabric
        .submit(
            PROPERTY_CONTRACT,
            "RegisterProperty",
            &[
                property.property_id.clone(),
                property.owner.clone(),
                property.owner_name.clone(),
                property.location.clone(),
                number_arg(property.area),
                number_arg(property.price),
                property.property_type.clone(),
                property.description.clone(),
                number_arg(property.latitude),
                number_arg(property.longitude),
            ],
        )
        .await?;

    let property = state.registry.register_property(property).await?;
    let id = property.property_id.clone();
    Ok(created("propertyId", &id, property))
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<PropertyFilter>,
) -> Json<Value> {
    ok(state.registry.list_properties(&filter).await)
}

pub async fn get(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(ok(state.registry.get_property(&property_id).await?))
}

pub async fn marketplace(State(state): State<AppState>) -> Json<Value> {
    ok(state.registry.marketplace().await)
}

pub async fn record_view(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.registry.get_property(&property_id).await?;
    state
        .fabric
        .submit(PROPERTY_CONTRACT, "IncrementPropertyViews", &[property_id.clone()])
        .await?;
    Ok(ok(state.registry.record_view(&property_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(alias = "adminId")]
    verifier_id: String,
}

pub async fn verify(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    ApiJson(request): ApiJson<VerifyRequest>,
) -> ApiResult<Json<Value>> {
    state
        .registry
        .check_property_verification(&property_id, &request.verifier_id)
        .await?;
    state
        .fabric
        .submit(
            PROPERTY_CONTRACT,
            "VerifyProperty",
            &[property_id.clone(), request.verifier_id.clone()],
        )
        .await?;
    Ok(ok(state
        .registry
        .verify_property(&property_id, &request.verifier_id)
        .await?))
}

#[derive(Debug, Deserialize)]
pub struct PriceRequest {
    price: f64,
}

pub async fn update_price(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    ApiJson(request): ApiJson<PriceRequest>,
) -> ApiResult<Json<Value>> {
    require_positive("price", request.price)?;
    state.registry.get_property(&property_id).await?;
    state
        .fabric
        .submit(
            PROPERTY_CONTRACT,
            "UpdatePropertyPrice",
            &[property_id.clone(), number_arg(request.price)],
        )
        .await?;

    let property = state.registry.update_price(&property_id, request.price).await?;
    log::info!("Property {} repriced to {}", property_id, property.price);
    Ok(ok(property))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    status: PropertyStatus,
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> ApiResult<Json<Value>> {
    state.registry.get_property(&property_id).await?;
    state
        .fabric
        .submit(
            PROPERTY_CONTRACT,
            "UpdatePropertyStatus",
            &[property_id.clone(), request.status.to_string()],
        )
        .await?;

    let property = state
        .registry
        .update_property_status(&property_id, request.status)
        .await?;
    log::info!("Property {} status set to {}", property_id, property.status);
    Ok(ok(property))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRequest {
    #[serde(alias = "listedForSale")]
    listed: bool,
}

/// Listing is marketplace state only; the chaincode has no notion of it.
pub async fn set_listing(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    ApiJson(request): ApiJson<ListingRequest>,
) -> ApiResult<Json<Value>> {
    let property = state
        .registry
        .set_listing(&property_id, request.listed)
        .await?;
    log::info!("Property {} listed for sale: {}", property_id, property.listed_for_sale);
    Ok(ok(property))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    new_owner: String,
    #[serde(default)]
    new_owner_name: String,
    transaction_id: Option<String>,
}

pub async fn transfer(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    ApiJson(request): ApiJson<TransferRequest>,
) -> ApiResult<Json<Value>> {
    require_text("newOwner", &request.new_owner)?;
    state
        .registry
        .check_transfer(&property_id, &request.new_owner)
        .await?;

    let transaction_id = request
        .transaction_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(generate_transaction_id);
    state
        .fabric
        .submit(
            PROPERTY_CONTRACT,
            "TransferProperty",
            &[
                property_id.clone(),
                request.new_owner.clone(),
                request.new_owner_name.clone(),
                transaction_id.clone(),
            ],
        )
        .await?;

    let (property, transaction) = state
        .registry
        .transfer_property(
            &property_id,
            &request.new_owner,
            &request.new_owner_name,
            transaction_id,
        )
        .await?;
    Ok(created(
        "transactionId",
        &transaction.transaction_id,
        json!({ "property": property, "transaction": transaction }),
    ))
}

/// Local audit rows plus whatever history the ledger keeps for the key.
pub async fn history(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let transactions = state.registry.property_history(&property_id).await?;
    let ledger_history = state
        .fabric
        .evaluate(PROPERTY_CONTRACT, "GetPropertyHistory", &[property_id.clone()])
        .await?;
    Ok(Json(json!({
        "success": true,
        "data": transactions,
        "ledgerHistory": ledger_history,
    })))
}
