use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::extract::ApiJson;
use super::ok;
use crate::auth;
use crate::error::{ApiError, ApiResult};
use crate::fabric::USER_CONTRACT;
use crate::models::{Escrow, Offer, Property, RegistryData, SyncPayload, Transaction, UserView};
use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let stats = state.registry.stats().await;
    Json(json!({
        "success": true,
        "status": "OK",
        "mode": state.fabric.mode(),
        "timestamp": Utc::now().to_rfc3339(),
        "stats": stats,
        "fabricConnected": state.fabric.is_connected(),
    }))
}

/// The whole store with credentials stripped from users.
#[derive(Serialize)]
struct DataView {
    users: Vec<UserView>,
    properties: Vec<Property>,
    offers: Vec<Offer>,
    transactions: Vec<Transaction>,
    escrows: Vec<Escrow>,
}

impl From<RegistryData> for DataView {
    fn from(data: RegistryData) -> Self {
        Self {
            users: data.users.iter().map(UserView::from).collect(),
            properties: data.properties,
            offers: data.offers,
            transactions: data.transactions,
            escrows: data.escrows,
        }
    }
}

pub async fn data(State(state): State<AppState>) -> Json<Value> {
    ok(DataView::from(state.registry.snapshot().await))
}

pub async fn sync(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SyncPayload>,
) -> Json<Value> {
    let stats = state.registry.replace(payload).await;
    log::info!("Data synced from client: {:?}", stats);
    ok(stats)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let user = state
        .registry
        .authenticate(&request.email, &request.password)
        .await?;
    let token = auth::create_token(&user.user_id, &state.config.jwt_secret).map_err(|e| {
        log::error!("Failed to sign token for {}: {}", user.user_id, e);
        ApiError::Unauthorized("could not issue a token".to_string())
    })?;
    // Login succeeds even when the ledger stamp fails.
    if let Err(e) = state
        .fabric
        .submit(USER_CONTRACT, "UpdateLastLogin", &[user.user_id.clone()])
        .await
    {
        log::warn!("Could not record login of {} on the ledger: {}", user.user_id, e);
    }
    log::info!("User {} logged in", user.user_id);
    Ok(ok(json!({
        "token": token,
        "user": UserView::from(&user),
    })))
}
