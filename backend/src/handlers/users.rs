use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::extract::{ApiJson, ApiQuery};
use super::{created, ok};
use crate::error::{ApiResult, RegistryError};
use crate::fabric::USER_CONTRACT;
use crate::models::{NewUser, Role, UserView};
use crate::registry::{generate_id, new_user_record, require_text};
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(new_user): ApiJson<NewUser>,
) -> ApiResult<Json<Value>> {
    let user = new_user_record(new_user)?;
    state.registry.ensure_user_absent(&user).await?;

    state
        .fabric
        .submit(
            USER_CONTRACT,
            "RegisterUser",
            &[
                user.user_id.clone(),
                user.name.clone(),
                user.email.clone(),
                user.phone.clone(),
                user.aadhar.clone(),
                user.pan.clone(),
                user.address.clone(),
                user.role.to_string(),
                user.wallet_address.clone(),
                user.password_hash.clone(),
            ],
        )
        .await?;

    let user = state.registry.register_user(user).await?;
    Ok(created("userId", &user.user_id, UserView::from(&user)))
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    role: Option<Role>,
}

pub async fn list(State(state): State<AppState>, ApiQuery(query): ApiQuery<UserQuery>) -> Json<Value> {
    let users: Vec<UserView> = state
        .registry
        .list_users(query.role)
        .await
        .iter()
        .map(UserView::from)
        .collect();
    ok(users)
}

pub async fn get(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user = state.registry.get_user(&user_id).await?;
    Ok(ok(UserView::from(&user)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    is_verified: bool,
}

pub async fn set_verification(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(request): ApiJson<VerificationRequest>,
) -> ApiResult<Json<Value>> {
    state.registry.get_user(&user_id).await?;
    state
        .fabric
        .submit(
            USER_CONTRACT,
            "UpdateUserVerification",
            &[user_id.clone(), request.is_verified.to_string()],
        )
        .await?;

    let user = state
        .registry
        .set_user_verification(&user_id, request.is_verified)
        .await?;
    log::info!("User {} verification set to {}", user_id, user.is_verified);
    Ok(ok(UserView::from(&user)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    document_id: Option<String>,
    document_type: String,
    document_hash: String,
}

pub async fn add_document(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(request): ApiJson<DocumentRequest>,
) -> ApiResult<Json<Value>> {
    let document_id = request
        .document_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| generate_id("DOC"));
    require_text("documentType", &request.document_type)?;
    require_text("documentHash", &request.document_hash)?;

    let user = state.registry.get_user(&user_id).await?;
    if user.documents.iter().any(|d| d.document_id == document_id) {
        return Err(RegistryError::already_exists("document", &document_id).into());
    }

    state
        .fabric
        .submit(
            USER_CONTRACT,
            "AddDocument",
            &[
                user_id.clone(),
                document_id.clone(),
                request.document_type.clone(),
                request.document_hash.clone(),
            ],
        )
        .await?;

    let user = state
        .registry
        .add_document(
            &user_id,
            &document_id,
            &request.document_type,
            &request.document_hash,
        )
        .await?;
    log::info!("Document {} added for user {}", document_id, user_id);
    Ok(created("documentId", &document_id, UserView::from(&user)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRequest {
    admin_id: String,
}

pub async fn verify_document(
    State(state): State<AppState>,
    Path((user_id, document_id)): Path<(String, String)>,
    ApiJson(request): ApiJson<AdminRequest>,
) -> ApiResult<Json<Value>> {
    state
        .registry
        .check_document_verification(&user_id, &document_id, &request.admin_id)
        .await?;
    state
        .fabric
        .submit(
            USER_CONTRACT,
            "VerifyDocument",
            &[user_id.clone(), document_id.clone(), request.admin_id.clone()],
        )
        .await?;

    let user = state
        .registry
        .verify_document(&user_id, &document_id, &request.admin_id)
        .await?;
    log::info!("Document {} of {} verified by {}", document_id, user_id, request.admin_id);
    Ok(ok(UserView::from(&user)))
}
