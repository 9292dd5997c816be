//! HTTP surface. Mutating routes follow one shape: check the registry rules,
//! submit to the ledger, then apply the change locally, so a ledger failure
//! or a doomed transition leaves the local store untouched.

use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::auth;
use crate::state::AppState;

mod escrows;
mod extract;
mod offers;
mod properties;
mod system;
mod transactions;
mod users;

/// `{"success": true, "data": ...}`
fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// Success envelope that also echoes the new record's id under `id_field`.
fn created<T: Serialize>(id_field: &str, id: &str, data: T) -> Json<Value> {
    let mut body = json!({ "success": true, "data": data });
    body[id_field] = json!(id);
    Json(body)
}

pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/sync", post(system::sync))
        .route("/api/users/:user_id/verify", put(users::set_verification))
        .route("/api/users/:user_id/documents", post(users::add_document))
        .route(
            "/api/users/:user_id/documents/:document_id/verify",
            put(users::verify_document),
        )
        .route("/api/properties/register", post(properties::register))
        .route("/api/properties/:property_id/verify", put(properties::verify))
        .route("/api/properties/:property_id/price", put(properties::update_price))
        .route("/api/properties/:property_id/status", put(properties::update_status))
        .route("/api/properties/:property_id/listing", put(properties::set_listing))
        .route("/api/properties/:property_id/transfer", post(properties::transfer))
        .route("/api/offers/create", post(offers::create))
        .route("/api/offers/:offer_id/accept", put(offers::accept))
        .route("/api/offers/:offer_id/reject", put(offers::reject))
        .route("/api/offers/:offer_id/verify", put(offers::admin_verify))
        .route("/api/offers/:offer_id/complete", put(offers::complete))
        .route("/api/offers/:offer_id/cancel", put(offers::cancel))
        .route("/api/escrows/create", post(escrows::create))
        .route("/api/escrows/:escrow_id/fund", put(escrows::fund))
        .route("/api/escrows/:escrow_id/release", put(escrows::release))
        .route("/api/escrows/:escrow_id/cancel", put(escrows::cancel))
        .layer(middleware::from_fn_with_state(state.clone(), auth::authenticate));

    Router::new()
        .route("/api/health", get(system::health))
        .route("/api/data", get(system::data))
        .route("/api/auth/login", post(system::login))
        .route("/api/users/register", post(users::register))
        .route("/api/users", get(users::list))
        .route("/api/users/:user_id", get(users::get))
        .route("/api/properties", get(properties::list))
        .route("/api/properties/:property_id", get(properties::get))
        .route("/api/properties/:property_id/views", post(properties::record_view))
        .route("/api/properties/:property_id/history", get(properties::history))
        .route("/api/marketplace", get(properties::marketplace))
        .route("/api/offers", get(offers::list))
        .route("/api/offers/pending-verification", get(offers::pending_verification))
        .route("/api/offers/:offer_id", get(offers::get))
        .route("/api/offers/:offer_id/history", get(offers::history))
        .route("/api/transactions", get(transactions::list))
        .route("/api/transactions/:transaction_id", get(transactions::get))
        .route("/api/escrows", get(escrows::list))
        .route("/api/escrows/:escrow_id", get(escrows::get))
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
