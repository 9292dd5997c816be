use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use landchain_backend::config::AppConfig;
use landchain_backend::fabric::{FabricClient, Gateway};
use landchain_backend::registry::Registry;
use landchain_backend::{create_router, AppState};

async fn app_with(config: AppConfig) -> Router {
    let registry = Arc::new(Registry::new());
    registry.seed_demo_users().await;
    create_router(AppState::new(config, registry, FabricClient::mock()))
}

async fn app() -> Router {
    app_with(AppConfig::default()).await
}

/// Gateway on a local port that refuses every chaincode call.
async fn failing_gateway() -> FabricClient {
    let stub = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/channels/:channel/chaincodes/:contract/:kind",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "endorsement failed" })),
                )
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, stub).await.unwrap() });
    let gateway = Gateway::new(&format!("http://{}", addr), "landregistry", "admin", "Org1MSP");
    FabricClient::Gateway(gateway.unwrap())
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send(app, method, uri, body, None).await
}

fn plot(id: &str) -> Value {
    json!({
        "propertyId": id,
        "owner": "SELLER_001",
        "ownerName": "Ramesh Kumar",
        "location": "Tiruchanur, Tirupati",
        "area": 1200,
        "price": 2400000,
        "propertyType": "residential",
        "description": "Corner plot near the highway",
        "latitude": 13.6,
        "longitude": 79.4
    })
}

fn bid(offer_id: &str, property_id: &str) -> Value {
    json!({
        "offerId": offer_id,
        "propertyId": property_id,
        "buyerId": "BUYER_001",
        "buyerName": "Priya Sharma",
        "sellerId": "SELLER_001",
        "sellerName": "Ramesh Kumar",
        "offerAmount": 2500000,
        "message": "Ready to close this month"
    })
}

async fn transaction_types(app: &Router) -> Vec<String> {
    let (_, body) = call(app, "GET", "/api/transactions", None).await;
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["type"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_reports_mock_mode() {
    let app = app().await;
    let (status, body) = call(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["mode"], "MOCK");
    assert_eq!(body["fabricConnected"], false);
    assert_eq!(body["stats"]["users"], 3);
    assert_eq!(body["stats"]["properties"], 0);
}

#[tokio::test]
async fn offer_runs_from_creation_to_transfer() {
    let app = app().await;

    let (status, body) = call(&app, "POST", "/api/properties/register", Some(plot("PROP_T1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["propertyId"], "PROP_T1");
    assert_eq!(body["data"]["status"], "PENDING");

    let (status, _) = call(
        &app,
        "PUT",
        "/api/properties/PROP_T1/verify",
        Some(json!({ "verifierId": "ADMIN_001" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(
        &app,
        "PUT",
        "/api/properties/PROP_T1/listing",
        Some(json!({ "listed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, "GET", "/api/marketplace", None).await;
    assert_eq!(body["data"][0]["propertyId"], "PROP_T1");

    let (status, body) = call(&app, "POST", "/api/offers/create", Some(bid("OFFER_T1", "PROP_T1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["offerId"], "OFFER_T1");
    assert_eq!(body["data"]["status"], "PENDING");

    // Admin verification before the seller accepts is refused and leaves no trace.
    let before = transaction_types(&app).await;
    let (status, body) = call(
        &app,
        "PUT",
        "/api/offers/OFFER_T1/verify",
        Some(json!({ "adminId": "ADMIN_001", "sepoliaTxHash": "0xabc" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(transaction_types(&app).await, before);

    let (status, body) = call(&app, "PUT", "/api/offers/OFFER_T1/accept", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ACCEPTED");

    let (_, body) = call(&app, "GET", "/api/offers/pending-verification", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        "PUT",
        "/api/offers/OFFER_T1/verify",
        Some(json!({ "adminId": "ADMIN_001", "sepoliaTxHash": "0xabc" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ADMIN_VERIFIED");
    assert_eq!(body["data"]["adminVerified"], true);
    assert_eq!(body["data"]["sepoliaTxHash"], "0xabc");

    let (status, body) = call(&app, "PUT", "/api/offers/OFFER_T1/complete", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["offer"]["status"], "COMPLETED");
    assert_eq!(body["data"]["property"]["owner"], "BUYER_001");
    assert_eq!(body["data"]["property"]["status"], "TRANSFERRED");
    assert_eq!(body["data"]["property"]["listedForSale"], false);
    assert!(body["transactionId"].as_str().unwrap().starts_with("TXN_"));

    assert_eq!(
        transaction_types(&app).await,
        vec![
            "PROPERTY_REGISTERED",
            "OFFER_CREATED",
            "OFFER_ACCEPTED",
            "OFFER_VERIFIED",
            "PROPERTY_TRANSFERRED",
        ]
    );

    let (status, body) = call(&app, "GET", "/api/offers/OFFER_T1/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 4);
    assert_eq!(body["ledgerHistory"], json!([]));

    let (_, body) = call(&app, "GET", "/api/transactions?userId=BUYER_001&propertyId=PROP_T1", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn duplicates_and_unknown_ids() {
    let app = app().await;
    call(&app, "POST", "/api/properties/register", Some(plot("PROP_D1"))).await;

    let (status, body) = call(&app, "POST", "/api/properties/register", Some(plot("PROP_D1"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, body) = call(&app, "GET", "/api/offers/OFFER_MISSING", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = call(&app, "PUT", "/api/offers/OFFER_MISSING/accept", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unverified_property_cannot_be_listed() {
    let app = app().await;
    call(&app, "POST", "/api/properties/register", Some(plot("PROP_L1"))).await;

    let (status, _) = call(
        &app,
        "PUT",
        "/api/properties/PROP_L1/listing",
        Some(json!({ "listed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = call(&app, "GET", "/api/marketplace", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn validation_errors_are_bad_requests() {
    let app = app().await;
    let mut bad = plot("PROP_V1");
    bad["price"] = json!(0);
    let (status, body) = call(&app, "POST", "/api/properties/register", Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn login_issues_token_without_credentials_in_body() {
    let app = app().await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({ "email": "priya@example.com", "password": "buyer123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].as_str().is_some());
    assert_eq!(body["data"]["user"]["userId"], "BUYER_001");
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let (status, body) = call(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({ "email": "priya@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn password_hashes_never_leave_the_server() {
    let app = app().await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/users/register",
        Some(json!({
            "name": "Anita Rao",
            "email": "anita@example.com",
            "role": "SELLER",
            "password": "hunter22"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["userId"].as_str().unwrap().starts_with("USER_"));

    for uri in ["/api/users", "/api/data"] {
        let (_, body) = call(&app, "GET", uri, None).await;
        assert!(!body.to_string().contains("passwordHash"), "{} leaked a hash", uri);
    }
}

#[tokio::test]
async fn mutations_require_a_token_when_auth_is_on() {
    let app = app_with(AppConfig {
        require_auth: true,
        ..AppConfig::default()
    })
    .await;

    let (status, _) = call(&app, "POST", "/api/properties/register", Some(plot("PROP_A1"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = call(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({ "email": "ramesh@example.com", "password": "seller123" })),
    )
    .await;
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        "/api/properties/register",
        Some(plot("PROP_A1")),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, "GET", "/api/properties/PROP_A1", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn escrow_moves_through_its_states() {
    let app = app().await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/escrows/create",
        Some(json!({
            "escrowId": "ESCROW_T1",
            "propertyId": "PROP_T1",
            "buyer": "BUYER_001",
            "seller": "SELLER_001",
            "amount": 2500000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["escrowId"], "ESCROW_T1");
    assert_eq!(body["data"]["status"], "CREATED");

    let (status, _) = call(
        &app,
        "PUT",
        "/api/escrows/ESCROW_T1/release",
        Some(json!({ "transactionHash": "0x01" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        &app,
        "PUT",
        "/api/escrows/ESCROW_T1/fund",
        Some(json!({ "transactionHash": "0x02" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "FUNDED");

    let (_, body) = call(
        &app,
        "PUT",
        "/api/escrows/ESCROW_T1/release",
        Some(json!({ "transactionHash": "0x03" })),
    )
    .await;
    assert_eq!(body["data"]["status"], "RELEASED");
    assert_eq!(body["data"]["transactionHash"], "0x03");

    let (status, _) = call(
        &app,
        "PUT",
        "/api/escrows/ESCROW_T1/cancel",
        Some(json!({ "transactionHash": "0x04" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn sync_replaces_collections() {
    let app = app().await;
    call(&app, "POST", "/api/properties/register", Some(plot("PROP_S1"))).await;

    let (status, body) = call(&app, "POST", "/api/sync", Some(json!({ "properties": [] }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["properties"], 0);
    assert_eq!(body["data"]["users"], 3);

    let (status, _) = call(&app, "GET", "/api/properties/PROP_S1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn verified_offer(app: &Router, offer_id: &str, buyer_id: &str) {
    let mut offer = bid(offer_id, "PROP_C1");
    offer["buyerId"] = json!(buyer_id);
    let (status, _) = call(app, "POST", "/api/offers/create", Some(offer)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(app, "PUT", &format!("/api/offers/{}/accept", offer_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(
        app,
        "PUT",
        &format!("/api/offers/{}/verify", offer_id),
        Some(json!({ "adminId": "ADMIN_001", "sepoliaTxHash": "0xabc" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn second_buyer_cannot_take_a_sold_property() {
    let app = app().await;
    let (status, _) = call(
        &app,
        "POST",
        "/api/users/register",
        Some(json!({
            "userId": "BUYER_002",
            "name": "Kiran Reddy",
            "email": "kiran@example.com",
            "role": "BUYER",
            "password": "buyer456"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    call(&app, "POST", "/api/properties/register", Some(plot("PROP_C1"))).await;
    call(
        &app,
        "PUT",
        "/api/properties/PROP_C1/verify",
        Some(json!({ "verifierId": "ADMIN_001" })),
    )
    .await;
    verified_offer(&app, "OFFER_C1", "BUYER_001").await;
    verified_offer(&app, "OFFER_C2", "BUYER_002").await;

    let (status, _) = call(&app, "PUT", "/api/offers/OFFER_C1/complete", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, "GET", "/api/offers/OFFER_C2", None).await;
    assert_eq!(body["data"]["status"], "CANCELLED");

    let (status, body) = call(&app, "PUT", "/api/offers/OFFER_C2/complete", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (_, body) = call(&app, "GET", "/api/properties/PROP_C1", None).await;
    assert_eq!(body["data"]["owner"], "BUYER_001");
    assert_eq!(body["data"]["status"], "TRANSFERRED");
}

#[tokio::test]
async fn malformed_requests_get_the_error_envelope() {
    let app = app().await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/offers/create",
        Some(json!({ "propertyId": "P1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("buyerId"));

    let (status, body) = call(&app, "GET", "/api/offers?status=BOGUS", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let request = Request::builder()
        .method("POST")
        .uri("/api/properties/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn ledger_failure_leaves_the_registry_untouched() {
    let registry = Arc::new(Registry::new());
    registry.seed_demo_users().await;
    let app = create_router(AppState::new(
        AppConfig::default(),
        registry,
        failing_gateway().await,
    ));

    let (_, health) = call(&app, "GET", "/api/health", None).await;
    assert_eq!(health["mode"], "FABRIC");
    assert_eq!(health["fabricConnected"], true);

    let (status, body) = call(&app, "POST", "/api/properties/register", Some(plot("PROP_F1"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "LEDGER_ERROR");

    let (_, after) = call(&app, "GET", "/api/health", None).await;
    assert_eq!(after["stats"], health["stats"]);
    let (status, _) = call(&app, "GET", "/api/properties/PROP_F1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sync_keeps_the_audit_log() {
    let app = app().await;
    call(&app, "POST", "/api/properties/register", Some(plot("PROP_S2"))).await;
    let before = transaction_types(&app).await;
    assert_eq!(before, vec!["PROPERTY_REGISTERED"]);

    let (status, body) = call(
        &app,
        "POST",
        "/api/sync",
        Some(json!({ "transactions": [], "offers": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["transactions"], 1);
    assert_eq!(transaction_types(&app).await, before);
}
