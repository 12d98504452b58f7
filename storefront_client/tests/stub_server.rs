//! Drives the client against a local axum stub that echoes what it received.

use axum::{
    body::Bytes,
    extract::Request,
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use storefront_client::{orders, products, shipments, ApiClient, ClientError};
use tokio::net::TcpListener;

async fn echo(method: Method, headers: HeaderMap, request: Request) -> impl IntoResponse {
    let uri = request.uri().clone();
    let body: Bytes = axum::body::to_bytes(request.into_body(), 1 << 20).await.unwrap_or_default();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    Json(json!({
        "success": true,
        "data": {
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query(),
            "authorization": headers.get("authorization").and_then(|v| v.to_str().ok()),
            "body": body,
        }
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"success": false, "message": "shipment not found"})),
    )
}

async fn start_stub() -> String {
    let app = Router::new()
        .route("/api/shipments/track/MISSING", get(not_found))
        .fallback(echo);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn envelope_is_returned_unchanged() {
    let client = ApiClient::new(start_stub().await).unwrap();
    let out = products::list(&client, &[("sortBy", "price"), ("sortOrder", "asc")]).await.unwrap();
    assert_eq!(out["success"], true);
    assert_eq!(out["data"]["method"], "GET");
    assert_eq!(out["data"]["path"], "/api/products");
    assert_eq!(out["data"]["query"], "sortBy=price&sortOrder=asc");
    assert_eq!(out["data"]["authorization"], Value::Null);
}

#[tokio::test]
async fn bearer_token_and_body_are_sent() {
    let client = ApiClient::new(start_stub().await).unwrap().with_token("tok-1");
    let out = shipments::cancel(&client, "abc", "customer moved").await.unwrap();
    assert_eq!(out["data"]["method"], "POST");
    assert_eq!(out["data"]["path"], "/api/shipments/abc/cancel");
    assert_eq!(out["data"]["authorization"], "Bearer tok-1");
    assert_eq!(out["data"]["body"], json!({"reason": "customer moved"}));
}

#[tokio::test]
async fn shipment_routes_map_to_server_paths() {
    let client = ApiClient::new(start_stub().await).unwrap().with_token("t");
    let by_order = shipments::get_by_order(&client, "o-1").await.unwrap();
    assert_eq!(by_order["data"]["path"], "/api/shipments/order/o-1");

    let event = json!({"status": "in_transit", "location": "Da Nang hub"});
    let status = shipments::update_status(&client, "s-1", &event).await.unwrap();
    assert_eq!(status["data"]["method"], "PATCH");
    assert_eq!(status["data"]["path"], "/api/shipments/s-1/status");

    let tracking = shipments::add_tracking_event(&client, "s-1", &event).await.unwrap();
    assert_eq!(tracking["data"]["method"], "POST");
    assert_eq!(tracking["data"]["path"], "/api/shipments/s-1/tracking");
    assert_eq!(tracking["data"]["body"]["location"], "Da Nang hub");

    let deleted = shipments::delete(&client, "s-1").await.unwrap();
    assert_eq!(deleted["data"]["method"], "DELETE");
}

#[tokio::test]
async fn ids_and_codes_stay_single_segments() {
    let client = ApiClient::new(start_stub().await).unwrap();
    let out = shipments::track(&client, " SF/12?x#y ").await.unwrap();
    assert_eq!(out["data"]["path"], "/api/shipments/track/SF%2F12%3Fx%23y");
    assert_eq!(out["data"]["query"], Value::Null);

    let out = orders::get(&client, "../users").await.unwrap();
    assert_eq!(out["data"]["path"], "/api/orders/..%2Fusers");
}

#[tokio::test]
async fn order_payment_uses_camel_case_body() {
    let client = ApiClient::new(start_stub().await).unwrap();
    let out = orders::update_payment(&client, "o-9", "paid").await.unwrap();
    assert_eq!(out["data"]["path"], "/api/orders/o-9/payment");
    assert_eq!(out["data"]["body"], json!({"paymentStatus": "paid"}));
}

#[tokio::test]
async fn non_success_status_is_an_error_with_body() {
    let client = ApiClient::new(start_stub().await).unwrap();
    let err = shipments::track(&client, "MISSING").await.unwrap_err();
    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("shipment not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
