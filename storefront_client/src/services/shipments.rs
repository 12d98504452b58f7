use super::ListQuery;
use crate::{ApiClient, ClientError};
use serde::Serialize;
use serde_json::{json, Value};

pub async fn create<B: Serialize + ?Sized>(client: &ApiClient, body: &B) -> Result<Value, ClientError> {
    client.post(&["shipments"], body).await
}

pub async fn list(client: &ApiClient, query: ListQuery<'_>) -> Result<Value, ClientError> {
    client.get(&["shipments"], query).await
}

pub async fn get(client: &ApiClient, id: &str) -> Result<Value, ClientError> {
    client.get(&["shipments", id], &[]).await
}

pub async fn get_by_order(client: &ApiClient, order_id: &str) -> Result<Value, ClientError> {
    client.get(&["shipments", "order", order_id], &[]).await
}

/// Public lookup; no token needed.
pub async fn track(client: &ApiClient, tracking_code: &str) -> Result<Value, ClientError> {
    client.get(&["shipments", "track", tracking_code.trim()], &[]).await
}

pub async fn update_status<B: Serialize + ?Sized>(client: &ApiClient, id: &str, body: &B) -> Result<Value, ClientError> {
    client.patch(&["shipments", id, "status"], body).await
}

pub async fn add_tracking_event<B: Serialize + ?Sized>(
    client: &ApiClient,
    id: &str,
    body: &B,
) -> Result<Value, ClientError> {
    client.post(&["shipments", id, "tracking"], body).await
}

pub async fn cancel(client: &ApiClient, id: &str, reason: &str) -> Result<Value, ClientError> {
    client
        .post(&["shipments", id, "cancel"], &json!({ "reason": reason }))
        .await
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<Value, ClientError> {
    client.delete(&["shipments", id]).await
}
