use super::ListQuery;
use crate::{ApiClient, ClientError};
use serde::Serialize;
use serde_json::{json, Value};

pub async fn create<B: Serialize + ?Sized>(client: &ApiClient, body: &B) -> Result<Value, ClientError> {
    client.post(&["orders"], body).await
}

pub async fn list(client: &ApiClient, query: ListQuery<'_>) -> Result<Value, ClientError> {
    client.get(&["orders"], query).await
}

pub async fn my(client: &ApiClient, query: ListQuery<'_>) -> Result<Value, ClientError> {
    client.get(&["orders", "my"], query).await
}

pub async fn get(client: &ApiClient, id: &str) -> Result<Value, ClientError> {
    client.get(&["orders", id], &[]).await
}

pub async fn update_status(
    client: &ApiClient,
    id: &str,
    status: &str,
    note: Option<&str>,
) -> Result<Value, ClientError> {
    client
        .patch(&["orders", id, "status"], &json!({ "status": status, "note": note }))
        .await
}

pub async fn update_payment(client: &ApiClient, id: &str, payment_status: &str) -> Result<Value, ClientError> {
    client
        .patch(&["orders", id, "payment"], &json!({ "paymentStatus": payment_status }))
        .await
}

pub async fn cancel(client: &ApiClient, id: &str, reason: Option<&str>) -> Result<Value, ClientError> {
    client
        .post(&["orders", id, "cancel"], &json!({ "reason": reason }))
        .await
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<Value, ClientError> {
    client.delete(&["orders", id]).await
}
