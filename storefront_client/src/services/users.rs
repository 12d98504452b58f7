use super::ListQuery;
use crate::{ApiClient, ClientError};
use serde::Serialize;
use serde_json::Value;

pub async fn list(client: &ApiClient, query: ListQuery<'_>) -> Result<Value, ClientError> {
    client.get(&["users"], query).await
}

pub async fn me(client: &ApiClient) -> Result<Value, ClientError> {
    client.get(&["users", "me"], &[]).await
}

pub async fn update_me<B: Serialize + ?Sized>(client: &ApiClient, body: &B) -> Result<Value, ClientError> {
    client.put(&["users", "me"], body).await
}

pub async fn get(client: &ApiClient, id: &str) -> Result<Value, ClientError> {
    client.get(&["users", id], &[]).await
}

pub async fn update<B: Serialize + ?Sized>(client: &ApiClient, id: &str, body: &B) -> Result<Value, ClientError> {
    client.put(&["users", id], body).await
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<Value, ClientError> {
    client.delete(&["users", id]).await
}
