use super::ListQuery;
use crate::{ApiClient, ClientError};
use serde::Serialize;
use serde_json::Value;

pub async fn list(client: &ApiClient, query: ListQuery<'_>) -> Result<Value, ClientError> {
    client.get(&["products"], query).await
}

pub async fn featured(client: &ApiClient) -> Result<Value, ClientError> {
    client.get(&["products", "featured"], &[]).await
}

pub async fn get(client: &ApiClient, id: &str) -> Result<Value, ClientError> {
    client.get(&["products", id], &[]).await
}

pub async fn create<B: Serialize + ?Sized>(client: &ApiClient, body: &B) -> Result<Value, ClientError> {
    client.post(&["products"], body).await
}

pub async fn update<B: Serialize + ?Sized>(client: &ApiClient, id: &str, body: &B) -> Result<Value, ClientError> {
    client.put(&["products", id], body).await
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<Value, ClientError> {
    client.delete(&["products", id]).await
}

pub async fn add_review(client: &ApiClient, id: &str, rating: u8, comment: &str) -> Result<Value, ClientError> {
    client
        .post(
            &["products", id, "reviews"],
            &serde_json::json!({ "rating": rating, "comment": comment }),
        )
        .await
}
