use crate::{ApiClient, ClientError};
use serde::Serialize;
use serde_json::Value;

pub async fn register<B: Serialize + ?Sized>(client: &ApiClient, body: &B) -> Result<Value, ClientError> {
    client.post(&["auth", "register"], body).await
}

pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<Value, ClientError> {
    client
        .post(&["auth", "login"], &serde_json::json!({ "email": email, "password": password }))
        .await
}

/// The token inside a `{success, data: {token, user}}` envelope.
pub fn token_of(envelope: &Value) -> Option<&str> {
    envelope.pointer("/data/token").and_then(Value::as_str)
}
