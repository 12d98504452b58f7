use crate::ai::{shopping_prompt, AiError};
use crate::error::AppError;
use crate::extractors::ValidatedJson;
use crate::response::success_one_ok;
use crate::service::validation::{self as check, Validate};
use crate::service::{ProductService, FEATURED_LIMIT};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};

pub const MAX_MESSAGE_LENGTH: usize = 2000;

#[derive(Deserialize, Debug)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

impl Validate for ChatRequest {
    fn validate(&self) -> Result<(), AppError> {
        check::required("message", &self.message)?;
        check::max_length("message", &self.message, MAX_MESSAGE_LENGTH)
    }
}

#[derive(Serialize, Debug)]
pub struct ChatResponse {
    pub reply: String,
}

pub async fn chat(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = state.ai.clone().ok_or(AiError::NotConfigured)?;
    let products = ProductService::featured(&state.pool, FEATURED_LIMIT).await?;
    let reply = client.generate(&shopping_prompt(&body.message, &products)).await?;
    Ok(success_one_ok(ChatResponse { reply }))
}
