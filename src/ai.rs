//! Gemini `generateContent` client and the shopping-assistant prompt.

use crate::config::GeminiSettings;
use crate::error::AppError;
use crate::model::Product;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("GEMINI_API_KEY is not set")]
    NotConfigured,
    #[error("network error: {0}")]
    Network(String),
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("model returned no text")]
    EmptyReply,
}

impl From<AiError> for AppError {
    fn from(err: AiError) -> Self {
        tracing::warn!(error = %err, "ai request failed");
        match err {
            AiError::NotConfigured => AppError::Unavailable("AI assistant is not configured".into()),
            _ => AppError::Unavailable("AI assistant is temporarily unavailable".into()),
        }
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

/// Text of the first candidate, parts joined.
pub fn extract_text(response: &GenerateResponse) -> Result<String, AiError> {
    let text: String = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
        .unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        Err(AiError::EmptyReply)
    } else {
        Ok(text.to_string())
    }
}

pub struct GeminiClient {
    client: Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AiError::Network(e.to_string()))?;
        Ok(GeminiClient { client, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;
        extract_text(&parsed)
    }
}

/// Assistant instructions, the featured catalog as context, then the shopper's message.
pub fn shopping_prompt(message: &str, products: &[Product]) -> String {
    let mut prompt = String::from(
        "You are the shopping assistant of an online store. Answer briefly and helpfully. \
         Only recommend products from the list below; if nothing fits, say so.\n\nProducts:\n",
    );
    if products.is_empty() {
        prompt.push_str("(no featured products right now)\n");
    }
    for p in products {
        let _ = writeln!(
            prompt,
            "- {} | {} | price {} | rating {} | {}",
            p.name,
            p.category,
            p.price,
            p.rating,
            p.stock_status()
        );
    }
    let _ = write!(prompt, "\nCustomer: {}\nAssistant:", message.trim());
    prompt
}
