//! Shared application state, handed to every route. No globals.

use crate::ai::GeminiClient;
use crate::auth::JwtKeys;
use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt: Arc<JwtKeys>,
    /// None when `GEMINI_API_KEY` is unset.
    pub ai: Option<Arc<GeminiClient>>,
}

impl AppState {
    pub fn new(pool: PgPool, jwt: JwtKeys, ai: Option<GeminiClient>) -> Self {
        AppState {
            pool,
            jwt: Arc::new(jwt),
            ai: ai.map(Arc::new),
        }
    }
}

impl FromRef<AppState> for Arc<JwtKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
