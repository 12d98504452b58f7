use crate::auth::{hash_password, verify_password};
use crate::error::AppError;
use crate::extractors::ValidatedJson;
use crate::mapper::user::{self as user_mapper, AuthResponse, LoginRequest, RegisterRequest};
use crate::response::{success_one, success_one_ok};
use crate::service::UserService;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};

const BAD_CREDENTIALS: &str = "invalid email or password";

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password_hash = hash_password(&body.password)?;
    let user = UserService::create(&state.pool, user_mapper::from_request(body, password_hash)).await?;
    let token = state.jwt.issue(user.id, user.role)?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok(success_one(AuthResponse {
        token,
        user: user_mapper::to_response(Some(&user)).ok_or_else(|| AppError::Internal("user mapping".into()))?,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = user_mapper::normalize_email(&body.email);
    let user = UserService::find_by_email(&state.pool, &email)
        .await?
        .filter(|u| verify_password(&body.password, &u.password_hash))
        .ok_or_else(|| AppError::Unauthorized(BAD_CREDENTIALS.into()))?;
    let token = state.jwt.issue(user.id, user.role)?;
    Ok(success_one_ok(AuthResponse {
        token,
        user: user_mapper::to_response(Some(&user)).ok_or_else(|| AppError::Internal("user mapping".into()))?,
    }))
}
