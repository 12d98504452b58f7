//! HTTP handlers per resource. Each returns `Result<impl IntoResponse, AppError>`.

pub mod ai;
pub mod auth;
pub mod orders;
pub mod products;
pub mod shipments;
pub mod users;

use crate::error::AppError;
use uuid::Uuid;

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::BadRequest(format!("invalid id '{}'", raw)))
}

pub(crate) fn found<T>(value: Option<T>, what: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::NotFound(what.to_string()))
}
