//! Field-level validator steps. Each returns the first failure as `AppError::Validation`,
//! so a body's `validate()` reads as a sequence of `?` steps.

use crate::error::AppError;
use regex::Regex;
use std::sync::OnceLock;

/// A request body that can check itself before reaching a handler.
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), AppError> {
        self.iter().try_for_each(Validate::validate)
    }
}

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const PHONE_PATTERN: &str = r"^\+?[0-9][0-9 .-]{6,18}[0-9]$";

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Result<&'static Regex, AppError> {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .ok_or_else(|| AppError::Internal(format!("invalid pattern {}", pattern)))
}

fn email_re() -> Result<&'static Regex, AppError> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, EMAIL_PATTERN)
}

fn phone_re() -> Result<&'static Regex, AppError> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, PHONE_PATTERN)
}

pub fn required(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

pub fn max_length(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

pub fn min_length(field: &str, value: &str, min: usize) -> Result<(), AppError> {
    if value.chars().count() < min {
        return Err(AppError::Validation(format!(
            "{} must be at least {} characters",
            field, min
        )));
    }
    Ok(())
}

pub fn email(field: &str, value: &str) -> Result<(), AppError> {
    if !email_re()?.is_match(value.trim()) {
        return Err(AppError::Validation(format!("{} must be a valid email", field)));
    }
    Ok(())
}

/// Absent is fine; present must look like a phone number.
pub fn phone(field: &str, value: Option<&str>) -> Result<(), AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if !phone_re()?.is_match(v) => Err(AppError::Validation(format!(
            "{} must be a valid phone number",
            field
        ))),
        _ => Ok(()),
    }
}

pub fn at_least(field: &str, value: f64, min: f64) -> Result<(), AppError> {
    if !value.is_finite() || value < min {
        return Err(AppError::Validation(format!("{} must be at least {}", field, min)));
    }
    Ok(())
}

pub fn between(field: &str, value: f64, min: f64, max: f64) -> Result<(), AppError> {
    if !value.is_finite() || value < min || value > max {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {}",
            field, min, max
        )));
    }
    Ok(())
}

pub fn not_empty<T>(field: &str, items: &[T]) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}
