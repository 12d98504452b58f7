//! Standard `{ success, data | message }` envelope helpers.

use crate::extractors::Pagination;
use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub success: bool,
    pub data: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageMeta>,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl PageMeta {
    pub fn new(pagination: &Pagination, total: u64) -> Self {
        let limit = u64::from(pagination.limit.max(1));
        PageMeta {
            page: pagination.page,
            limit: pagination.limit,
            total,
            pages: total.div_ceil(limit),
        }
    }
}

#[derive(Serialize)]
pub struct SuccessMessage {
    pub success: bool,
    pub message: String,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::CREATED, Json(SuccessOne { success: true, data }))
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { success: true, data }))
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    (
        StatusCode::OK,
        Json(SuccessMany {
            success: true,
            data,
            pagination: None,
        }),
    )
}

pub fn success_page<T: Serialize>(
    data: Vec<T>,
    pagination: &Pagination,
    total: u64,
) -> (StatusCode, Json<SuccessMany<T>>) {
    (
        StatusCode::OK,
        Json(SuccessMany {
            success: true,
            data,
            pagination: Some(PageMeta::new(pagination, total)),
        }),
    )
}

pub fn success_message(message: impl Into<String>) -> (StatusCode, Json<SuccessMessage>) {
    (
        StatusCode::OK,
        Json(SuccessMessage {
            success: true,
            message: message.into(),
        }),
    )
}
