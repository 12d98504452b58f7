use crate::error::AppError;
use crate::extractors::{AuthUser, Filtered, Pagination, Sorted, StaffUser, ValidatedJson};
use crate::handlers::{found, parse_id};
use crate::mapper::product::{
    self as product_mapper, review_from_request, CreateProductRequest, ReviewRequest, UpdateProductRequest,
};
use crate::model::Product;
use crate::response::{success_many, success_message, success_one, success_one_ok, success_page};
use crate::service::{ProductService, UserService};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;

use crate::service::FEATURED_LIMIT;

pub async fn list(
    State(state): State<AppState>,
    page: Pagination,
    sort: Sorted<Product>,
    filter: Filtered<Product>,
) -> Result<impl IntoResponse, AppError> {
    let (products, total) = ProductService::list(&state.pool, &filter.spec, &sort.spec, &page).await?;
    Ok(success_page(product_mapper::to_responses(&products), &page, total))
}

pub async fn featured(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let products = ProductService::featured(&state.pool, FEATURED_LIMIT).await?;
    Ok(success_many(product_mapper::to_responses(&products)))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let product = found(ProductService::find(&state.pool, parse_id(&id)?).await?, "product")?;
    Ok(success_one_ok(product_mapper::to_response(Some(&product))))
}

pub async fn create(
    State(state): State<AppState>,
    StaffUser(caller): StaffUser,
    ValidatedJson(body): ValidatedJson<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let product = ProductService::create(&state.pool, product_mapper::from_request(body, caller.id)).await?;
    tracing::info!(product_id = %product.id, by = %caller.id, "product created");
    Ok(success_one(product_mapper::to_response(Some(&product))))
}

pub async fn update(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let product = found(ProductService::update(&state.pool, id, body.into_changes()).await?, "product")?;
    Ok(success_one_ok(product_mapper::to_response(Some(&product))))
}

pub async fn delete(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !ProductService::delete(&state.pool, parse_id(&id)?).await? {
        return Err(AppError::NotFound("product".into()));
    }
    Ok(success_message("product deleted"))
}

pub async fn add_review(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<ReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let author = found(UserService::find(&state.pool, caller.id).await?, "user")?;
    let review = review_from_request(body, author.summary(), Utc::now());
    let product = ProductService::add_review(&state.pool, id, review).await?;
    Ok(success_one(product_mapper::to_response(Some(&product))))
}
