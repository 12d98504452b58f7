use crate::error::AppError;
use crate::mapper::user::{summary_response as user_summary, UserRefResponse};
use crate::mapper::{clean, map_all};
use crate::model::{
    NewProduct, Product, ProductChanges, ProductSummary, Ref, Review, StockStatus, UserSummary,
};
use crate::service::validation::{self as check, Validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_REVIEW_COMMENT: usize = 1000;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRefResponse>,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub original_price: f64,
    pub discount_percentage: f64,
    pub category: String,
    pub brand: Option<String>,
    pub image: Option<String>,
    pub images: Vec<String>,
    pub stock: i32,
    pub stock_status: StockStatus,
    pub rating: f64,
    pub review_count: i32,
    pub featured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<ReviewResponse>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummaryResponse {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub image: Option<String>,
}

/// Stored percentage if present, else derived from a higher original price, else 0.
pub fn discount_percentage(product: &Product) -> f64 {
    if let Some(pct) = product.discount_percentage {
        return pct;
    }
    match product.original_price {
        Some(original) if original > product.price && original > 0.0 => {
            ((original - product.price) / original * 100.0).round()
        }
        _ => 0.0,
    }
}

pub fn review_response(review: &Review) -> ReviewResponse {
    ReviewResponse {
        user_id: review.user.id(),
        user: review.user.populated().map(user_summary),
        rating: review.rating,
        comment: review.comment.clone(),
        created_at: review.created_at,
    }
}

pub fn to_response(product: Option<&Product>) -> Option<ProductResponse> {
    let p = product?;
    Some(ProductResponse {
        id: p.id,
        name: p.name.clone(),
        description: p.description.clone(),
        price: p.price,
        original_price: p.original_price.unwrap_or(p.price),
        discount_percentage: discount_percentage(p),
        category: p.category.clone(),
        brand: p.brand.clone(),
        image: p.images.first().cloned(),
        images: p.images.clone(),
        stock: p.stock,
        stock_status: p.stock_status(),
        rating: p.rating,
        review_count: p.review_count,
        featured: p.featured,
        reviews: (!p.reviews.is_empty()).then(|| p.reviews.iter().map(review_response).collect()),
        created_by: p.created_by,
        created_at: p.created_at,
        updated_at: p.updated_at,
    })
}

pub fn to_responses(products: &[Product]) -> Vec<ProductResponse> {
    map_all(products, to_response)
}

pub fn summary_response(summary: &ProductSummary) -> ProductSummaryResponse {
    ProductSummaryResponse {
        id: summary.id,
        name: summary.name.clone(),
        price: summary.price,
        image: summary.image.clone(),
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub discount_percentage: Option<f64>,
    pub category: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub featured: bool,
}

fn check_prices(
    price: Option<f64>,
    original_price: Option<f64>,
    discount: Option<f64>,
    stock: Option<i32>,
) -> Result<(), AppError> {
    if let Some(price) = price {
        check::at_least("price", price, 0.0)?;
    }
    if let Some(original) = original_price {
        check::at_least("originalPrice", original, 0.0)?;
    }
    if let Some(pct) = discount {
        check::between("discountPercentage", pct, 0.0, 100.0)?;
    }
    if let Some(stock) = stock {
        check::at_least("stock", f64::from(stock), 0.0)?;
    }
    Ok(())
}

impl Validate for CreateProductRequest {
    fn validate(&self) -> Result<(), AppError> {
        check::required("name", &self.name)?;
        check::max_length("name", &self.name, 200)?;
        check::required("category", &self.category)?;
        check_prices(
            Some(self.price),
            self.original_price,
            self.discount_percentage,
            Some(self.stock),
        )
    }
}

/// A single `image` goes first so it stays the product's cover.
fn merge_images(image: Option<String>, images: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(images.len() + 1);
    for url in clean(image).into_iter().chain(images.into_iter().filter_map(|u| clean(Some(u)))) {
        if !merged.contains(&url) {
            merged.push(url);
        }
    }
    merged
}

pub fn from_request(req: CreateProductRequest, created_by: Uuid) -> NewProduct {
    NewProduct {
        name: req.name.trim().to_string(),
        description: req.description.trim().to_string(),
        price: req.price,
        original_price: req.original_price,
        discount_percentage: req.discount_percentage,
        category: req.category.trim().to_string(),
        brand: clean(req.brand),
        images: merge_images(req.image, req.images),
        stock: req.stock,
        featured: req.featured,
        created_by: Some(created_by),
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub discount_percentage: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default)]
    pub featured: Option<bool>,
}

impl Validate for UpdateProductRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            check::required("name", name)?;
            check::max_length("name", name, 200)?;
        }
        if let Some(category) = &self.category {
            check::required("category", category)?;
        }
        check_prices(self.price, self.original_price, self.discount_percentage, self.stock)
    }
}

impl UpdateProductRequest {
    pub fn into_changes(self) -> ProductChanges {
        let images = match (self.image, self.images) {
            (None, None) => None,
            (image, images) => Some(merge_images(image, images.unwrap_or_default())),
        };
        ProductChanges {
            name: clean(self.name),
            description: self.description.map(|d| d.trim().to_string()),
            price: self.price,
            original_price: self.original_price,
            discount_percentage: self.discount_percentage,
            category: clean(self.category),
            brand: clean(self.brand),
            images,
            stock: self.stock,
            featured: self.featured,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ReviewRequest {
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
}

impl Validate for ReviewRequest {
    fn validate(&self) -> Result<(), AppError> {
        check::between("rating", f64::from(self.rating), 1.0, 5.0)?;
        check::max_length("comment", &self.comment, MAX_REVIEW_COMMENT)
    }
}

/// The author is the authenticated caller, never a body field.
pub fn review_from_request(req: ReviewRequest, author: UserSummary, now: DateTime<Utc>) -> Review {
    Review {
        user: Ref::Populated(author),
        rating: req.rating,
        comment: req.comment.trim().to_string(),
        created_at: now,
    }
}
