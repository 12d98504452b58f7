use crate::extractors::Listing;
use crate::model::{Identified, Ref, UserSummary};
use crate::sql::{Column, TableDef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// At or below this many units a product reports `low_stock`.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

text_enum!(StockStatus {
    InStock => "in_stock",
    LowStock => "low_stock",
    OutOfStock => "out_of_stock",
});

impl StockStatus {
    pub fn from_stock(stock: i32) -> Self {
        if stock <= 0 {
            StockStatus::OutOfStock
        } else if stock <= LOW_STOCK_THRESHOLD {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Review {
    pub user: Ref<UserSummary>,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Review as stored in the `reviews` JSONB column. The author's name is snapshotted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewDoc {
    pub user_id: Uuid,
    #[serde(default)]
    pub user_name: Option<String>,
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewDoc> for Review {
    fn from(doc: ReviewDoc) -> Self {
        let summary = doc.user_name.map(|name| UserSummary {
            id: doc.user_id,
            name,
            email: None,
        });
        Review {
            user: Ref::resolve(doc.user_id, summary),
            rating: doc.rating,
            comment: doc.comment,
            created_at: doc.created_at,
        }
    }
}

impl From<&Review> for ReviewDoc {
    fn from(review: &Review) -> Self {
        ReviewDoc {
            user_id: review.user.id(),
            user_name: review.user.populated().map(|u| u.name.clone()),
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: review.created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub discount_percentage: Option<f64>,
    pub category: String,
    pub brand: Option<String>,
    pub images: Vec<String>,
    pub stock: i32,
    pub rating: f64,
    pub review_count: i32,
    pub featured: bool,
    pub reviews: Vec<Review>,
    /// Staff account that listed the product.
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::from_stock(self.stock)
    }

    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            image: self.images.first().cloned(),
        }
    }

    pub fn has_review_from(&self, user_id: Uuid) -> bool {
        self.reviews.iter().any(|r| r.user.id() == user_id)
    }

    /// Append a review and recompute the aggregate rating and count.
    pub fn add_review(&mut self, review: Review) {
        self.updated_at = review.created_at;
        self.reviews.push(review);
        let (rating, count) = aggregate_rating(&self.reviews);
        self.rating = rating;
        self.review_count = count;
    }
}

/// Mean rating rounded to one decimal, and the review count.
pub fn aggregate_rating(reviews: &[Review]) -> (f64, i32) {
    if reviews.is_empty() {
        return (0.0, 0);
    }
    let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
    let mean = sum as f64 / reviews.len() as f64;
    ((mean * 10.0).round() / 10.0, reviews.len() as i32)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub image: Option<String>,
}

impl Identified for ProductSummary {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub discount_percentage: Option<f64>,
    pub category: String,
    pub brand: Option<String>,
    pub images: Vec<String>,
    pub stock: i32,
    pub featured: bool,
    pub created_by: Option<Uuid>,
}

impl NewProduct {
    pub fn into_record(self, id: Uuid, now: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            original_price: self.original_price,
            discount_percentage: self.discount_percentage,
            category: self.category,
            brand: self.brand,
            images: self.images,
            stock: self.stock,
            rating: 0.0,
            review_count: 0,
            featured: self.featured,
            reviews: Vec::new(),
            created_by: self.created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub discount_percentage: Option<f64>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub images: Option<Vec<String>>,
    pub stock: Option<i32>,
    pub featured: Option<bool>,
}

const PRODUCTS_TABLE: TableDef = TableDef {
    alias: "p",
    from: "products p",
    select: "p.*",
    columns: &[
        Column { api: "price", name: "price", pg_type: "double precision" },
        Column { api: "createdAt", name: "created_at", pg_type: "timestamptz" },
        Column { api: "rating", name: "rating", pg_type: "double precision" },
        Column { api: "name", name: "name", pg_type: "text" },
        Column { api: "stock", name: "stock", pg_type: "integer" },
        Column { api: "category", name: "category", pg_type: "text" },
        Column { api: "brand", name: "brand", pg_type: "text" },
        Column { api: "featured", name: "featured", pg_type: "boolean" },
    ],
    default_sort: "created_at",
};

impl Listing for Product {
    const SORTABLE: &'static [&'static str] = &["price", "createdAt", "rating", "name", "stock"];
    const FILTERABLE: &'static [&'static str] = &["category", "brand", "featured"];
    const TABLE: &'static TableDef = &PRODUCTS_TABLE;
}
