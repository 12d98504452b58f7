use crate::error::AppError;
use crate::extractors::{FilterSpec, Listing, Pagination, SortSpec};
use crate::model::{NewProduct, Product, ProductChanges, ProductSummary, Review, ReviewDoc};
use crate::service::fetch_page;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

pub const FEATURED_LIMIT: i64 = 8;

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    price: f64,
    original_price: Option<f64>,
    discount_percentage: Option<f64>,
    category: String,
    brand: Option<String>,
    images: Json<Vec<String>>,
    stock: i32,
    rating: f64,
    review_count: i32,
    featured: bool,
    reviews: Json<Vec<ReviewDoc>>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            original_price: row.original_price,
            discount_percentage: row.discount_percentage,
            category: row.category,
            brand: row.brand,
            images: row.images.0,
            stock: row.stock,
            rating: row.rating,
            review_count: row.review_count,
            featured: row.featured,
            reviews: row.reviews.0.into_iter().map(Review::from).collect(),
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct SummaryRow {
    id: Uuid,
    name: String,
    price: f64,
    image: Option<String>,
}

pub struct ProductService;

impl ProductService {
    pub async fn list(
        pool: &PgPool,
        filter: &FilterSpec,
        sort: &SortSpec,
        page: &Pagination,
    ) -> Result<(Vec<Product>, u64), AppError> {
        let (rows, total) = fetch_page::<ProductRow>(pool, Product::TABLE, filter, sort, page).await?;
        Ok((rows.into_iter().map(Product::from).collect(), total))
    }

    /// Featured products, best rated first.
    pub async fn featured(pool: &PgPool, limit: i64) -> Result<Vec<Product>, AppError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT * FROM products WHERE featured ORDER BY rating DESC, created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Product>, AppError> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Product::from))
    }

    /// Summaries for the given ids, for populating order items.
    pub async fn summaries(pool: &PgPool, ids: &[Uuid]) -> Result<HashMap<Uuid, ProductSummary>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT id, name, price, images->>0 AS image FROM products WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.id,
                    ProductSummary {
                        id: r.id,
                        name: r.name,
                        price: r.price,
                        image: r.image,
                    },
                )
            })
            .collect())
    }

    pub async fn create(pool: &PgPool, new_product: NewProduct) -> Result<Product, AppError> {
        let product = new_product.into_record(Uuid::new_v4(), Utc::now());
        tracing::debug!(product_id = %product.id, "insert product");
        sqlx::query(
            "INSERT INTO products (id, name, description, price, original_price, discount_percentage, \
             category, brand, images, stock, rating, review_count, featured, reviews, created_by, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.original_price)
        .bind(product.discount_percentage)
        .bind(&product.category)
        .bind(&product.brand)
        .bind(Json(&product.images))
        .bind(product.stock)
        .bind(product.rating)
        .bind(product.review_count)
        .bind(product.featured)
        .bind(Json(Vec::<ReviewDoc>::new()))
        .bind(product.created_by)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(pool)
        .await?;
        Ok(product)
    }

    pub async fn update(pool: &PgPool, id: Uuid, changes: ProductChanges) -> Result<Option<Product>, AppError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "UPDATE products SET name = COALESCE($2, name), description = COALESCE($3, description), \
             price = COALESCE($4, price), original_price = COALESCE($5, original_price), \
             discount_percentage = COALESCE($6, discount_percentage), category = COALESCE($7, category), \
             brand = COALESCE($8, brand), images = COALESCE($9, images), stock = COALESCE($10, stock), \
             featured = COALESCE($11, featured), updated_at = $12 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.price)
        .bind(changes.original_price)
        .bind(changes.discount_percentage)
        .bind(changes.category)
        .bind(changes.brand)
        .bind(changes.images.map(Json))
        .bind(changes.stock)
        .bind(changes.featured)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Product::from))
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
        let done = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Append a review and store the recomputed rating. One review per user.
    pub async fn add_review(pool: &PgPool, id: Uuid, review: Review) -> Result<Product, AppError> {
        let mut tx = pool.begin().await?;
        let mut product = Self::lock(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("product".into()))?;
        if product.has_review_from(review.user.id()) {
            return Err(AppError::Conflict("you have already reviewed this product".into()));
        }
        product.add_review(review);
        let docs: Vec<ReviewDoc> = product.reviews.iter().map(ReviewDoc::from).collect();
        sqlx::query(
            "UPDATE products SET reviews = $2, rating = $3, review_count = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(id)
        .bind(Json(docs))
        .bind(product.rating)
        .bind(product.review_count)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        tracing::info!(product_id = %id, rating = product.rating, reviews = product.review_count, "review added");
        Ok(product)
    }

    async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<Product>, AppError> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(Product::from))
    }
}
