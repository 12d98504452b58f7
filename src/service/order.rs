use crate::error::AppError;
use crate::extractors::{FilterSpec, Listing, Pagination, SortSpec};
use crate::model::{
    NewOrder, Order, OrderItemDoc, OrderStatus, PaymentStatus, ProductSummary, Ref, ShippingAddress,
    StatusChange, UserSummary,
};
use crate::service::{fetch_page, parse_stored, ProductService, ShipmentService};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Option<Uuid>,
    items: Json<Vec<OrderItemDoc>>,
    total_amount: f64,
    discount_amount: Option<f64>,
    coupon_code: Option<String>,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    payment_status: String,
    status: String,
    status_history: Json<Vec<StatusChange>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    user_name: Option<String>,
    user_email: Option<String>,
}

impl OrderRow {
    fn product_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.items.0.iter().map(|i| i.product_id)
    }

    /// `products` populates item references; items whose product is gone keep the bare id.
    fn into_record(self, products: &HashMap<Uuid, ProductSummary>) -> Result<Order, AppError> {
        let user = self.user_id.map(|id| {
            let summary = self.user_name.map(|name| UserSummary {
                id,
                name,
                email: self.user_email,
            });
            Ref::resolve(id, summary)
        });
        Ok(Order {
            id: self.id,
            user,
            items: self
                .items
                .0
                .into_iter()
                .map(|doc| {
                    let product = products.get(&doc.product_id).cloned();
                    doc.into_item(product)
                })
                .collect(),
            total_amount: self.total_amount,
            discount_amount: self.discount_amount,
            coupon_code: self.coupon_code,
            shipping_address: self.shipping_address.0,
            payment_method: parse_stored(&self.payment_method)?,
            payment_status: parse_stored(&self.payment_status)?,
            status: parse_stored(&self.status)?,
            status_history: self.status_history.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
            shipped_at: self.shipped_at,
            delivered_at: self.delivered_at,
        })
    }
}

const SELECT_ONE: &str = "SELECT o.*, u.name AS user_name, u.email AS user_email \
                          FROM orders o LEFT JOIN users u ON u.id = o.user_id WHERE o.id = $1";

/// Row lock on the order alone; the user join is not needed for a state change.
const LOCK_ONE: &str = "SELECT o.*, NULL::text AS user_name, NULL::text AS user_email \
                        FROM orders o WHERE o.id = $1 FOR UPDATE";

const ORDER_CANCELLED: &str = "Order cancelled";

pub struct OrderService;

impl OrderService {
    async fn populate(pool: &PgPool, rows: Vec<OrderRow>) -> Result<Vec<Order>, AppError> {
        let mut ids: Vec<Uuid> = rows.iter().flat_map(OrderRow::product_ids).collect();
        ids.sort();
        ids.dedup();
        let products = ProductService::summaries(pool, &ids).await?;
        rows.into_iter().map(|r| r.into_record(&products)).collect()
    }

    pub async fn list(
        pool: &PgPool,
        filter: &FilterSpec,
        sort: &SortSpec,
        page: &Pagination,
    ) -> Result<(Vec<Order>, u64), AppError> {
        let (rows, total) = fetch_page::<OrderRow>(pool, Order::TABLE, filter, sort, page).await?;
        Ok((Self::populate(pool, rows).await?, total))
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        sort: &SortSpec,
        page: &Pagination,
    ) -> Result<(Vec<Order>, u64), AppError> {
        let filter = FilterSpec::default().with("userId", user_id.to_string());
        Self::list(pool, &filter, sort, page).await
    }

    pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Order>, AppError> {
        let row = sqlx::query_as::<_, OrderRow>(SELECT_ONE)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        match row {
            Some(row) => Ok(Self::populate(pool, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn create(pool: &PgPool, new_order: NewOrder) -> Result<Order, AppError> {
        let order = new_order.into_record(Uuid::new_v4(), Utc::now());
        let items: Vec<OrderItemDoc> = order.items.iter().map(OrderItemDoc::from).collect();
        sqlx::query(
            "INSERT INTO orders (id, user_id, items, total_amount, discount_amount, coupon_code, \
             shipping_address, payment_method, payment_status, status, status_history, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(order.id)
        .bind(order.user_id())
        .bind(Json(items))
        .bind(order.total_amount)
        .bind(order.discount_amount)
        .bind(&order.coupon_code)
        .bind(Json(&order.shipping_address))
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(Json(&order.status_history))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(pool)
        .await?;
        tracing::info!(order_id = %order.id, items = order.items.len(), total = order.total_amount, "order placed");
        Ok(order)
    }

    /// Lock the order, let `change` mutate it, persist the lifecycle fields, then re-read it populated.
    /// `change` may refuse with an error, in which case nothing is written. When the change cancels
    /// the order, its shipments that are still moving are cancelled in the same transaction with the
    /// order's cancel note as their reason.
    pub async fn modify<F>(pool: &PgPool, id: Uuid, change: F) -> Result<Option<Order>, AppError>
    where
        F: FnOnce(&mut Order) -> Result<(), AppError>,
    {
        let mut tx = pool.begin().await?;
        let Some(mut order) = Self::lock(&mut *tx, id).await? else {
            return Ok(None);
        };
        let before = order.status;
        change(&mut order)?;
        Self::save(&mut *tx, &order).await?;
        if order.status == OrderStatus::Cancelled && before != OrderStatus::Cancelled {
            let reason = order
                .status_history
                .last()
                .and_then(|c| c.note.clone())
                .unwrap_or_else(|| ORDER_CANCELLED.to_string());
            let shipments = ShipmentService::cancel_open_for_order(&mut *tx, id, &reason, order.updated_at).await?;
            if shipments > 0 {
                tracing::info!(order_id = %id, shipments, "open shipments cancelled with their order");
            }
        }
        tx.commit().await?;
        tracing::info!(order_id = %id, status = %order.status, payment = %order.payment_status, "order updated");
        Self::find(pool, id).await
    }

    pub async fn update_payment(
        pool: &PgPool,
        id: Uuid,
        payment_status: PaymentStatus,
    ) -> Result<Option<Order>, AppError> {
        Self::modify(pool, id, |order| {
            order.payment_status = payment_status;
            order.updated_at = Utc::now();
            Ok(())
        })
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
        let done = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    pub(crate) async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<Order>, AppError> {
        let row = sqlx::query_as::<_, OrderRow>(LOCK_ONE)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        row.map(|r| r.into_record(&HashMap::new())).transpose()
    }

    /// Persist status, payment status, history and lifecycle timestamps.
    pub(crate) async fn save(conn: &mut PgConnection, order: &Order) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE orders SET status = $2, payment_status = $3, status_history = $4, \
             shipped_at = $5, delivered_at = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(order.id)
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(Json(&order.status_history))
        .bind(order.shipped_at)
        .bind(order.delivered_at)
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
