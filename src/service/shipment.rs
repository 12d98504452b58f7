use crate::error::AppError;
use crate::extractors::{FilterSpec, Listing, Pagination, SortSpec};
use crate::model::{
    NewShipment, Order, OrderStatus, OrderSummary, Ref, Shipment, ShipmentStatus, TrackingEvent,
};
use crate::service::{conflict_on_unique, fetch_page, parse_stored, OrderService};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

pub const DELIVERED_NOTE: &str = "Delivered by carrier";

#[derive(FromRow)]
struct ShipmentRow {
    id: Uuid,
    order_id: Uuid,
    tracking_code: String,
    carrier: String,
    status: String,
    events: Json<Vec<TrackingEvent>>,
    cancel_reason: Option<String>,
    estimated_delivery: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    order_status: Option<String>,
    order_total: Option<f64>,
    order_recipient: Option<String>,
}

impl TryFrom<ShipmentRow> for Shipment {
    type Error = AppError;

    fn try_from(row: ShipmentRow) -> Result<Self, Self::Error> {
        let summary = match (row.order_status, row.order_total) {
            (Some(status), Some(total_amount)) => Some(OrderSummary {
                id: row.order_id,
                status: parse_stored(&status)?,
                total_amount,
                recipient: row.order_recipient,
            }),
            _ => None,
        };
        Ok(Shipment {
            id: row.id,
            order: Ref::resolve(row.order_id, summary),
            tracking_code: row.tracking_code,
            carrier: row.carrier,
            status: parse_stored(&row.status)?,
            events: row.events.0,
            cancel_reason: row.cancel_reason,
            estimated_delivery: row.estimated_delivery,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_shipment(row: Option<ShipmentRow>) -> Result<Option<Shipment>, AppError> {
    row.map(Shipment::try_from).transpose()
}

const SELECT: &str = "SELECT s.*, o.status AS order_status, o.total_amount AS order_total, \
                      o.shipping_address->>'full_name' AS order_recipient \
                      FROM shipments s LEFT JOIN orders o ON o.id = s.order_id";

const LOCK_ONE: &str = "SELECT s.*, NULL::text AS order_status, NULL::double precision AS order_total, \
                        NULL::text AS order_recipient FROM shipments s WHERE s.id = $1 FOR UPDATE";

const LOCK_FOR_ORDER: &str = "SELECT s.*, NULL::text AS order_status, NULL::double precision AS order_total, \
                              NULL::text AS order_recipient FROM shipments s WHERE s.order_id = $1 FOR UPDATE";

/// A delivered shipment closes its order, unless the order was cancelled meanwhile.
fn mark_delivered(order: &mut Order, at: DateTime<Utc>) -> Result<(), AppError> {
    if order.status == OrderStatus::Cancelled {
        return Err(AppError::Conflict(
            "order is cancelled; cancel the shipment instead".into(),
        ));
    }
    order.apply_status(OrderStatus::Delivered, Some(DELIVERED_NOTE.to_string()), at);
    Ok(())
}

pub struct ShipmentService;

impl ShipmentService {
    pub async fn list(
        pool: &PgPool,
        filter: &FilterSpec,
        sort: &SortSpec,
        page: &Pagination,
    ) -> Result<(Vec<Shipment>, u64), AppError> {
        let (rows, total) = fetch_page::<ShipmentRow>(pool, Shipment::TABLE, filter, sort, page).await?;
        let shipments = rows.into_iter().map(Shipment::try_from).collect::<Result<_, _>>()?;
        Ok((shipments, total))
    }

    pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Shipment>, AppError> {
        let row = sqlx::query_as::<_, ShipmentRow>(&format!("{} WHERE s.id = $1", SELECT))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        into_shipment(row)
    }

    pub async fn find_by_order(pool: &PgPool, order_id: Uuid) -> Result<Vec<Shipment>, AppError> {
        let rows = sqlx::query_as::<_, ShipmentRow>(&format!(
            "{} WHERE s.order_id = $1 ORDER BY s.created_at DESC",
            SELECT
        ))
        .bind(order_id)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Shipment::try_from).collect()
    }

    /// Codes are matched case-insensitively; they are stored uppercase.
    pub async fn find_by_tracking_code(pool: &PgPool, code: &str) -> Result<Option<Shipment>, AppError> {
        let row = sqlx::query_as::<_, ShipmentRow>(&format!("{} WHERE s.tracking_code = $1", SELECT))
            .bind(code.trim().to_uppercase())
            .fetch_optional(pool)
            .await?;
        into_shipment(row)
    }

    /// Insert the shipment and move its order to `shipped` in one transaction.
    pub async fn create(pool: &PgPool, new_shipment: NewShipment) -> Result<Shipment, AppError> {
        let shipment = new_shipment.into_record(Uuid::new_v4(), Utc::now());
        let order_id = shipment.order.id();
        let mut tx = pool.begin().await?;
        let mut order = OrderService::lock(&mut *tx, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("order".into()))?;
        if matches!(order.status, OrderStatus::Cancelled | OrderStatus::Delivered) {
            return Err(AppError::Conflict(format!(
                "cannot ship an order that is {}",
                order.status
            )));
        }
        sqlx::query(
            "INSERT INTO shipments (id, order_id, tracking_code, carrier, status, events, cancel_reason, \
             estimated_delivery, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(shipment.id)
        .bind(order_id)
        .bind(&shipment.tracking_code)
        .bind(&shipment.carrier)
        .bind(shipment.status.as_str())
        .bind(Json(&shipment.events))
        .bind(&shipment.cancel_reason)
        .bind(shipment.estimated_delivery)
        .bind(shipment.created_at)
        .bind(shipment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "tracking code already exists"))?;

        let note = format!("Shipped via {} ({})", shipment.carrier, shipment.tracking_code);
        order.apply_status(OrderStatus::Shipped, Some(note), shipment.created_at);
        OrderService::save(&mut *tx, &order).await?;
        tx.commit().await?;
        tracing::info!(
            shipment_id = %shipment.id,
            order_id = %order_id,
            tracking_code = %shipment.tracking_code,
            "shipment created"
        );
        Ok(shipment)
    }

    /// Append a tracking event. A `delivered` event also marks the order delivered, and is
    /// refused while the order is cancelled.
    pub async fn record_event(pool: &PgPool, id: Uuid, event: TrackingEvent) -> Result<Option<Shipment>, AppError> {
        let mut tx = pool.begin().await?;
        // Order row first, then the shipment: the same lock order as order changes.
        let mut order = None;
        if event.status == ShipmentStatus::Delivered {
            let Some(order_id) = Self::order_id_of(&mut *tx, id).await? else {
                return Ok(None);
            };
            order = OrderService::lock(&mut *tx, order_id).await?;
        }
        let Some(mut shipment) = Self::lock(&mut *tx, id).await? else {
            return Ok(None);
        };
        if shipment.status.is_final() {
            return Err(AppError::Conflict(format!(
                "shipment is already {}",
                shipment.status
            )));
        }
        if let Some(order) = order.as_mut() {
            mark_delivered(order, event.occurred_at)?;
            OrderService::save(&mut *tx, order).await?;
        }
        shipment.record_event(event);
        Self::save(&mut *tx, &shipment).await?;
        tx.commit().await?;
        tracing::info!(shipment_id = %id, status = %shipment.status, "tracking event recorded");
        Self::find(pool, id).await
    }

    pub async fn cancel(pool: &PgPool, id: Uuid, reason: String) -> Result<Option<Shipment>, AppError> {
        let mut tx = pool.begin().await?;
        let Some(mut shipment) = Self::lock(&mut *tx, id).await? else {
            return Ok(None);
        };
        if shipment.status.is_final() {
            return Err(AppError::Conflict(format!(
                "cannot cancel a {} shipment",
                shipment.status
            )));
        }
        shipment.cancel(reason, Utc::now());
        Self::save(&mut *tx, &shipment).await?;
        tx.commit().await?;
        tracing::info!(shipment_id = %id, "shipment cancelled");
        Self::find(pool, id).await
    }

    /// Cancel every shipment of the order that is still moving. Runs inside the caller's transaction.
    pub(crate) async fn cancel_open_for_order(
        conn: &mut PgConnection,
        order_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, AppError> {
        let rows = sqlx::query_as::<_, ShipmentRow>(LOCK_FOR_ORDER)
            .bind(order_id)
            .fetch_all(&mut *conn)
            .await?;
        let mut cancelled = 0;
        for row in rows {
            let mut shipment = Shipment::try_from(row)?;
            if shipment.status.is_final() {
                continue;
            }
            shipment.cancel(reason.to_string(), now);
            Self::save(&mut *conn, &shipment).await?;
            cancelled += 1;
        }
        Ok(cancelled)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
        let done = sqlx::query("DELETE FROM shipments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn order_id_of(conn: &mut PgConnection, id: Uuid) -> Result<Option<Uuid>, AppError> {
        let order_id = sqlx::query_scalar("SELECT order_id FROM shipments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(order_id)
    }

    async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<Shipment>, AppError> {
        let row = sqlx::query_as::<_, ShipmentRow>(LOCK_ONE)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        into_shipment(row)
    }

    async fn save(conn: &mut PgConnection, shipment: &Shipment) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE shipments SET status = $2, events = $3, cancel_reason = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(shipment.id)
        .bind(shipment.status.as_str())
        .bind(Json(&shipment.events))
        .bind(&shipment.cancel_reason)
        .bind(shipment.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(order_status: Option<&str>) -> ShipmentRow {
        let now = Utc::now();
        ShipmentRow {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            tracking_code: "SF0A1B2C3D4E".into(),
            carrier: "VNPost".into(),
            status: "in_transit".into(),
            events: Json(Vec::new()),
            cancel_reason: None,
            estimated_delivery: None,
            created_at: now,
            updated_at: now,
            order_status: order_status.map(str::to_string),
            order_total: order_status.map(|_| 99.0),
            order_recipient: Some("Pham D".into()),
        }
    }

    #[test]
    fn joined_order_populates_reference() {
        let shipment = Shipment::try_from(row(Some("shipped"))).unwrap();
        let order = shipment.order.populated().unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.recipient.as_deref(), Some("Pham D"));
        assert_eq!(shipment.status, ShipmentStatus::InTransit);
    }

    fn order(status: OrderStatus) -> Order {
        let mut order = crate::model::NewOrder {
            user_id: None,
            items: Vec::new(),
            total_amount: 20.0,
            discount_amount: None,
            coupon_code: None,
            shipping_address: crate::model::ShippingAddress::default(),
            payment_method: crate::model::PaymentMethod::Cod,
        }
        .into_record(Uuid::new_v4(), Utc::now());
        order.status = status;
        order
    }

    #[test]
    fn delivery_closes_a_shipped_order() {
        let mut shipped = order(OrderStatus::Shipped);
        let at = Utc::now();
        mark_delivered(&mut shipped, at).unwrap();
        assert_eq!(shipped.status, OrderStatus::Delivered);
        assert_eq!(shipped.delivered_at, Some(at));
        assert_eq!(
            shipped.status_history.last().and_then(|c| c.note.as_deref()),
            Some(DELIVERED_NOTE)
        );
    }

    #[test]
    fn delivery_never_reopens_a_cancelled_order() {
        let mut cancelled = order(OrderStatus::Cancelled);
        let history = cancelled.status_history.len();
        let err = mark_delivered(&mut cancelled, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.status_history.len(), history);
        assert_eq!(cancelled.delivered_at, None);
    }

    #[test]
    fn locked_row_has_bare_order_id() {
        let r = row(None);
        let order_id = r.order_id;
        let shipment = Shipment::try_from(r).unwrap();
        assert_eq!(shipment.order, Ref::Id(order_id));
    }
}
