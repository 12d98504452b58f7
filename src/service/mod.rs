//! Data access per resource. Rows are read into `*Row` structs and converted to
//! domain records here, so `Ref` variants are resolved once.

mod order;
mod product;
mod shipment;
mod user;
pub mod validation;

pub use order::OrderService;
pub use product::{ProductService, FEATURED_LIMIT};
pub use shipment::ShipmentService;
pub use user::UserService;

use crate::error::AppError;
use crate::extractors::{FilterSpec, Pagination, SortSpec};
use crate::model::UnknownVariant;
use crate::sql::{count, select_page, PgBindValue, TableDef};
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use std::str::FromStr;

/// Parse a stored enum column. A mismatch means the row was written by something else.
pub(crate) fn parse_stored<T>(value: &str) -> Result<T, AppError>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .parse()
        .map_err(|e: UnknownVariant| AppError::Internal(e.to_string()))
}

/// One page of rows plus the total matching the same filters.
pub(crate) async fn fetch_page<R>(
    pool: &PgPool,
    table: &TableDef,
    filter: &FilterSpec,
    sort: &SortSpec,
    page: &Pagination,
) -> Result<(Vec<R>, u64), AppError>
where
    R: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
{
    let q = select_page(table, filter, sort, page)?;
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_as::<_, R>(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from_json(p));
    }
    let rows = query.fetch_all(pool).await?;

    let c = count(table, filter)?;
    tracing::debug!(sql = %c.sql, params = ?c.params, "query");
    let mut total = sqlx::query_scalar::<_, i64>(&c.sql);
    for p in &c.params {
        total = total.bind(PgBindValue::from_json(p));
    }
    let total = total.fetch_one(pool).await?;
    Ok((rows, u64::try_from(total).unwrap_or(0)))
}

/// Unique violations become a 409 with a message the caller can act on.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(message.to_string()),
        _ => AppError::Db(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderStatus;

    #[test]
    fn stored_enum_mismatch_is_internal() {
        let ok: OrderStatus = parse_stored("shipped").unwrap();
        assert_eq!(ok, OrderStatus::Shipped);
        let err = parse_stored::<OrderStatus>("lost").unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn non_unique_errors_pass_through() {
        let err = conflict_on_unique(sqlx::Error::RowNotFound, "taken");
        assert!(matches!(err, AppError::Db(sqlx::Error::RowNotFound)));
    }
}
