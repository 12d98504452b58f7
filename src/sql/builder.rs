//! Builds parameterized list/count queries from a static table description plus
//! the request's filter, sort and pagination descriptors.

use crate::error::AppError;
use crate::extractors::{FilterSpec, Pagination, SortOrder, SortSpec};
use serde_json::Value;

/// A queryable column: the API field name and the backing column with its type.
#[derive(Debug)]
pub struct Column {
    pub api: &'static str,
    pub name: &'static str,
    pub pg_type: &'static str,
}

/// Static description of a listed resource. Identifiers here are the only ones that reach SQL text.
#[derive(Debug)]
pub struct TableDef {
    /// Alias used to qualify columns (`o` in `orders o`).
    pub alias: &'static str,
    /// FROM clause including joins.
    pub from: &'static str,
    /// Projection.
    pub select: &'static str,
    pub columns: &'static [Column],
    /// Column used when the sort field is unknown to this table.
    pub default_sort: &'static str,
}

impl TableDef {
    pub fn column(&self, api: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.api == api)
    }
}

/// Quote identifier for PostgreSQL (safe: only from static table definitions).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified(table: &TableDef, column: &str) -> String {
    format!("{}.{}", table.alias, quoted(column))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// Reject filter values the column cast would choke on, so callers get a 400 instead of a 500.
fn check_filter_value(column: &Column, field: &str, value: &str) -> Result<(), AppError> {
    let ok = match column.pg_type {
        "uuid" => uuid::Uuid::parse_str(value).is_ok(),
        "boolean" => matches!(value, "true" | "false"),
        "integer" | "bigint" => value.parse::<i64>().is_ok(),
        "double precision" => value.parse::<f64>().is_ok(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "invalid value '{}' for filter {}",
            value, field
        )))
    }
}

fn where_clause(table: &TableDef, filter: &FilterSpec, q: &mut QueryBuf) -> Result<String, AppError> {
    let mut parts = Vec::new();
    for (field, value) in filter.iter() {
        let Some(column) = table.column(field) else { continue };
        check_filter_value(column, field, value)?;
        let n = q.push_param(Value::String(value.clone()));
        parts.push(format!(
            "{} = ${}::{}",
            qualified(table, column.name),
            n,
            column.pg_type
        ));
    }
    Ok(if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    })
}

fn order_clause(table: &TableDef, sort: &SortSpec) -> String {
    let column = table
        .column(&sort.field)
        .map(|c| c.name)
        .unwrap_or(table.default_sort);
    let direction = match sort.order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    format!(
        " ORDER BY {} {}, {} ASC",
        qualified(table, column),
        direction,
        qualified(table, "id")
    )
}

/// SELECT page: filters (exact match per allow-listed column), ORDER BY sort column then id, LIMIT/OFFSET.
pub fn select_page(
    table: &TableDef,
    filter: &FilterSpec,
    sort: &SortSpec,
    page: &Pagination,
) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(table, filter, &mut q)?;
    q.sql = format!(
        "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
        table.select,
        table.from,
        where_sql,
        order_clause(table, sort),
        page.limit,
        page.skip
    );
    Ok(q)
}

/// SELECT COUNT(*) with the same filters as `select_page`.
pub fn count(table: &TableDef, filter: &FilterSpec) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(table, filter, &mut q)?;
    q.sql = format!("SELECT COUNT(*) FROM {}{}", table.from, where_sql);
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDGETS: TableDef = TableDef {
        alias: "w",
        from: "widgets w",
        select: "w.*",
        columns: &[
            Column { api: "createdAt", name: "created_at", pg_type: "timestamptz" },
            Column { api: "price", name: "price", pg_type: "double precision" },
            Column { api: "featured", name: "featured", pg_type: "boolean" },
            Column { api: "category", name: "category", pg_type: "text" },
        ],
        default_sort: "created_at",
    };

    fn filter(pairs: &[(&str, &str)]) -> FilterSpec {
        FilterSpec::from_pairs(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    #[test]
    fn page_query_binds_filters_in_order() {
        let sort = SortSpec { field: "price".into(), order: SortOrder::Asc };
        let page = Pagination { page: 2, limit: 5, skip: 5 };
        let q = select_page(&WIDGETS, &filter(&[("category", "shoes"), ("featured", "true")]), &sort, &page).unwrap();
        assert_eq!(
            q.sql,
            "SELECT w.* FROM widgets w WHERE w.\"category\" = $1::text AND w.\"featured\" = $2::boolean \
             ORDER BY w.\"price\" ASC, w.\"id\" ASC LIMIT 5 OFFSET 5"
        );
        assert_eq!(q.params, vec![Value::from("shoes"), Value::from("true")]);
    }

    #[test]
    fn unknown_sort_field_falls_back_to_default() {
        let sort = SortSpec { field: "rank".into(), order: SortOrder::Desc };
        let page = Pagination::default();
        let q = select_page(&WIDGETS, &FilterSpec::default(), &sort, &page).unwrap();
        assert!(q.sql.contains("ORDER BY w.\"created_at\" DESC"));
        assert!(q.params.is_empty());
    }

    #[test]
    fn malformed_boolean_filter_is_a_validation_error() {
        let err = count(&WIDGETS, &filter(&[("featured", "yes")])).err().unwrap();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn count_shares_where_clause() {
        let q = count(&WIDGETS, &filter(&[("category", "bags")])).unwrap();
        assert_eq!(q.sql, "SELECT COUNT(*) FROM widgets w WHERE w.\"category\" = $1::text");
    }
}
