//! Pagination, sort and filter descriptors parsed from the query string.
//!
//! Parsing lives in plain functions; the extractors only read the query and
//! apply the resource's allow-lists declared through [`Listing`].

use crate::error::AppError;
use crate::sql::TableDef;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

/// A listed resource: which fields may be sorted and filtered, and the table they map onto.
pub trait Listing {
    const SORTABLE: &'static [&'static str];
    const FILTERABLE: &'static [&'static str];
    const TABLE: &'static TableDef;
}

type QueryMap = HashMap<String, String>;

fn query_map(parts: &Parts) -> Result<QueryMap, AppError> {
    Query::<QueryMap>::try_from_uri(&parts.uri)
        .map(|Query(q)| q)
        .map_err(|e| AppError::BadRequest(format!("invalid query string: {}", e)))
}

/// `{page, limit, skip}` derived from `page`/`limit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub skip: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            skip: 0,
        }
    }
}

impl Pagination {
    /// Non-numeric or zero values fall back to the defaults; `limit` is capped at [`MAX_LIMIT`].
    pub fn from_query(query: &QueryMap) -> Self {
        let positive = |key: &str| {
            query
                .get(key)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|n| *n >= 1)
        };
        let page = positive("page").unwrap_or(DEFAULT_PAGE);
        let limit = positive("limit").unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        Pagination {
            page,
            limit,
            skip: u64::from(page - 1) * u64::from(limit),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Pagination::from_query(&query_map(parts)?))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// 1 ascending, -1 descending.
    pub fn value(self) -> i8 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

impl Serialize for SortOrder {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.value())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    /// `sortBy` defaults to `createdAt`; an explicit `sortBy` outside `allowed` is rejected.
    /// Only `sortOrder=asc` sorts ascending.
    pub fn from_query(query: &QueryMap, allowed: Option<&[&str]>) -> Result<Self, AppError> {
        let requested = query.get("sortBy").map(|s| s.trim()).filter(|s| !s.is_empty());
        if let (Some(field), Some(allowed)) = (requested, allowed) {
            if !allowed.contains(&field) {
                return Err(AppError::Validation(format!(
                    "Invalid sort field '{}'. Allowed fields: {}",
                    field,
                    allowed.join(", ")
                )));
            }
        }
        let order = match query.get("sortOrder") {
            Some(o) if o.trim().eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };
        Ok(SortSpec {
            field: requested.unwrap_or(DEFAULT_SORT_FIELD).to_string(),
            order,
        })
    }
}

/// Allow-listed query keys copied verbatim. Ordered so generated SQL is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterSpec(BTreeMap<String, String>);

impl FilterSpec {
    pub fn from_query(query: &QueryMap, allowed: &[&str]) -> Self {
        FilterSpec(
            allowed
                .iter()
                .filter_map(|key| {
                    query
                        .get(*key)
                        .filter(|v| !v.trim().is_empty())
                        .map(|v| (key.to_string(), v.trim().to_string()))
                })
                .collect(),
        )
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        FilterSpec(pairs.into_iter().collect())
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Sort descriptor restricted to `L::SORTABLE`.
pub struct Sorted<L> {
    pub spec: SortSpec,
    _listing: PhantomData<L>,
}

#[async_trait]
impl<S, L> FromRequestParts<S> for Sorted<L>
where
    S: Send + Sync,
    L: Listing,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let spec = SortSpec::from_query(&query_map(parts)?, Some(L::SORTABLE))?;
        Ok(Sorted {
            spec,
            _listing: PhantomData,
        })
    }
}

/// Filter descriptor restricted to `L::FILTERABLE`.
pub struct Filtered<L> {
    pub spec: FilterSpec,
    _listing: PhantomData<L>,
}

#[async_trait]
impl<S, L> FromRequestParts<S> for Filtered<L>
where
    S: Send + Sync,
    L: Listing,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Filtered {
            spec: FilterSpec::from_query(&query_map(parts)?, L::FILTERABLE),
            _listing: PhantomData,
        })
    }
}
