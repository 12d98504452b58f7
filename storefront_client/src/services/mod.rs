//! One module per resource. Functions build the request and hand back the envelope.

pub mod auth;
pub mod orders;
pub mod products;
pub mod shipments;
pub mod users;

/// Query pairs for list endpoints: `page`, `limit`, `sortBy`, `sortOrder` and resource filters.
pub type ListQuery<'a> = &'a [(&'a str, &'a str)];
