//! Client for the storefront REST API.
//!
//! Every call returns the server's JSON envelope (`{success, data | message}`) unchanged.
//! Non-2xx responses become [`ClientError::Status`].

mod client;
mod error;
pub mod services;

pub use client::ApiClient;
pub use error::ClientError;
pub use services::{auth, orders, products, shipments, users};
