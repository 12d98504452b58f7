//! Storefront: REST backend for products, orders, users and shipments on PostgreSQL.

pub mod ai;
pub mod auth;
pub mod config;
pub mod connection;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod mapper;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;
pub mod telemetry;

pub use ai::GeminiClient;
pub use auth::JwtKeys;
pub use config::AppConfig;
pub use error::{AppError, ConfigError};
pub use response::{success_many, success_one, success_page};
pub use routes::{api_routes, app, common_routes};
pub use service::{OrderService, ProductService, ShipmentService, UserService};
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_tables, open_database};
pub use telemetry::init_tracing;
