//! Database bootstrap and storefront table DDL, applied idempotently at boot.

use crate::config::{PoolSettings, DATABASE_URL};
use crate::connection::{connect, ConnectErrorKind};
use crate::error::{AppError, ConfigError};
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, PgConnection, PgPool};
use std::str::FromStr;

const MAINTENANCE_DB: &str = "postgres";

/// Tables in dependency order. Embedded lists are JSONB.
const TABLES: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            phone TEXT,
            address TEXT,
            city TEXT,
            country TEXT,
            role TEXT NOT NULL DEFAULT 'customer',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "products",
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            price DOUBLE PRECISION NOT NULL,
            original_price DOUBLE PRECISION,
            discount_percentage DOUBLE PRECISION,
            category TEXT NOT NULL,
            brand TEXT,
            images JSONB NOT NULL DEFAULT '[]'::jsonb,
            stock INTEGER NOT NULL DEFAULT 0,
            rating DOUBLE PRECISION NOT NULL DEFAULT 0,
            review_count INTEGER NOT NULL DEFAULT 0,
            featured BOOLEAN NOT NULL DEFAULT FALSE,
            reviews JSONB NOT NULL DEFAULT '[]'::jsonb,
            created_by UUID REFERENCES users(id) ON DELETE SET NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "orders",
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id UUID PRIMARY KEY,
            user_id UUID REFERENCES users(id) ON DELETE SET NULL,
            items JSONB NOT NULL,
            total_amount DOUBLE PRECISION NOT NULL,
            discount_amount DOUBLE PRECISION,
            coupon_code TEXT,
            shipping_address JSONB NOT NULL,
            payment_method TEXT NOT NULL,
            payment_status TEXT NOT NULL,
            status TEXT NOT NULL,
            status_history JSONB NOT NULL DEFAULT '[]'::jsonb,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            shipped_at TIMESTAMPTZ,
            delivered_at TIMESTAMPTZ
        )
        "#,
    ),
    (
        "shipments",
        r#"
        CREATE TABLE IF NOT EXISTS shipments (
            id UUID PRIMARY KEY,
            order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            tracking_code TEXT NOT NULL UNIQUE,
            carrier TEXT NOT NULL,
            status TEXT NOT NULL,
            events JSONB NOT NULL DEFAULT '[]'::jsonb,
            cancel_reason TEXT,
            estimated_delivery TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS products_category_idx ON products (category)",
    "CREATE INDEX IF NOT EXISTS products_featured_idx ON products (featured) WHERE featured",
    "CREATE INDEX IF NOT EXISTS orders_user_id_idx ON orders (user_id)",
    "CREATE INDEX IF NOT EXISTS orders_status_idx ON orders (status)",
    "CREATE INDEX IF NOT EXISTS shipments_order_id_idx ON shipments (order_id)",
];

/// Create the storefront tables and indexes if missing.
pub async fn ensure_tables(pool: &PgPool) -> Result<(), AppError> {
    for (name, ddl) in TABLES {
        sqlx::query(ddl).execute(pool).await?;
        tracing::debug!(table = name, "table ready");
    }
    for ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}

/// Ensure the database named in `database_url` exists; create it if not. Runs CREATE DATABASE
/// over a connection to the `postgres` maintenance database. Hosted servers often refuse that
/// connection, so failing to reach it is logged and skipped; the pool connect that follows reports
/// the real problem.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let options = parse_options(database_url)?;
    let Some(db_name) = target_database(&options) else {
        return Ok(());
    };
    let mut conn: PgConnection = match options.database(MAINTENANCE_DB).connect().await {
        Ok(conn) => conn,
        Err(e) => {
            let kind = ConnectErrorKind::classify(&e);
            tracing::warn!(
                error = %e,
                kind = %kind,
                database = %db_name,
                "maintenance database unreachable; assuming the target database exists"
            );
            return Ok(());
        }
    };
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "database created");
    }
    Ok(())
}

/// Create the database if needed and connect the pool. Any connection failure on the way is
/// logged with its kind and a remediation hint.
pub async fn open_database(database_url: &str, settings: &PoolSettings) -> Result<PgPool, AppError> {
    if let Err(e) = ensure_database_exists(database_url).await {
        if let AppError::Db(db) = &e {
            ConnectErrorKind::report(db);
        }
        return Err(e);
    }
    connect(database_url, settings).await.map_err(|e| {
        ConnectErrorKind::report(&e);
        AppError::Db(e)
    })
}

fn parse_options(database_url: &str) -> Result<PgConnectOptions, AppError> {
    PgConnectOptions::from_str(database_url).map_err(|e| {
        ConfigError::Invalid {
            var: DATABASE_URL,
            reason: e.to_string(),
        }
        .into()
    })
}

/// The database to create, or None when the URL names none or names the maintenance database.
fn target_database(options: &PgConnectOptions) -> Option<String> {
    options
        .get_database()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != MAINTENANCE_DB)
        .map(str::to_string)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
