//! Pool construction, connection diagnostics, liveness events and shutdown.

mod diagnose;
mod monitor;
mod shutdown;

pub use diagnose::ConnectErrorKind;
pub use monitor::{spawn_monitor, ConnectionEvent, ConnectionMonitor};
pub use shutdown::shutdown_signal;

use crate::config::PoolSettings;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;

/// Pool options from the static settings. Requests wait in the acquire queue up to `acquire_timeout`.
pub fn pool_options(settings: &PoolSettings) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .idle_timeout(Some(settings.idle_timeout))
}

/// Connect eagerly and log `connected` for every physical connection the pool opens.
pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<PgPool, sqlx::Error> {
    let options = PgConnectOptions::from_str(database_url)?;
    pool_options(settings)
        .after_connect(|_conn, meta| {
            Box::pin(async move {
                ConnectionEvent::Connected.log();
                tracing::debug!(age = ?meta.age, "pool connection ready");
                Ok(())
            })
        })
        .connect_with(options)
        .await
}

/// Pool that connects on first use.
pub fn connect_lazy(database_url: &str, settings: &PoolSettings) -> Result<PgPool, sqlx::Error> {
    pool_options(settings).connect_lazy(database_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lazy_pool_uses_static_settings() {
        let settings = PoolSettings::default();
        let pool = connect_lazy("postgres://app:pw@127.0.0.1:1/storefront", &settings).unwrap();
        assert_eq!(pool.options().get_max_connections(), 10);
        assert_eq!(pool.options().get_acquire_timeout(), settings.acquire_timeout);
        assert_eq!(pool.options().get_idle_timeout(), Some(settings.idle_timeout));
        assert_eq!(pool.size(), 0);
    }
}
