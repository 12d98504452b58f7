//! Storefront HTTP server.

use std::process::ExitCode;
use storefront::connection::{shutdown_signal, spawn_monitor};
use storefront::{app, ensure_tables, init_tracing, open_database, AppConfig, AppState, GeminiClient, JwtKeys};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(?config, "configuration loaded");

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server stopped with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pool = open_database(&config.database_url, &config.pool).await?;
    ensure_tables(&pool).await?;

    let jwt = match &config.jwt_secret {
        Some(secret) => JwtKeys::from_secret(secret.as_bytes()),
        None => {
            tracing::warn!("JWT_SECRET is not set; using an ephemeral secret, tokens will not survive a restart");
            JwtKeys::ephemeral()
        }
    };
    let ai = match config.gemini.clone() {
        Some(settings) => Some(GeminiClient::new(settings)?),
        None => {
            tracing::info!("GEMINI_API_KEY is not set; AI chat is disabled");
            None
        }
    };
    if let Some(client) = &ai {
        tracing::info!(model = client.model(), "AI chat enabled");
    }

    let monitor = spawn_monitor(pool.clone(), config.pool.monitor_interval);
    let state = AppState::new(pool.clone(), jwt, ai);
    let router = app(state, config.cors_origin.as_deref());

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor.abort();
    pool.close().await;
    tracing::info!("database pool closed");
    Ok(())
}
