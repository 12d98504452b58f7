//! Common routes: health, readiness, version.

use crate::error::AppError;
use crate::response::success_one_ok;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    database: &'static str,
}

#[derive(Serialize)]
struct VersionBody {
    name: &'static str,
    version: &'static str,
}

async fn health() -> impl IntoResponse {
    success_one_ok(HealthBody { status: "ok" })
}

async fn ready(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    if let Err(e) = sqlx::query("SELECT 1").execute(&state.pool).await {
        tracing::warn!(error = %e, "readiness check failed");
        return Err(AppError::Unavailable("database unavailable".into()));
    }
    Ok(success_one_ok(ReadyBody {
        status: "ok",
        database: "ok",
    }))
}

async fn version() -> impl IntoResponse {
    success_one_ok(VersionBody {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /health, GET /ready (database ping), GET /version.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}
