//! Resource routes, nested under `/api`.

use crate::handlers::{ai, auth, orders, products, shipments, users};
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list))
        .route("/me", get(users::me).put(users::update_me))
        .route("/:id", get(users::get).put(users::update).delete(users::delete))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route("/featured", get(products::featured))
        .route(
            "/:id",
            get(products::get).put(products::update).delete(products::delete),
        )
        .route("/:id/reviews", post(products::add_review))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list).post(orders::create))
        .route("/my", get(orders::my))
        .route("/:id", get(orders::get).delete(orders::delete))
        .route("/:id/status", patch(orders::update_status))
        .route("/:id/payment", patch(orders::update_payment))
        .route("/:id/cancel", post(orders::cancel))
}

fn shipment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shipments::list).post(shipments::create))
        .route("/order/:order_id", get(shipments::by_order))
        .route("/track/:code", get(shipments::track))
        .route("/:id", get(shipments::get).delete(shipments::delete))
        .route("/:id/status", patch(shipments::update_status))
        .route("/:id/tracking", post(shipments::add_tracking))
        .route("/:id/cancel", post(shipments::cancel))
}

/// Every resource router, to be nested at `/api`.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/products", product_routes())
        .nest("/orders", order_routes())
        .nest("/shipments", shipment_routes())
        .route("/ai/chat", post(ai::chat))
        .with_state(state)
}
