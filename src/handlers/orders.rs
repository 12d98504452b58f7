use crate::error::AppError;
use crate::extractors::{AuthUser, Filtered, MaybeAuthUser, Pagination, Sorted, StaffUser, ValidatedJson};
use crate::handlers::{found, parse_id};
use crate::mapper::order::{
    self as order_mapper, CancelOrderRequest, CreateOrderRequest, UpdateOrderStatusRequest, UpdatePaymentRequest,
};
use crate::model::{Order, OrderStatus};
use crate::response::{success_message, success_one, success_one_ok, success_page};
use crate::service::{OrderService, ProductService};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;

pub async fn create(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    ValidatedJson(body): ValidatedJson<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = ProductService::summaries(&state.pool, &body.product_ids()).await?;
    if let Some(missing) = body.product_ids().into_iter().find(|id| !catalog.contains_key(id)) {
        return Err(AppError::NotFound(format!("product {}", missing)));
    }
    let new_order = order_mapper::from_request(body, caller.map(|c| c.id), &catalog);
    let order = OrderService::create(&state.pool, new_order).await?;
    let order = OrderService::find(&state.pool, order.id).await?.unwrap_or(order);
    Ok(success_one(order_mapper::to_response(Some(&order))))
}

pub async fn list(
    State(state): State<AppState>,
    _staff: StaffUser,
    page: Pagination,
    sort: Sorted<Order>,
    filter: Filtered<Order>,
) -> Result<impl IntoResponse, AppError> {
    let (orders, total) = OrderService::list(&state.pool, &filter.spec, &sort.spec, &page).await?;
    Ok(success_page(order_mapper::to_responses(&orders), &page, total))
}

pub async fn my(
    State(state): State<AppState>,
    caller: AuthUser,
    page: Pagination,
    sort: Sorted<Order>,
) -> Result<impl IntoResponse, AppError> {
    let (orders, total) = OrderService::list_for_user(&state.pool, caller.id, &sort.spec, &page).await?;
    Ok(success_page(order_mapper::to_responses(&orders), &page, total))
}

pub async fn get(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let order = found(OrderService::find(&state.pool, parse_id(&id)?).await?, "order")?;
    caller.require_self_or_staff(order.user_id())?;
    Ok(success_one_ok(order_mapper::to_response(Some(&order))))
}

pub async fn update_status(
    State(state): State<AppState>,
    StaffUser(caller): StaffUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let order = OrderService::modify(&state.pool, id, |order| {
        order.apply_status(body.status, body.note.filter(|n| !n.trim().is_empty()), Utc::now());
        Ok(())
    })
    .await?;
    let order = found(order, "order")?;
    tracing::info!(order_id = %id, by = %caller.id, status = %order.status, "order status changed");
    Ok(success_one_ok(order_mapper::to_response(Some(&order))))
}

pub async fn update_payment(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdatePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let order = found(
        OrderService::update_payment(&state.pool, parse_id(&id)?, body.payment_status).await?,
        "order",
    )?;
    Ok(success_one_ok(order_mapper::to_response(Some(&order))))
}

/// Owners may cancel while the order is pending or confirmed; staff at any point before delivery.
/// Open shipments of the order are cancelled with it.
pub async fn cancel(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<CancelOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let order = OrderService::modify(&state.pool, id, |order| {
        check_cancellable(order, &caller)?;
        let note = body
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .or_else(|| Some(cancel_note(&caller).to_string()));
        order.apply_status(OrderStatus::Cancelled, note, Utc::now());
        Ok(())
    })
    .await?;
    let order = found(order, "order")?;
    tracing::info!(order_id = %id, by = %caller.id, "order cancelled");
    Ok(success_one_ok(order_mapper::to_response(Some(&order))))
}

fn cancel_note(caller: &AuthUser) -> &'static str {
    if caller.is_staff() {
        "Cancelled by staff"
    } else {
        "Cancelled by customer"
    }
}

fn check_cancellable(order: &Order, caller: &AuthUser) -> Result<(), AppError> {
    caller.require_self_or_staff(order.user_id())?;
    match order.status {
        OrderStatus::Cancelled => Err(AppError::Conflict("order is already cancelled".into())),
        OrderStatus::Delivered => Err(AppError::Conflict("cannot cancel a delivered order".into())),
        _ if !caller.is_staff() && !order.cancellable_by_customer() => Err(AppError::Conflict(format!(
            "order can no longer be cancelled (status: {})",
            order.status
        ))),
        _ => Ok(()),
    }
}

pub async fn delete(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !OrderService::delete(&state.pool, parse_id(&id)?).await? {
        return Err(AppError::NotFound("order".into()));
    }
    Ok(success_message("order deleted"))
}
