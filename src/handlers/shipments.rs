use crate::error::AppError;
use crate::extractors::{AuthUser, Filtered, Pagination, Sorted, StaffUser, ValidatedJson};
use crate::handlers::{found, parse_id};
use crate::mapper::shipment::{
    self as shipment_mapper, CancelShipmentRequest, CreateShipmentRequest, TrackingEventRequest,
    UpdateShipmentStatusRequest,
};
use crate::model::{generate_tracking_code, Ref, Shipment};
use crate::response::{success_many, success_message, success_one, success_one_ok, success_page};
use crate::service::{OrderService, ShipmentService};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

/// Customers may only see shipments of their own orders.
async fn require_order_access(state: &AppState, caller: &AuthUser, order_id: Uuid) -> Result<(), AppError> {
    if caller.is_staff() {
        return Ok(());
    }
    let order = found(OrderService::find(&state.pool, order_id).await?, "order")?;
    caller.require_self_or_staff(order.user_id())
}

/// Public tracking shows carrier progress only, not the order behind it.
fn public_view(mut shipment: Shipment) -> Shipment {
    shipment.order = Ref::Id(shipment.order.id());
    shipment
}

pub async fn create(
    State(state): State<AppState>,
    StaffUser(caller): StaffUser,
    ValidatedJson(body): ValidatedJson<CreateShipmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_shipment = shipment_mapper::from_request(body, generate_tracking_code());
    let shipment = ShipmentService::create(&state.pool, new_shipment).await?;
    tracing::info!(shipment_id = %shipment.id, code = %shipment.tracking_code, by = %caller.id, "shipment created");
    Ok(success_one(shipment_mapper::to_response(Some(&shipment))))
}

pub async fn list(
    State(state): State<AppState>,
    _staff: StaffUser,
    page: Pagination,
    sort: Sorted<Shipment>,
    filter: Filtered<Shipment>,
) -> Result<impl IntoResponse, AppError> {
    let (shipments, total) = ShipmentService::list(&state.pool, &filter.spec, &sort.spec, &page).await?;
    Ok(success_page(shipment_mapper::to_responses(&shipments), &page, total))
}

pub async fn get(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let shipment = found(ShipmentService::find(&state.pool, parse_id(&id)?).await?, "shipment")?;
    require_order_access(&state, &caller, shipment.order.id()).await?;
    Ok(success_one_ok(shipment_mapper::to_response(Some(&shipment))))
}

pub async fn by_order(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let order_id = parse_id(&order_id)?;
    require_order_access(&state, &caller, order_id).await?;
    let shipments = ShipmentService::find_by_order(&state.pool, order_id).await?;
    Ok(success_many(shipment_mapper::to_responses(&shipments)))
}

pub async fn track(State(state): State<AppState>, Path(code): Path<String>) -> Result<impl IntoResponse, AppError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::BadRequest("tracking code is required".into()));
    }
    let shipment = found(ShipmentService::find_by_tracking_code(&state.pool, code).await?, "shipment")?;
    Ok(success_one_ok(shipment_mapper::to_response(Some(&public_view(shipment)))))
}

pub async fn update_status(
    State(state): State<AppState>,
    StaffUser(caller): StaffUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateShipmentStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let shipment = found(
        ShipmentService::record_event(&state.pool, id, body.into_event(Utc::now())).await?,
        "shipment",
    )?;
    tracing::info!(shipment_id = %id, status = %shipment.status, by = %caller.id, "shipment status changed");
    Ok(success_one_ok(shipment_mapper::to_response(Some(&shipment))))
}

pub async fn add_tracking(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<TrackingEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let shipment = found(
        ShipmentService::record_event(&state.pool, parse_id(&id)?, body.into_event(Utc::now())).await?,
        "shipment",
    )?;
    Ok(success_one(shipment_mapper::to_response(Some(&shipment))))
}

pub async fn cancel(
    State(state): State<AppState>,
    StaffUser(caller): StaffUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<CancelShipmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let reason = body.reason.trim().to_string();
    let shipment = found(ShipmentService::cancel(&state.pool, id, reason).await?, "shipment")?;
    tracing::info!(shipment_id = %id, by = %caller.id, "shipment cancelled");
    Ok(success_one_ok(shipment_mapper::to_response(Some(&shipment))))
}

pub async fn delete(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !ShipmentService::delete(&state.pool, parse_id(&id)?).await? {
        return Err(AppError::NotFound("shipment".into()));
    }
    Ok(success_message("shipment deleted"))
}
