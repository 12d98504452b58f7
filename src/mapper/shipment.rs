use crate::error::AppError;
use crate::mapper::{clean, map_all};
use crate::model::{
    NewShipment, OrderStatus, OrderSummary, Shipment, ShipmentStatus, TrackingEvent,
};
use crate::service::validation::{self as check, Validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderRefResponse {
    pub id: Uuid,
    pub status: OrderStatus,
    pub total_amount: f64,
    pub recipient: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEventResponse {
    pub status: ShipmentStatus,
    pub location: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderRefResponse>,
    pub tracking_code: String,
    pub carrier: String,
    pub status: ShipmentStatus,
    pub events: Vec<TrackingEventResponse>,
    pub cancel_reason: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn order_ref(summary: &OrderSummary) -> OrderRefResponse {
    OrderRefResponse {
        id: summary.id,
        status: summary.status,
        total_amount: summary.total_amount,
        recipient: summary.recipient.clone(),
    }
}

fn event_response(event: &TrackingEvent) -> TrackingEventResponse {
    TrackingEventResponse {
        status: event.status,
        location: event.location.clone(),
        description: event.description.clone(),
        occurred_at: event.occurred_at,
    }
}

pub fn to_response(shipment: Option<&Shipment>) -> Option<ShipmentResponse> {
    let s = shipment?;
    Some(ShipmentResponse {
        id: s.id,
        order_id: s.order.id(),
        order: s.order.populated().map(order_ref),
        tracking_code: s.tracking_code.clone(),
        carrier: s.carrier.clone(),
        status: s.status,
        events: s.events.iter().map(event_response).collect(),
        cancel_reason: s.cancel_reason.clone(),
        estimated_delivery: s.estimated_delivery,
        created_at: s.created_at,
        updated_at: s.updated_at,
    })
}

pub fn to_responses(shipments: &[Shipment]) -> Vec<ShipmentResponse> {
    map_all(shipments, to_response)
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateShipmentRequest {
    pub order_id: Uuid,
    pub carrier: String,
    #[serde(default)]
    pub estimated_delivery: Option<DateTime<Utc>>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Validate for CreateShipmentRequest {
    fn validate(&self) -> Result<(), AppError> {
        check::required("carrier", &self.carrier)?;
        check::max_length("carrier", &self.carrier, 100)
    }
}

/// The tracking code is generated by the caller, never taken from the body.
pub fn from_request(req: CreateShipmentRequest, tracking_code: String) -> NewShipment {
    NewShipment {
        order_id: req.order_id,
        tracking_code,
        carrier: req.carrier.trim().to_string(),
        estimated_delivery: req.estimated_delivery,
        note: clean(req.note),
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct TrackingEventRequest {
    pub status: ShipmentStatus,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Validate for TrackingEventRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(location) = &self.location {
            check::max_length("location", location, 200)?;
        }
        if let Some(description) = &self.description {
            check::max_length("description", description, 500)?;
        }
        if self.status == ShipmentStatus::Cancelled {
            return Err(AppError::Validation(
                "use the cancel endpoint to cancel a shipment".into(),
            ));
        }
        Ok(())
    }
}

impl TrackingEventRequest {
    pub fn into_event(self, now: DateTime<Utc>) -> TrackingEvent {
        TrackingEvent {
            status: self.status,
            location: clean(self.location),
            description: clean(self.description),
            occurred_at: now,
        }
    }
}

/// Status-only update; same shape as a tracking event.
pub type UpdateShipmentStatusRequest = TrackingEventRequest;

#[derive(Deserialize, Debug, Clone)]
pub struct CancelShipmentRequest {
    #[serde(default)]
    pub reason: String,
}

impl Validate for CancelShipmentRequest {
    fn validate(&self) -> Result<(), AppError> {
        check::required("reason", &self.reason)?;
        check::max_length("reason", &self.reason, 500)
    }
}
