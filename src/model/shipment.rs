use crate::extractors::Listing;
use crate::model::{OrderSummary, Ref};
use crate::sql::{Column, TableDef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

text_enum!(ShipmentStatus {
    Pending => "pending",
    PickedUp => "picked_up",
    InTransit => "in_transit",
    OutForDelivery => "out_for_delivery",
    Delivered => "delivered",
    Failed => "failed",
    Cancelled => "cancelled",
});

impl ShipmentStatus {
    /// No further carrier movement is expected.
    pub fn is_final(self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Cancelled)
    }
}

/// Carrier tracking event. Stored as JSONB on the shipment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub status: ShipmentStatus,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Shipment {
    pub id: Uuid,
    pub order: Ref<OrderSummary>,
    pub tracking_code: String,
    pub carrier: String,
    pub status: ShipmentStatus,
    pub events: Vec<TrackingEvent>,
    pub cancel_reason: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    /// Record a tracking event; the shipment takes the event's status.
    pub fn record_event(&mut self, event: TrackingEvent) {
        self.status = event.status;
        self.updated_at = event.occurred_at;
        self.events.push(event);
    }

    pub fn cancel(&mut self, reason: String, now: DateTime<Utc>) {
        self.record_event(TrackingEvent {
            status: ShipmentStatus::Cancelled,
            location: None,
            description: Some(reason.clone()),
            occurred_at: now,
        });
        self.cancel_reason = Some(reason);
    }
}

const TRACKING_PREFIX: &str = "SF";

/// `SF` followed by ten uppercase hex digits.
pub fn generate_tracking_code() -> String {
    let raw = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}{}", TRACKING_PREFIX, &raw[..10])
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewShipment {
    pub order_id: Uuid,
    pub tracking_code: String,
    pub carrier: String,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl NewShipment {
    pub fn into_record(self, id: Uuid, now: DateTime<Utc>) -> Shipment {
        Shipment {
            id,
            order: Ref::Id(self.order_id),
            tracking_code: self.tracking_code,
            carrier: self.carrier,
            status: ShipmentStatus::Pending,
            events: vec![TrackingEvent {
                status: ShipmentStatus::Pending,
                location: None,
                description: self.note,
                occurred_at: now,
            }],
            cancel_reason: None,
            estimated_delivery: self.estimated_delivery,
            created_at: now,
            updated_at: now,
        }
    }
}

const SHIPMENTS_TABLE: TableDef = TableDef {
    alias: "s",
    from: "shipments s LEFT JOIN orders o ON o.id = s.order_id",
    select: "s.*, o.status AS order_status, o.total_amount AS order_total, \
             o.shipping_address->>'full_name' AS order_recipient",
    columns: &[
        Column { api: "createdAt", name: "created_at", pg_type: "timestamptz" },
        Column { api: "status", name: "status", pg_type: "text" },
        Column { api: "estimatedDelivery", name: "estimated_delivery", pg_type: "timestamptz" },
        Column { api: "carrier", name: "carrier", pg_type: "text" },
        Column { api: "orderId", name: "order_id", pg_type: "uuid" },
    ],
    default_sort: "created_at",
};

impl Listing for Shipment {
    const SORTABLE: &'static [&'static str] = &["createdAt", "status", "estimatedDelivery"];
    const FILTERABLE: &'static [&'static str] = &["status", "carrier", "orderId"];
    const TABLE: &'static TableDef = &SHIPMENTS_TABLE;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipment() -> Shipment {
        NewShipment {
            order_id: Uuid::new_v4(),
            tracking_code: generate_tracking_code(),
            carrier: "GHN".into(),
            estimated_delivery: None,
            note: Some("label printed".into()),
        }
        .into_record(Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn tracking_code_shape() {
        let code = generate_tracking_code();
        assert_eq!(code.len(), 12);
        assert!(code.starts_with("SF"));
        assert!(code[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_ne!(code, generate_tracking_code());
    }

    #[test]
    fn new_shipment_has_initial_event() {
        let s = shipment();
        assert_eq!(s.status, ShipmentStatus::Pending);
        assert_eq!(s.events.len(), 1);
        assert_eq!(s.events[0].description.as_deref(), Some("label printed"));
    }

    #[test]
    fn events_drive_status() {
        let mut s = shipment();
        let at = Utc::now();
        s.record_event(TrackingEvent {
            status: ShipmentStatus::InTransit,
            location: Some("Da Nang hub".into()),
            description: None,
            occurred_at: at,
        });
        assert_eq!(s.status, ShipmentStatus::InTransit);
        assert_eq!(s.updated_at, at);
        assert!(!s.status.is_final());
    }

    #[test]
    fn cancel_keeps_reason() {
        let mut s = shipment();
        s.cancel("customer refused".into(), Utc::now());
        assert_eq!(s.status, ShipmentStatus::Cancelled);
        assert_eq!(s.cancel_reason.as_deref(), Some("customer refused"));
        assert!(s.status.is_final());
    }

    #[test]
    fn listing_fields_are_backed_by_columns() {
        for field in Shipment::SORTABLE.iter().chain(Shipment::FILTERABLE) {
            assert!(Shipment::TABLE.column(field).is_some(), "no column for {field}");
        }
    }
}
