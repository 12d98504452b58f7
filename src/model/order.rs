use crate::extractors::Listing;
use crate::model::{Identified, ProductSummary, Ref, UserSummary};
use crate::sql::{Column, TableDef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

text_enum!(OrderStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

text_enum!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

text_enum!(PaymentMethod {
    Cod => "cod",
    BankTransfer => "bank_transfer",
    CreditCard => "credit_card",
    EWallet => "e_wallet",
});

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cod
    }
}

/// Stored as JSONB on the order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// One entry of the status log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderItem {
    pub product: Ref<ProductSummary>,
    /// Name and image at the time of ordering.
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: f64,
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        f64::from(self.quantity) * self.price
    }
}

/// Line item as stored in the `items` JSONB column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItemDoc {
    pub product_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub quantity: u32,
    pub price: f64,
}

impl From<&OrderItem> for OrderItemDoc {
    fn from(item: &OrderItem) -> Self {
        OrderItemDoc {
            product_id: item.product.id(),
            name: item.name.clone(),
            image: item.image.clone(),
            quantity: item.quantity,
            price: item.price,
        }
    }
}

impl OrderItemDoc {
    pub fn into_item(self, product: Option<ProductSummary>) -> OrderItem {
        OrderItem {
            product: Ref::resolve(self.product_id, product),
            name: self.name,
            image: self.image,
            quantity: self.quantity,
            price: self.price,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub id: Uuid,
    /// `None` for guest checkout.
    pub user: Option<Ref<UserSummary>>,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub discount_amount: Option<f64>,
    pub coupon_code: Option<String>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub status_history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn user_id(&self) -> Option<Uuid> {
        self.user.as_ref().map(Ref::id)
    }

    pub fn items_subtotal(&self) -> f64 {
        self.items.iter().map(OrderItem::subtotal).sum()
    }

    /// Customers may cancel only before the order is being prepared.
    pub fn cancellable_by_customer(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    /// Move to `status`, append to the history and stamp shipped/delivered times.
    /// Transitions are not restricted; the log records whatever staff decide.
    pub fn apply_status(&mut self, status: OrderStatus, note: Option<String>, now: DateTime<Utc>) {
        self.status = status;
        self.status_history.push(StatusChange {
            status,
            note,
            changed_at: now,
        });
        match status {
            OrderStatus::Shipped => self.shipped_at = Some(now),
            OrderStatus::Delivered => self.delivered_at = Some(now),
            _ => {}
        }
        self.updated_at = now;
    }

    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            id: self.id,
            status: self.status,
            total_amount: self.total_amount,
            recipient: Some(self.shipping_address.full_name.clone()),
        }
    }
}

/// What a populated order reference (on a shipment) carries.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderSummary {
    pub id: Uuid,
    pub status: OrderStatus,
    pub total_amount: f64,
    pub recipient: Option<String>,
}

impl Identified for OrderSummary {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder {
    pub user_id: Option<Uuid>,
    pub items: Vec<NewOrderItem>,
    pub total_amount: f64,
    pub discount_amount: Option<f64>,
    pub coupon_code: Option<String>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

pub const ORDER_PLACED_NOTE: &str = "Order placed";

impl NewOrder {
    /// The record as it is inserted: pending, unpaid, with the initial history entry.
    pub fn into_record(self, id: Uuid, now: DateTime<Utc>) -> Order {
        Order {
            id,
            user: self.user_id.map(Ref::Id),
            items: self
                .items
                .into_iter()
                .map(|i| OrderItem {
                    product: Ref::Id(i.product_id),
                    name: i.name,
                    image: i.image,
                    quantity: i.quantity,
                    price: i.price,
                })
                .collect(),
            total_amount: self.total_amount,
            discount_amount: self.discount_amount,
            coupon_code: self.coupon_code,
            shipping_address: self.shipping_address,
            payment_method: self.payment_method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            status_history: vec![StatusChange {
                status: OrderStatus::Pending,
                note: Some(ORDER_PLACED_NOTE.to_string()),
                changed_at: now,
            }],
            created_at: now,
            updated_at: now,
            shipped_at: None,
            delivered_at: None,
        }
    }
}

const ORDERS_TABLE: TableDef = TableDef {
    alias: "o",
    from: "orders o LEFT JOIN users u ON u.id = o.user_id",
    select: "o.*, u.name AS user_name, u.email AS user_email",
    columns: &[
        Column { api: "createdAt", name: "created_at", pg_type: "timestamptz" },
        Column { api: "totalAmount", name: "total_amount", pg_type: "double precision" },
        Column { api: "status", name: "status", pg_type: "text" },
        Column { api: "paymentStatus", name: "payment_status", pg_type: "text" },
        Column { api: "paymentMethod", name: "payment_method", pg_type: "text" },
        Column { api: "userId", name: "user_id", pg_type: "uuid" },
    ],
    default_sort: "created_at",
};

impl Listing for Order {
    const SORTABLE: &'static [&'static str] = &["createdAt", "totalAmount", "status"];
    const FILTERABLE: &'static [&'static str] = &["status", "paymentStatus", "paymentMethod", "userId"];
    const TABLE: &'static TableDef = &ORDERS_TABLE;
}
