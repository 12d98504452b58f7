use crate::error::AppError;
use crate::mapper::product::{summary_response as product_summary, ProductSummaryResponse};
use crate::mapper::user::{summary_response as user_summary, UserRefResponse};
use crate::mapper::{clean, map_all};
use crate::model::{
    NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
    ProductSummary, ShippingAddress, StatusChange, DEFAULT_COUNTRY,
};
use crate::service::validation::{self as check, Validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSummaryResponse>,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: f64,
    pub subtotal: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressResponse {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: Option<String>,
    pub country: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeResponse {
    pub status: OrderStatus,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRefResponse>,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: f64,
    pub discount_amount: f64,
    pub coupon_code: Option<String>,
    pub shipping_address: ShippingAddressResponse,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub status_history: Vec<StatusChangeResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

fn item_response(item: &OrderItem) -> OrderItemResponse {
    OrderItemResponse {
        product_id: item.product.id(),
        product: item.product.populated().map(product_summary),
        name: item.name.clone(),
        image: item.image.clone(),
        quantity: item.quantity,
        price: item.price,
        subtotal: item.subtotal(),
    }
}

fn address_response(address: &ShippingAddress) -> ShippingAddressResponse {
    ShippingAddressResponse {
        full_name: address.full_name.clone(),
        phone: address.phone.clone(),
        address: address.address.clone(),
        city: address.city.clone(),
        country: address
            .country
            .clone()
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
    }
}

fn history_response(change: &StatusChange) -> StatusChangeResponse {
    StatusChangeResponse {
        status: change.status,
        note: change.note.clone(),
        changed_at: change.changed_at,
    }
}

pub fn to_response(order: Option<&Order>) -> Option<OrderResponse> {
    let o = order?;
    Some(OrderResponse {
        id: o.id,
        user_id: o.user_id(),
        user: o
            .user
            .as_ref()
            .and_then(|u| u.populated())
            .map(user_summary),
        items: o.items.iter().map(item_response).collect(),
        total_amount: o.total_amount,
        discount_amount: o.discount_amount.unwrap_or(0.0),
        coupon_code: o.coupon_code.clone(),
        shipping_address: address_response(&o.shipping_address),
        payment_method: o.payment_method,
        payment_status: o.payment_status,
        status: o.status,
        status_history: o.status_history.iter().map(history_response).collect(),
        created_at: o.created_at,
        updated_at: o.updated_at,
        shipped_at: o.shipped_at,
        delivered_at: o.delivered_at,
    })
}

pub fn to_responses(orders: &[Order]) -> Vec<OrderResponse> {
    map_all(orders, to_response)
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: u32,
    #[serde(default)]
    pub price: Option<f64>,
}

impl Validate for OrderItemInput {
    fn validate(&self) -> Result<(), AppError> {
        if self.quantity < 1 {
            return Err(AppError::Validation("quantity must be at least 1".into()));
        }
        if let Some(price) = self.price {
            check::at_least("price", price, 0.0)?;
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressInput {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Validate for ShippingAddressInput {
    fn validate(&self) -> Result<(), AppError> {
        check::required("shippingAddress.fullName", &self.full_name)?;
        check::required("shippingAddress.phone", &self.phone)?;
        check::phone("shippingAddress.phone", Some(&self.phone))?;
        check::required("shippingAddress.address", &self.address)
    }
}

impl From<ShippingAddressInput> for ShippingAddress {
    fn from(input: ShippingAddressInput) -> Self {
        ShippingAddress {
            full_name: input.full_name.trim().to_string(),
            phone: input.phone.trim().to_string(),
            address: input.address.trim().to_string(),
            city: clean(input.city),
            country: clean(input.country),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemInput>,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub discount_amount: Option<f64>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    pub shipping_address: ShippingAddressInput,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl Validate for CreateOrderRequest {
    fn validate(&self) -> Result<(), AppError> {
        check::not_empty("items", &self.items)?;
        self.items.validate()?;
        if let Some(total) = self.total_amount {
            check::at_least("totalAmount", total, 0.0)?;
        }
        if let Some(discount) = self.discount_amount {
            check::at_least("discountAmount", discount, 0.0)?;
        }
        self.shipping_address.validate()
    }
}

impl CreateOrderRequest {
    pub fn product_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.items.iter().map(|i| i.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// `user_id` is the authenticated caller (or `None` for guests); product names,
/// images and default prices are snapshotted from `catalog`.
pub fn from_request(
    req: CreateOrderRequest,
    user_id: Option<Uuid>,
    catalog: &HashMap<Uuid, ProductSummary>,
) -> NewOrder {
    let items: Vec<NewOrderItem> = req
        .items
        .into_iter()
        .map(|input| {
            let product = catalog.get(&input.product_id);
            NewOrderItem {
                product_id: input.product_id,
                name: product.map(|p| p.name.clone()).unwrap_or_default(),
                image: product.and_then(|p| p.image.clone()),
                quantity: input.quantity,
                price: input
                    .price
                    .or_else(|| product.map(|p| p.price))
                    .unwrap_or(0.0),
            }
        })
        .collect();
    let subtotal: f64 = items.iter().map(|i| f64::from(i.quantity) * i.price).sum();
    let discount = req.discount_amount.unwrap_or(0.0);
    NewOrder {
        user_id,
        total_amount: req
            .total_amount
            .unwrap_or_else(|| (subtotal - discount).max(0.0)),
        items,
        discount_amount: req.discount_amount,
        coupon_code: clean(req.coupon_code).map(|c| c.to_uppercase()),
        shipping_address: req.shipping_address.into(),
        payment_method: req.payment_method,
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
}

impl Validate for UpdateOrderStatusRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(note) = &self.note {
            check::max_length("note", note, 500)?;
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub payment_status: PaymentStatus,
}

impl Validate for UpdatePaymentRequest {
    fn validate(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CancelOrderRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

impl Validate for CancelOrderRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(reason) = &self.reason {
            check::max_length("reason", reason, 500)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Ref, UserSummary};
    use serde_json::json;

    fn request(with_prices: bool) -> CreateOrderRequest {
        let mut body = json!({
            "items": [
                {"productId": "6f1c2a4e-8d3b-4e5f-9a7b-1c2d3e4f5a6b", "quantity": 2},
                {"productId": "0a9b8c7d-6e5f-4a3b-8c1d-2e3f4a5b6c7d", "quantity": 1}
            ],
            "discountAmount": 20.0,
            "couponCode": " tet2026 ",
            "shippingAddress": {
                "fullName": "Nguyen Van A",
                "phone": "+84 912 345 678",
                "address": "12 Ly Thuong Kiet",
                "city": "Hanoi"
            },
            "paymentMethod": "bank_transfer",
            "userId": "00000000-0000-0000-0000-000000000000"
        });
        if with_prices {
            body["items"][0]["price"] = json!(100.0);
            body["items"][1]["price"] = json!(55.5);
            body["totalAmount"] = json!(235.5);
        }
        serde_json::from_value(body).unwrap()
    }

    fn catalog() -> HashMap<Uuid, ProductSummary> {
        let a = Uuid::parse_str("6f1c2a4e-8d3b-4e5f-9a7b-1c2d3e4f5a6b").unwrap();
        let b = Uuid::parse_str("0a9b8c7d-6e5f-4a3b-8c1d-2e3f4a5b6c7d").unwrap();
        [
            ProductSummary { id: a, name: "Non la".into(), price: 80.0, image: Some("a.jpg".into()) },
            ProductSummary { id: b, name: "Ca phe".into(), price: 40.0, image: None },
        ]
        .into_iter()
        .map(|p| (p.id, p))
        .collect()
    }

    #[test]
    fn none_maps_to_none() {
        assert!(to_response(None).is_none());
    }

    #[test]
    fn user_id_comes_from_caller_not_body() {
        let caller = Uuid::new_v4();
        let new_order = from_request(request(true), Some(caller), &catalog());
        assert_eq!(new_order.user_id, Some(caller));
        let guest = from_request(request(true), None, &catalog());
        assert_eq!(guest.user_id, None);
    }

    #[test]
    fn client_prices_and_total_are_kept() {
        let new_order = from_request(request(true), None, &catalog());
        assert_eq!(new_order.items[0].price, 100.0);
        assert_eq!(new_order.total_amount, 235.5);
        assert_eq!(new_order.items[0].name, "Non la");
        assert_eq!(new_order.coupon_code.as_deref(), Some("TET2026"));
    }

    #[test]
    fn missing_prices_fall_back_to_catalog() {
        let new_order = from_request(request(false), None, &catalog());
        assert_eq!(new_order.items[0].price, 80.0);
        assert_eq!(new_order.items[1].price, 40.0);
        assert_eq!(new_order.total_amount, 2.0 * 80.0 + 40.0 - 20.0);
    }

    #[test]
    fn mapped_subtotal_is_quantity_times_price() {
        let order = from_request(request(true), None, &catalog()).into_record(Uuid::new_v4(), Utc::now());
        let out = to_response(Some(&order)).unwrap();
        for item in &out.items {
            assert_eq!(item.subtotal, f64::from(item.quantity) * item.price);
        }
        assert_eq!(out.items[0].subtotal, 200.0);
    }

    #[test]
    fn round_trip_and_defaults() {
        let req = request(true);
        req.validate().unwrap();
        let order = from_request(req.clone(), None, &catalog()).into_record(Uuid::new_v4(), Utc::now());
        let out = to_response(Some(&order)).unwrap();
        assert_eq!(out.items.len(), req.items.len());
        assert_eq!(out.items[1].product_id, req.items[1].product_id);
        assert_eq!(out.items[1].quantity, 1);
        assert_eq!(out.discount_amount, 20.0);
        assert_eq!(out.payment_method, PaymentMethod::BankTransfer);
        assert_eq!(out.shipping_address.full_name, "Nguyen Van A");
        assert_eq!(out.shipping_address.city.as_deref(), Some("Hanoi"));
        assert_eq!(out.shipping_address.country, "Vietnam");
        assert_eq!(out.status, OrderStatus::Pending);
        assert_eq!(out.status_history.len(), 1);

        let mut order = order;
        order.discount_amount = None;
        assert_eq!(to_response(Some(&order)).unwrap().discount_amount, 0.0);
    }

    #[test]
    fn populated_refs_are_included() {
        let mut order = from_request(request(true), None, &catalog()).into_record(Uuid::new_v4(), Utc::now());
        let user = UserSummary { id: Uuid::new_v4(), name: "Lan".into(), email: Some("lan@shop.vn".into()) };
        order.user = Some(Ref::Populated(user.clone()));
        let product = catalog().into_values().next().unwrap();
        order.items[0].product = Ref::Populated(product.clone());
        let json = serde_json::to_value(to_response(Some(&order)).unwrap()).unwrap();
        assert_eq!(json["userId"], json!(user.id));
        assert_eq!(json["user"]["name"], "Lan");
        assert_eq!(json["items"][0]["productId"], json!(product.id));
        assert_eq!(json["items"][0]["product"]["name"], json!(product.name));
        assert!(json["items"][1].get("product").is_none());
    }

    #[test]
    fn empty_items_rejected() {
        let mut req = request(true);
        req.items.clear();
        assert!(req.validate().unwrap_err().to_string().contains("items"));
        let mut req = request(true);
        req.items[0].quantity = 0;
        assert!(req.validate().is_err());
        let mut req = request(true);
        req.shipping_address.full_name = "".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn payment_method_defaults_to_cod() {
        let req: CreateOrderRequest = serde_json::from_value(json!({
            "items": [{"productId": Uuid::new_v4(), "quantity": 1}],
            "shippingAddress": {"fullName": "B", "phone": "0912345678", "address": "x"}
        }))
        .unwrap();
        assert_eq!(req.payment_method, PaymentMethod::Cod);
    }

    #[test]
    fn list_mapping() {
        let order = from_request(request(true), None, &catalog()).into_record(Uuid::new_v4(), Utc::now());
        assert_eq!(to_responses(&[order.clone(), order]).len(), 2);
    }
}
