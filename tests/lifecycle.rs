//! Order, shipment, review and account flows against a real PostgreSQL.
//!
//! Run with: cargo test --test lifecycle -- --ignored --nocapture
//!
//! Each test starts PostgreSQL in a container. Set `STOREFRONT_TEST_DATABASE_URL` to run against
//! an existing server instead.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use storefront::mapper::user::provisioned;
use storefront::model::Role;
use storefront::{app, ensure_tables, open_database, AppState, JwtKeys, UserService};
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &[u8] = b"lifecycle-test-secret";

struct Harness {
    _container: Option<ContainerAsync<GenericImage>>,
    pool: PgPool,
    router: Router,
}

async fn start_postgres() -> (ContainerAsync<GenericImage>, String) {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(5432.tcp())
        .with_wait_for(WaitFor::message_on_stdout(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_USER", "storefront")
        .with_env_var("POSTGRES_PASSWORD", "storefront")
        .with_env_var("POSTGRES_DB", "storefront")
        .with_startup_timeout(Duration::from_secs(60))
        .start()
        .await
        .expect("failed to start postgres container");

    // The ready message is printed once during init and again when the server is up.
    tokio::time::sleep(Duration::from_secs(1)).await;

    let host = container.get_host().await.expect("container host");
    let port = container.get_host_port_ipv4(5432).await.expect("mapped port");
    let url = format!("postgres://storefront:storefront@{}:{}/storefront", host, port);
    (container, url)
}

impl Harness {
    async fn start() -> Self {
        let (container, url) = match std::env::var("STOREFRONT_TEST_DATABASE_URL") {
            Ok(url) => (None, url),
            Err(_) => {
                let (container, url) = start_postgres().await;
                (Some(container), url)
            }
        };
        let pool = open_database(&url, &Default::default()).await.expect("connect");
        ensure_tables(&pool).await.expect("tables");
        let router = app(AppState::new(pool.clone(), JwtKeys::from_secret(SECRET), None), None);
        Harness {
            _container: container,
            pool,
            router,
        }
    }

    /// Stores an account and returns its id with a token for it.
    async fn account(&self, role: Role) -> (Uuid, String) {
        let email = format!("{}@shop.test", Uuid::new_v4().simple());
        let user = UserService::create(&self.pool, provisioned("Tester", &email, "unused".into(), role))
            .await
            .expect("create user");
        let token = JwtKeys::from_secret(SECRET).issue(user.id, role).expect("token");
        (user.id, token)
    }

    async fn send(&self, method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn product(&self, admin: &str) -> String {
        let body = json!({
            "name": "Non la",
            "description": "Palm leaf hat",
            "price": 120000.0,
            "category": "accessories",
            "stock": 20
        });
        let (status, res) = self.send(Method::POST, "/api/products", Some(admin), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{res}");
        res["data"]["id"].as_str().unwrap().to_string()
    }

    async fn guest_order(&self, product_id: &str) -> String {
        let body = json!({
            "items": [{"productId": product_id, "quantity": 2}],
            "shippingAddress": {"fullName": "Tran B", "phone": "0901234567", "address": "12 Hang Bac"}
        });
        let (status, res) = self.send(Method::POST, "/api/orders", None, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{res}");
        res["data"]["id"].as_str().unwrap().to_string()
    }

    async fn ship(&self, staff: &str, order_id: &str) -> String {
        let body = json!({"orderId": order_id, "carrier": "GHN"});
        let (status, res) = self.send(Method::POST, "/api/shipments", Some(staff), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{res}");
        res["data"]["id"].as_str().unwrap().to_string()
    }

    async fn order_status(&self, staff: &str, order_id: &str) -> Value {
        let (status, res) = self.send(Method::GET, &format!("/api/orders/{}", order_id), Some(staff), None).await;
        assert_eq!(status, StatusCode::OK, "{res}");
        res["data"]["status"].clone()
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn shipping_and_delivery_drive_the_order() {
    let h = Harness::start().await;
    let (_, admin) = h.account(Role::Admin).await;
    let product = h.product(&admin).await;
    let order = h.guest_order(&product).await;

    let shipment = h.ship(&admin, &order).await;
    assert_eq!(h.order_status(&admin, &order).await, "shipped");

    let uri = format!("/api/shipments/{}/status", shipment);
    let (status, res) = h
        .send(Method::PATCH, &uri, Some(&admin), Some(json!({"status": "in_transit", "location": "Da Nang"})))
        .await;
    assert_eq!(status, StatusCode::OK, "{res}");
    assert_eq!(h.order_status(&admin, &order).await, "shipped");

    let (status, res) = h
        .send(Method::PATCH, &uri, Some(&admin), Some(json!({"status": "delivered"})))
        .await;
    assert_eq!(status, StatusCode::OK, "{res}");
    assert_eq!(res["data"]["status"], "delivered");
    assert_eq!(h.order_status(&admin, &order).await, "delivered");

    let (status, _) = h
        .send(Method::PATCH, &uri, Some(&admin), Some(json!({"status": "in_transit"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = h
        .send(Method::POST, "/api/shipments", Some(&admin), Some(json!({"orderId": order, "carrier": "GHN"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn cancelled_order_is_never_delivered() {
    let h = Harness::start().await;
    let (_, admin) = h.account(Role::Admin).await;
    let product = h.product(&admin).await;
    let order = h.guest_order(&product).await;
    let shipment = h.ship(&admin, &order).await;

    let (status, res) = h
        .send(
            Method::POST,
            &format!("/api/orders/{}/cancel", order),
            Some(&admin),
            Some(json!({"reason": "customer moved away"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{res}");
    assert_eq!(res["data"]["status"], "cancelled");

    let (status, res) = h
        .send(Method::GET, &format!("/api/shipments/{}", shipment), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["data"]["status"], "cancelled");
    assert_eq!(res["data"]["cancelReason"], "customer moved away");

    let (status, _) = h
        .send(
            Method::PATCH,
            &format!("/api/shipments/{}/status", shipment),
            Some(&admin),
            Some(json!({"status": "delivered"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(h.order_status(&admin, &order).await, "cancelled");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn second_review_from_the_same_customer_conflicts() {
    let h = Harness::start().await;
    let (_, admin) = h.account(Role::Admin).await;
    let (_, customer) = h.account(Role::Customer).await;
    let product = h.product(&admin).await;
    let uri = format!("/api/products/{}/reviews", product);

    let (status, res) = h
        .send(Method::POST, &uri, Some(&customer), Some(json!({"rating": 4, "comment": "good fit"})))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{res}");

    let (status, _) = h
        .send(Method::POST, &uri, Some(&customer), Some(json!({"rating": 1, "comment": "changed my mind"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, res) = h.send(Method::GET, &format!("/api/products/{}", product), None, None).await;
    assert_eq!(res["data"]["reviewCount"], 1);
    assert_eq!(res["data"]["rating"], 4.0);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn role_checks_use_the_stored_account() {
    let h = Harness::start().await;
    let (staff_id, staff) = h.account(Role::Staff).await;
    let (_, customer) = h.account(Role::Customer).await;

    let (status, _) = h.send(Method::GET, "/api/users", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = h
        .send(Method::POST, "/api/shipments", Some(&customer), Some(json!({"carrier": "GHN"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = h.send(Method::GET, "/api/users", Some(&staff), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h
        .send(Method::DELETE, &format!("/api/users/{}", Uuid::new_v4()), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = h
        .send(Method::POST, &format!("/api/shipments/{}/cancel", Uuid::new_v4()), Some(&staff), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let demoted = storefront::model::UserChanges {
        role: Some(Role::Customer),
        ..Default::default()
    };
    UserService::update(&h.pool, staff_id, demoted).await.unwrap();
    let (status, _) = h.send(Method::GET, "/api/users", Some(&staff), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn token_of_a_deleted_account_is_unauthorized() {
    let h = Harness::start().await;
    let (admin_id, admin) = h.account(Role::Admin).await;
    assert!(UserService::delete(&h.pool, admin_id).await.unwrap());

    let body = json!({"name": "Ao dai", "price": 850000.0, "category": "clothing", "stock": 1});
    let (status, res) = h.send(Method::POST, "/api/products", Some(&admin), Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(res["success"], false);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn blank_profile_field_clears_it() {
    let h = Harness::start().await;
    let (_, customer) = h.account(Role::Customer).await;

    let (status, res) = h
        .send(
            Method::PUT,
            "/api/users/me",
            Some(&customer),
            Some(json!({"phone": "0901234567", "city": "Hue"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{res}");
    assert_eq!(res["data"]["phone"], "0901234567");

    let (status, res) = h
        .send(Method::PUT, "/api/users/me", Some(&customer), Some(json!({"phone": ""})))
        .await;
    assert_eq!(status, StatusCode::OK, "{res}");
    assert_eq!(res["data"]["phone"], Value::Null);
    assert_eq!(res["data"]["city"], "Hue");
}
