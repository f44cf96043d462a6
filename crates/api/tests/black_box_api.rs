use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use orderdesk_api::app::{build_app, services::AppServices};
use orderdesk_auth::{Hs256Jwt, JwtValidator};
use orderdesk_infra::{InMemoryOrdersStore, OrdersStore};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    store: Arc<InMemoryOrdersStore>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        orderdesk_observability::tracing::init_for_tests();

        // Same router as prod, in-memory store, ephemeral port.
        let store = Arc::new(InMemoryOrdersStore::new());
        let jwt = Hs256Jwt::new(JWT_SECRET, ChronoDuration::minutes(1000));
        let app = build_app(AppServices::new(store.clone(), jwt));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(&body).send().await.unwrap()
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn alice_order() -> Value {
    json!({
        "customerName": "Alice",
        "location": "NYC",
        "items": [
            { "itemCode": "A-1", "description": "anvil", "quantity": 2 },
            { "itemCode": "B-2", "description": "bucket", "quantity": 5 }
        ]
    })
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    assert_eq!(srv.get("/health").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_order_assigns_ids_and_timestamp() {
    let srv = TestServer::spawn().await;

    let res = srv.post("/orders", alice_order()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let created: Value = res.json().await.unwrap();

    let order_id = created["orderId"].as_i64().unwrap();
    assert!(order_id > 0);
    assert_eq!(created["customerName"], "Alice");
    assert_eq!(created["location"], "NYC");
    assert!(created["orderedAt"].is_string());

    let line_ids: Vec<i64> = created["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["lineItemId"].as_i64().unwrap())
        .collect();
    assert_eq!(line_ids.len(), 2);
    assert!(line_ids.iter().all(|id| *id > 0));
    assert_ne!(line_ids[0], line_ids[1]);

    let res = srv.get(&format!("/orders/{order_id}")).await;
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn client_supplied_ids_are_ignored_on_create() {
    let srv = TestServer::spawn().await;

    let first: Value = srv.post("/orders", alice_order()).await.json().await.unwrap();
    let mut body = alice_order();
    body["orderId"] = first["orderId"].clone();
    let second: Value = srv.post("/orders", body).await.json().await.unwrap();

    assert_ne!(first["orderId"], second["orderId"]);
    assert_eq!(srv.get("/orders").await.json::<Vec<Value>>().await.unwrap().len(), 2);
}

#[tokio::test]
async fn get_order_reports_missing_and_invalid_ids() {
    let srv = TestServer::spawn().await;

    let res = srv.get("/orders/424242").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
    assert!(body["message"].is_string());

    assert_eq!(srv.get("/orders/abc").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(srv.get("/orders/0").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_orders_includes_items() {
    let srv = TestServer::spawn().await;

    let empty: Vec<Value> = srv.get("/orders").await.json().await.unwrap();
    assert!(empty.is_empty());

    srv.post("/orders", alice_order()).await;
    srv.post("/orders", json!({ "customerName": "Bob", "location": "LA" })).await;

    let res = srv.get("/orders").await;
    assert_eq!(res.status(), StatusCode::OK);
    let orders: Vec<Value> = res.json().await.unwrap();
    assert_eq!(orders.len(), 2);

    let alice = orders.iter().find(|o| o["customerName"] == "Alice").unwrap();
    assert_eq!(alice["items"].as_array().unwrap().len(), 2);
    let bob = orders.iter().find(|o| o["customerName"] == "Bob").unwrap();
    assert!(bob["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn update_replaces_order_keyed_by_path_id() {
    let srv = TestServer::spawn().await;

    let created: Value = srv.post("/orders", alice_order()).await.json().await.unwrap();
    let order_id = created["orderId"].as_i64().unwrap();

    let replacement = json!({
        "orderId": 9999,
        "customerName": "Alice Smith",
        "location": "Boston",
        "items": [{ "itemCode": "C-3", "description": "crate", "quantity": 1 }]
    });
    let res = srv
        .client
        .put(srv.url(&format!("/orders/{order_id}")))
        .json(&replacement)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let saved: Value = res.json().await.unwrap();
    assert_eq!(saved["orderId"].as_i64().unwrap(), order_id);

    let fetched: Value = srv.get(&format!("/orders/{order_id}")).await.json().await.unwrap();
    assert_eq!(fetched["customerName"], "Alice Smith");
    assert_eq!(fetched["location"], "Boston");
    let items = fetched["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["itemCode"], "C-3");

    assert_eq!(srv.get("/orders/9999").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_of_unknown_id_creates_it() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .put(srv.url("/orders/77"))
        .json(&json!({ "customerName": "Carol", "location": "SF" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let fetched: Value = srv.get("/orders/77").await.json().await.unwrap();
    assert_eq!(fetched["customerName"], "Carol");

    // Ids handed out afterwards never collide with the explicit one.
    let next: Value = srv.post("/orders", alice_order()).await.json().await.unwrap();
    assert!(next["orderId"].as_i64().unwrap() > 77);
}

#[tokio::test]
async fn delete_removes_order_and_items() {
    let srv = TestServer::spawn().await;

    let created: Value = srv.post("/orders", alice_order()).await.json().await.unwrap();
    let path = format!("/orders/{}", created["orderId"]);

    let res = srv.client.delete(srv.url(&path)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    assert_eq!(srv.get(&path).await.status(), StatusCode::NOT_FOUND);
    let res = srv.client.delete(srv.url(&path)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let orders: Vec<Value> = srv.get("/orders").await.json().await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn create_book_echoes_and_stores() {
    let srv = TestServer::spawn().await;

    let book = json!({ "title": "Dune", "author": "Frank Herbert" });
    let res = srv.post("/books", book.clone()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await.unwrap(), book);
    assert_eq!(srv.store.book_count(), 1);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let srv = TestServer::spawn().await;
    let creds = json!({ "email": "a@x.io", "password": "pw1" });

    let res = srv.post("/users", creds.clone()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "user created successfully");
    assert_eq!(body["user"]["email"], "a@x.io");
    assert_ne!(body["user"]["password"], "pw1");

    let res = srv.post("/users", json!({ "email": "a@x.io", "password": "other" })).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "email already associated with a user");

    let stored = srv.store.find_user("a@x.io").await.unwrap().unwrap();
    assert_ne!(stored.password, "pw1");
    assert!(stored.password.starts_with("$argon2"));
}

#[tokio::test]
async fn login_issues_token_for_valid_credentials() {
    let srv = TestServer::spawn().await;
    srv.post("/users", json!({ "email": "a@x.io", "password": "pw1" })).await;

    let res = srv.post("/login", json!({ "email": "a@x.io", "password": "pw1" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap();

    let decoded = jsonwebtoken::decode::<Value>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .expect("token should verify with the service secret");
    assert_eq!(decoded.claims["email"], "a@x.io");
    assert!(decoded.claims["exp"].as_i64().unwrap() > Utc::now().timestamp());

    let issuer = Hs256Jwt::new(JWT_SECRET, ChronoDuration::minutes(1000));
    let claims = issuer.validate(token, Utc::now()).unwrap();
    assert_eq!(claims.email, "a@x.io");
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let srv = TestServer::spawn().await;
    srv.post("/users", json!({ "email": "a@x.io", "password": "pw1" })).await;

    let res = srv.post("/login", json!({ "email": "a@x.io", "password": "wrong" })).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "incorrect password");
    assert!(body.get("token").is_none());

    let res = srv.post("/login", json!({ "email": "nobody@x.io", "password": "pw1" })).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "incorrect email");
}

#[tokio::test]
async fn concurrent_registrations_admit_one_user() {
    let srv = Arc::new(TestServer::spawn().await);

    let attempts: Vec<_> = (0..8)
        .map(|i| {
            let srv = srv.clone();
            tokio::spawn(async move {
                srv.post("/users", json!({ "email": "race@x.io", "password": format!("pw{i}") }))
                    .await
                    .status()
            })
        })
        .collect();

    let mut statuses = Vec::new();
    for attempt in attempts {
        statuses.push(attempt.await.unwrap());
    }

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
    assert!(statuses.iter().all(|s| *s == StatusCode::OK || *s == StatusCode::CONFLICT));
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/orders"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert!(res.status().is_client_error());

    let orders: Vec<Value> = srv.get("/orders").await.json().await.unwrap();
    assert!(orders.is_empty());
}
