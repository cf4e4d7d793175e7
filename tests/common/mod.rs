use std::sync::Arc;
use std::time::Duration;

use foodcart_rs::{build_router, build_state, Config, Metrics, Stores};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const IDENTITY_HEADER: &str = "x-user-email";

/// The real router over in-memory stores, served on an ephemeral port
pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let config = Config::default();
        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let state = build_state(Stores::in_memory(), metrics, &config)
            .expect("Failed to build state");
        let app = build_router(state, &config.server);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Failed to serve app");
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build client");

        Self { client, base_url }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request on behalf of a caller, as the session layer would forward it
    pub fn as_user(&self, builder: RequestBuilder, email: &str) -> RequestBuilder {
        builder.header(IDENTITY_HEADER, email)
    }

    pub async fn register(&self, name: &str, email: &str) -> Response {
        self.client
            .post(self.url("/api/register"))
            .json(&json!({
                "name": name,
                "email": email,
                "password": "correct-horse-battery",
            }))
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn add_to_cart(&self, email: &str, food_id: &str, quantity: i64) -> Response {
        self.as_user(self.client.post(self.url("/api/cart")), email)
            .json(&json!({ "foodId": food_id, "quantity": quantity }))
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn remove_from_cart(
        &self,
        email: &str,
        food_id: &str,
        quantity: Option<i64>,
    ) -> Response {
        let body = match quantity {
            Some(quantity) => json!({ "food_id": food_id, "quantity": quantity }),
            None => json!({ "food_id": food_id }),
        };
        self.as_user(self.client.post(self.url("/api/cart/remove")), email)
            .json(&body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn get_cart(&self, email: &str) -> Value {
        let response = self
            .as_user(self.client.get(self.url("/api/cart")), email)
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.expect("Failed to parse cart")
    }
}

/// Quantity of one product line, 0 when absent
pub fn line_quantity(cart: &Value, food_id: &str) -> u64 {
    cart["items"]
        .as_array()
        .expect("Expected items array")
        .iter()
        .find(|item| item["food_id"] == food_id)
        .and_then(|item| item["quantity"].as_u64())
        .unwrap_or(0)
}
