use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::config::{Config, ConfigError, ServerConfig, StorageConfig};
use crate::handlers::{
    api, cors_layer, health_check, metrics_handler, request_validation_middleware,
    security_headers_middleware, ApiState, RequestLimits,
};
use crate::models::{RepositoryResult, StorageBackend};
use crate::observability::{observability_middleware, Metrics};
use crate::repositories::{
    CartRepository, DynamoDbCartRepository, DynamoDbUserRepository, FoodRepository,
    InMemoryCartRepository, InMemoryFoodRepository, InMemoryUserRepository, TableManager,
    UserRepository,
};
use crate::services::{Argon2CredentialHasher, CartService, CatalogService, UserService};

/// The three stores the services are built on
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub foods: Arc<dyn FoodRepository>,
}

impl Stores {
    /// Process-local stores with the built-in menu
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            carts: Arc::new(InMemoryCartRepository::new()),
            foods: Arc::new(InMemoryFoodRepository::with_default_menu()),
        }
    }

    /// Select and prepare the configured backend. DynamoDB tables are
    /// created when missing.
    pub async fn from_config(storage: &StorageConfig) -> RepositoryResult<Self> {
        let foods: Arc<dyn FoodRepository> = match &storage.catalog_path {
            Some(path) => Arc::new(InMemoryFoodRepository::from_file(path).await?),
            None => Arc::new(InMemoryFoodRepository::with_default_menu()),
        };

        match storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                Ok(Self {
                    users: Arc::new(InMemoryUserRepository::new()),
                    carts: Arc::new(InMemoryCartRepository::new()),
                    foods,
                })
            }
            StorageBackend::DynamoDb => {
                info!(
                    region = %storage.region,
                    users_table = %storage.users_table_name,
                    carts_table = %storage.carts_table_name,
                    "Using DynamoDB storage"
                );
                let client = Arc::new(storage.dynamodb_client().await);

                TableManager::new(client.clone())
                    .create_all_tables(&storage.users_table_name, &storage.carts_table_name)
                    .await?;

                Ok(Self {
                    users: Arc::new(DynamoDbUserRepository::new(
                        client.clone(),
                        storage.users_table_name.clone(),
                        storage.region.clone(),
                    )),
                    carts: Arc::new(DynamoDbCartRepository::new(
                        client,
                        storage.carts_table_name.clone(),
                        storage.region.clone(),
                    )),
                    foods,
                })
            }
        }
    }
}

/// Wire services over the given stores
pub fn build_state(
    stores: Stores,
    metrics: Arc<Metrics>,
    config: &Config,
) -> Result<ApiState, ConfigError> {
    let user_service = Arc::new(UserService::new(
        stores.users,
        Arc::new(Argon2CredentialHasher),
    ));
    let cart_service = Arc::new(
        CartService::new(stores.carts, stores.foods.clone())
            .with_retry_policy(config.storage.cart_retry_policy()),
    );
    let catalog_service = Arc::new(CatalogService::new(stores.foods));

    Ok(ApiState::new(
        user_service,
        cart_service,
        catalog_service,
        metrics,
        config.identity.header_name()?,
    ))
}

/// Route table plus middleware stack
pub fn build_router(state: ApiState, server: &ServerConfig) -> Router {
    let metrics = state.metrics();
    let metrics_for_middleware = metrics.clone();
    let cors = cors_layer(state.identity_header.clone());
    let limits = RequestLimits {
        max_request_size: server.max_request_size as u64,
    };

    Router::new()
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
        .route("/api/register", post(api::register_user))
        .route("/api/users/me", get(api::current_user))
        .route(
            "/api/cart",
            get(api::get_cart)
                .post(api::add_to_cart)
                .delete(api::clear_cart),
        )
        .route("/api/cart/remove", post(api::remove_from_cart))
        .route("/api/foods", get(api::list_foods))
        .route("/api/foods/:food_id", get(api::get_food))
        .with_state(state)
        // Outermost last
        .layer(DefaultBodyLimit::max(server.max_request_size))
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(middleware::from_fn_with_state(
            limits,
            request_validation_middleware,
        ))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors)
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{ServiceResult, UserRole};
    use crate::services::CredentialHasher;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const IDENTITY: &str = "x-user-email";

    struct PlainHasher;

    impl CredentialHasher for PlainHasher {
        fn hash(&self, credential: &str) -> ServiceResult<String> {
            Ok(format!("plain:{}", credential))
        }

        fn verify(&self, credential: &str, hash: &str) -> ServiceResult<bool> {
            Ok(hash == format!("plain:{}", credential))
        }
    }

    fn test_app() -> Router {
        let stores = Stores::in_memory();
        let state = ApiState::new(
            Arc::new(UserService::new(stores.users, Arc::new(PlainHasher))),
            Arc::new(CartService::new(stores.carts, stores.foods.clone())),
            Arc::new(CatalogService::new(stores.foods)),
            Arc::new(Metrics::new().unwrap()),
            header::HeaderName::from_static(IDENTITY),
        );
        build_router(state, &Config::default().server)
    }

    fn json_request(method: Method, uri: &str, who: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(who) = who {
            builder = builder.header(IDENTITY, who);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn bare_request(method: Method, uri: &str, who: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(who) = who {
            builder = builder.header(IDENTITY, who);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn register(app: &Router, email: &str) -> (StatusCode, Value) {
        send(
            app,
            json_request(
                Method::POST,
                "/api/register",
                None,
                json!({"name": "Asha", "email": email, "password": "correct-horse"}),
            ),
        )
        .await
    }

    #[tokio::test]
    async fn test_register_then_duplicate_conflicts() {
        let app = test_app();

        let (status, body) = register(&app, "a@x.com").await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(!body["id"].as_str().unwrap().is_empty());
        assert_eq!(body["role"], json!(UserRole::User));
        assert!(body.get("password").is_none());
        assert!(body.get("credential_hash").is_none());

        let (status, body) = register(&app, "A@X.com ").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_json() {
        let app = test_app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_email() {
        let (status, _) = register(&test_app(), "not-an-email").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cart_requires_identity() {
        let app = test_app();

        let (status, body) = send(&app, bare_request(Method::GET, "/api/cart", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthenticated");
    }

    #[tokio::test]
    async fn test_cart_preflight_is_answered() {
        let app = test_app();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/cart")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(
                header::ACCESS_CONTROL_REQUEST_HEADERS,
                "content-type,x-user-email",
            )
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS].to_str().unwrap();
        assert!(allowed.contains(IDENTITY));
        assert!(allowed.contains("content-type"));
    }

    #[tokio::test]
    async fn test_unknown_identity_is_not_found() {
        let app = test_app();

        let (status, _) = send(
            &app,
            bare_request(Method::GET, "/api/cart", Some("ghost@x.com")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_sum_and_remove_scenario() {
        let app = test_app();
        register(&app, "a@x.com").await;
        let who = Some("a@x.com");

        let (status, _) = send(
            &app,
            json_request(Method::POST, "/api/cart", who, json!({"foodId": "1", "quantity": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, cart) = send(
            &app,
            json_request(Method::POST, "/api/cart", who, json!({"food_id": "1", "quantity": 3})),
        )
        .await;
        assert_eq!(cart["items"].as_array().unwrap().len(), 1);
        assert_eq!(cart["items"][0]["quantity"], 5);
        assert_eq!(cart["total_items"], 5);

        let (status, cart) = send(
            &app,
            json_request(
                Method::POST,
                "/api/cart/remove",
                who,
                json!({"food_id": "1", "quantity": 10}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(cart["items"].as_array().unwrap().is_empty());

        let (_, cart) = send(&app, bare_request(Method::GET, "/api/cart", who)).await;
        assert!(cart["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_unknown_food_is_validation_error() {
        let app = test_app();
        register(&app, "a@x.com").await;

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/cart",
                Some("a@x.com"),
                json!({"food_id": "999", "quantity": 1}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_remove_missing_item_is_not_found() {
        let app = test_app();
        register(&app, "a@x.com").await;

        let (status, _) = send(
            &app,
            json_request(
                Method::POST,
                "/api/cart/remove",
                Some("a@x.com"),
                json!({"food_id": "1"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_clear_returns_no_content() {
        let app = test_app();
        register(&app, "a@x.com").await;
        let who = Some("a@x.com");

        send(
            &app,
            json_request(Method::POST, "/api/cart", who, json!({"food_id": "2"})),
        )
        .await;

        let (status, _) = send(&app, bare_request(Method::DELETE, "/api/cart", who)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, bare_request(Method::DELETE, "/api/cart", who)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, cart) = send(&app, bare_request(Method::GET, "/api/cart", who)).await;
        assert_eq!(cart["total_items"], 0);
    }

    #[tokio::test]
    async fn test_current_user() {
        let app = test_app();
        register(&app, "a@x.com").await;

        let (status, body) = send(
            &app,
            bare_request(Method::GET, "/api/users/me", Some("A@x.com")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "a@x.com");
    }

    #[tokio::test]
    async fn test_catalog_routes() {
        let app = test_app();

        let (status, body) = send(
            &app,
            bare_request(Method::GET, "/api/foods?category=Biryani", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_count"], 3);

        let (status, body) = send(&app, bare_request(Method::GET, "/api/foods/7", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Margherita Pizza");

        let (status, _) = send(&app, bare_request(Method::GET, "/api/foods/404", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_and_metrics_routes() {
        let app = test_app();

        let (status, _) = send(&app, bare_request(Method::GET, "/health/status", None)).await;
        assert_eq!(status, StatusCode::OK);

        let response = app
            .clone()
            .oneshot(bare_request(Method::GET, "/metrics", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
