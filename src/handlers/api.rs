use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderName, StatusCode},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, instrument, warn};

use super::identity::CallerIdentity;
use crate::models::{
    AddToCartRequest, CartResponse, ErrorKind, Food, FoodFilters, FoodListResponse,
    RemoveFromCartRequest, ServiceError, UserRequest, UserResponse,
};
use crate::observability::{BusinessTracingMiddleware, Metrics};
use crate::services::{CartService, CatalogService, UserService};

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult<T> = Result<T, ApiError>;

/// Shared application state containing all services
#[derive(Clone)]
pub struct ApiState {
    pub user_service: Arc<UserService>,
    pub cart_service: Arc<CartService>,
    pub catalog_service: Arc<CatalogService>,
    pub business: BusinessTracingMiddleware,
    pub identity_header: HeaderName,
}

impl ApiState {
    pub fn new(
        user_service: Arc<UserService>,
        cart_service: Arc<CartService>,
        catalog_service: Arc<CatalogService>,
        metrics: Arc<Metrics>,
        identity_header: HeaderName,
    ) -> Self {
        Self {
            user_service,
            cart_service,
            catalog_service,
            business: BusinessTracingMiddleware::new(metrics),
            identity_header,
        }
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.business.metrics().clone()
    }

    /// Map the caller's identity to the user id carts are keyed by
    async fn resolve_user_id(&self, identity: &CallerIdentity) -> ApiResult<String> {
        self.business
            .trace_user_operation("resolve", self.user_service.find_by_user_id(&identity.0))
            .await
            .map_err(service_error_to_response)
    }
}

/// Query parameters for listing foods
#[derive(Debug, Default, Deserialize)]
pub struct ListFoodsQuery {
    pub category: Option<String>,
    #[serde(alias = "q")]
    pub search: Option<String>,
    #[serde(alias = "availableOnly")]
    pub available_only: Option<bool>,
}

impl From<ListFoodsQuery> for FoodFilters {
    fn from(query: ListFoodsQuery) -> Self {
        FoodFilters {
            category: query.category.filter(|c| !c.trim().is_empty()),
            search_term: query.search.filter(|s| !s.trim().is_empty()),
            available_only: query.available_only,
        }
    }
}

// =============================================================================
// USER ENDPOINTS
// =============================================================================

#[instrument(name = "register_user", skip_all)]
pub async fn register_user(
    State(state): State<ApiState>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let Json(request) = payload.map_err(json_rejection_to_response)?;

    let user = state
        .business
        .trace_user_operation("register", state.user_service.register_user(request))
        .await
        .map_err(service_error_to_response)?;

    crate::info_with_trace!(user_id = %user.id, "Registration accepted");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(name = "current_user", skip_all)]
pub async fn current_user(
    State(state): State<ApiState>,
    identity: CallerIdentity,
) -> ApiResult<Json<UserResponse>> {
    state
        .business
        .trace_user_operation("current_user", state.user_service.current_user(&identity.0))
        .await
        .map(Json)
        .map_err(service_error_to_response)
}

// =============================================================================
// CART ENDPOINTS
// =============================================================================

#[instrument(name = "get_cart", skip_all)]
pub async fn get_cart(
    State(state): State<ApiState>,
    identity: CallerIdentity,
) -> ApiResult<Json<CartResponse>> {
    let user_id = state.resolve_user_id(&identity).await?;

    state
        .business
        .trace_cart_operation("get", state.cart_service.get_cart(&user_id))
        .await
        .map(Json)
        .map_err(service_error_to_response)
}

#[instrument(name = "add_to_cart", skip_all)]
pub async fn add_to_cart(
    State(state): State<ApiState>,
    identity: CallerIdentity,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> ApiResult<Json<CartResponse>> {
    let Json(request) = payload.map_err(json_rejection_to_response)?;
    let user_id = state.resolve_user_id(&identity).await?;

    state
        .business
        .trace_cart_operation("add", state.cart_service.add_to_cart(&user_id, request))
        .await
        .map(Json)
        .map_err(service_error_to_response)
}

#[instrument(name = "remove_from_cart", skip_all)]
pub async fn remove_from_cart(
    State(state): State<ApiState>,
    identity: CallerIdentity,
    payload: Result<Json<RemoveFromCartRequest>, JsonRejection>,
) -> ApiResult<Json<CartResponse>> {
    let Json(request) = payload.map_err(json_rejection_to_response)?;
    let user_id = state.resolve_user_id(&identity).await?;

    state
        .business
        .trace_cart_operation(
            "remove",
            state.cart_service.remove_from_cart(&user_id, request),
        )
        .await
        .map(Json)
        .map_err(service_error_to_response)
}

#[instrument(name = "clear_cart", skip_all)]
pub async fn clear_cart(
    State(state): State<ApiState>,
    identity: CallerIdentity,
) -> ApiResult<StatusCode> {
    let user_id = state.resolve_user_id(&identity).await?;

    state
        .business
        .trace_cart_operation("clear", state.cart_service.clear_cart(&user_id))
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(service_error_to_response)
}

// =============================================================================
// CATALOG ENDPOINTS
// =============================================================================

#[instrument(name = "list_foods", skip_all, fields(
    category = query.category.as_deref(),
    search = query.search.as_deref(),
))]
pub async fn list_foods(
    State(state): State<ApiState>,
    Query(query): Query<ListFoodsQuery>,
) -> ApiResult<Json<FoodListResponse>> {
    state
        .catalog_service
        .list_foods(query.into())
        .await
        .map(Json)
        .map_err(service_error_to_response)
}

#[instrument(name = "get_food", skip(state), fields(food_id = %food_id))]
pub async fn get_food(
    State(state): State<ApiState>,
    Path(food_id): Path<String>,
) -> ApiResult<Json<Food>> {
    state
        .catalog_service
        .get_food(&food_id)
        .await
        .map(Json)
        .map_err(service_error_to_response)
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert ServiceError to HTTP response. Server-side failures are logged
/// here and reported without internal detail.
pub fn service_error_to_response(err: ServiceError) -> ApiError {
    let kind = err.kind();
    let message = match kind {
        ErrorKind::Internal => {
            error!(error = %err, "Internal error while handling request");
            "Internal server error".to_string()
        }
        ErrorKind::Unavailable => {
            error!(error = %err, "Backing store unavailable");
            "Service temporarily unavailable".to_string()
        }
        _ => err.to_string(),
    };

    error_body(status_for(kind), kind, message)
}

/// Malformed or mistyped JSON bodies are client validation failures
pub fn json_rejection_to_response(rejection: JsonRejection) -> ApiError {
    warn!(error = %rejection.body_text(), "Rejected request body");
    error_body(
        StatusCode::BAD_REQUEST,
        ErrorKind::Validation,
        rejection.body_text(),
    )
}

fn error_body(status: StatusCode, kind: ErrorKind, message: String) -> ApiError {
    (
        status,
        Json(json!({
            "error": kind.as_str(),
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
