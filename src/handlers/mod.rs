pub mod api;
pub mod health;
pub mod identity;
pub mod metrics;
pub mod middleware;

pub use api::{service_error_to_response, ApiState};
pub use health::health_check;
pub use identity::CallerIdentity;
pub use metrics::metrics_handler;
pub use middleware::{
    cors_layer, request_validation_middleware, security_headers_middleware, RequestLimits,
};
