use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use prometheus::TEXT_FORMAT;
use std::sync::Arc;
use tracing::{error, instrument};

use crate::observability::{Metrics, MetricsError};

impl IntoResponse for MetricsError {
    fn into_response(self) -> Response {
        error!(error = %self, "Metrics scrape failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Scrape endpoint for the registry shared with the HTTP and business
/// middleware
#[instrument(name = "metrics_scrape", skip_all)]
pub async fn metrics_handler(
    State(metrics): State<Arc<Metrics>>,
) -> Result<impl IntoResponse, MetricsError> {
    let body = metrics.encode()?;
    Ok(([(header::CONTENT_TYPE, TEXT_FORMAT)], body))
}
