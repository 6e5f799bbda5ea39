// HTTP handlers: version, sample ingestion, aggregation queries, metric names

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use super::AppState;
use crate::error::ValidationError;
use crate::models::{MetricsRequest, NewSample};
use crate::sample_repo::SampleStore;
use crate::version::{NAME, VERSION};

/// 400 with every violated field: `{"message": ..., "errors": [{field, message}]}`.
pub(super) fn validation_response(err: ValidationError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "message": err.to_string(),
            "errors": err.violations,
        })),
    )
        .into_response()
}

/// Bodies serde cannot map onto the request type get the same 400 shape, on field `body`.
fn rejected_body(rejection: JsonRejection) -> Response {
    validation_response(ValidationError::single("body", rejection.body_text()))
}

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": message })),
    )
        .into_response()
}

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// POST /metrics/log_metrics — stores one sample and pushes it on `metrics_update`.
pub(super) async fn log_metrics<S: SampleStore>(
    State(state): State<AppState<S>>,
    body: Result<Json<NewSample>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return rejected_body(rejection),
    };
    let sample = match body.into_sample(Utc::now()) {
        Ok(s) => s,
        Err(e) => return validation_response(e),
    };
    match state.service.ingest(sample).await {
        Ok(_) => Json(json!({ "message": "Metric logged successfully" })).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, operation = "log_metrics", "Failed to log metric");
            internal_error("Failed to log metric")
        }
    }
}

/// POST /metrics/get_metrics — aggregated buckets. Store failures answer 200 with no data.
pub(super) async fn get_metrics<S: SampleStore>(
    State(state): State<AppState<S>>,
    body: Result<Json<MetricsRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return rejected_body(rejection),
    };
    let query = match body.validate(state.config.cache.max_buckets) {
        Ok(q) => q,
        Err(e) => return validation_response(e),
    };
    let metrics = state.service.resolve(&query).await;
    Json(json!({ "metrics": metrics })).into_response()
}

/// GET /metrics/get_metric_names — distinct sample names, sorted.
pub(super) async fn get_metric_names<S: SampleStore>(
    State(state): State<AppState<S>>,
) -> Response {
    match state.service.metric_names().await {
        Ok(names) => Json(names).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, operation = "get_metric_names", "Failed to list metric names");
            internal_error("Internal Server Error")
        }
    }
}
