// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::notify::BroadcastSink;
use crate::sample_repo::SampleStore;
use crate::service::MetricsService;

pub(crate) struct AppState<S> {
    pub(crate) service: Arc<MetricsService<S>>,
    pub(crate) live: BroadcastSink,
    pub(crate) config: AppConfig,
}

// manual impl: derive would demand S: Clone
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            live: self.live.clone(),
            config: self.config.clone(),
        }
    }
}

/// `live` must be the same sink the service publishes to, so /ws/metrics sees its events.
pub fn app<S: SampleStore>(
    service: Arc<MetricsService<S>>,
    live: BroadcastSink,
    config: AppConfig,
) -> Router {
    let state = AppState {
        service,
        live,
        config,
    };
    Router::new()
        .route("/", get(|| async { "Hello from metricboard!" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/metrics/log_metrics", post(http::log_metrics::<S>)) // POST /metrics/log_metrics
        .route("/metrics/get_metrics", post(http::get_metrics::<S>)) // POST /metrics/get_metrics
        .route("/metrics/get_metric_names", get(http::get_metric_names::<S>)) // GET /metrics/get_metric_names
        .route("/ws/metrics", get(ws::ws_metrics::<S>)) // WS /ws/metrics
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}
