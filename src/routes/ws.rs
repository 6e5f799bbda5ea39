// WebSocket handler: live push of every envelope plus on-demand `request_metrics` queries

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::{Envelope, MetricsRequest};
use crate::sample_repo::SampleStore;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

const REQUEST_METRICS_EVENT: &str = "request_metrics";
const METRICS_DATA_EVENT: &str = "metrics_data";
const ERROR_EVENT: &str = "error";

/// Client → server frame: `{"event": "request_metrics", "data": <get_metrics body>}`.
#[derive(Debug, Deserialize)]
struct ClientMessage {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

pub(super) async fn ws_metrics<S: SampleStore>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<S>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let rx = state.live.subscribe();
        if let Err(e) = stream_metrics(socket, rx, state).await {
            tracing::info!("Metrics stream error: {}", e);
        }
    })
}

async fn stream_metrics<S: SampleStore>(
    socket: WebSocket,
    mut rx: broadcast::Receiver<Envelope>,
    state: AppState<S>,
) -> anyhow::Result<()> {
    tracing::info!(
        subscribers = state.live.receiver_count(),
        "Client connected to metrics stream"
    );

    let (mut sender, mut receiver) = socket.split();
    let mut ping_interval = tokio::time::interval_at(
        tokio::time::Instant::now() + WS_PING_INTERVAL,
        WS_PING_INTERVAL,
    );
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                let envelope = match result {
                    Ok(e) => e,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Metrics stream lagged; events dropped for this client");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let json = serde_json::to_string(&envelope)?;
                if !send_with_timeout(&mut sender, Message::Text(json.into())).await {
                    break;
                }
            }
            incoming = receiver.next() => {
                let Some(Ok(message)) = incoming else {
                    break;
                };
                match message {
                    Message::Text(text) => {
                        let reply = handle_client_message(&state, text.as_str()).await;
                        if !send_with_timeout(&mut sender, Message::Text(reply.to_string().into())).await {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            _ = ping_interval.tick() => {
                if !send_with_timeout(&mut sender, Message::Ping(Bytes::new())).await {
                    break;
                }
            }
        }
    }
    tracing::info!("Client disconnected from metrics stream");
    Ok(())
}

/// False when the client is gone or too slow to accept a frame within WS_SEND_TIMEOUT.
async fn send_with_timeout(sender: &mut SplitSink<WebSocket, Message>, message: Message) -> bool {
    matches!(timeout(WS_SEND_TIMEOUT, sender.send(message)).await, Ok(Ok(())))
}

/// Answers only the requesting client: `metrics_data` with the buckets, or `error`.
async fn handle_client_message<S: SampleStore>(state: &AppState<S>, text: &str) -> serde_json::Value {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => return error_reply(format!("malformed message: {e}"), None),
    };
    if message.event != REQUEST_METRICS_EVENT {
        return error_reply(format!("unsupported event {:?}", message.event), None);
    }
    let request: MetricsRequest = match serde_json::from_value(message.data) {
        Ok(r) => r,
        Err(e) => return error_reply(format!("malformed request_metrics payload: {e}"), None),
    };
    match request.validate(state.config.cache.max_buckets) {
        Ok(query) => {
            let metrics = state.service.resolve(&query).await;
            json!({ "event": METRICS_DATA_EVENT, "data": metrics })
        }
        Err(e) => {
            let violations = json!(e.violations);
            error_reply(e.to_string(), Some(violations))
        }
    }
}

fn error_reply(message: String, errors: Option<serde_json::Value>) -> serde_json::Value {
    let mut data = json!({ "message": message });
    if let Some(errors) = errors {
        data["errors"] = errors;
    }
    json!({ "event": ERROR_EVENT, "data": data })
}
