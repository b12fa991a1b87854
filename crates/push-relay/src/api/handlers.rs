//! HTTP request handlers.

use super::types::{
    DeliveryResponse, DispatchStatus, DispatchedEvent, HealthResponse, InvokeRequest,
};
use super::AppState;
use crate::bridge::Dispatch;
use crate::channel::CallbackChannel;
use crate::error::RelayError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use serde_json::Value;
use tracing::{debug, info};

/// Invoke a named action.
///
/// The response stream is the reply channel for this invocation: a
/// `dispatched` event first, then one `result` event per delivered result.
/// It ends after a result without `keepCallback`, or when a later
/// invocation supersedes it.
pub async fn invoke(
    State(state): State<AppState>,
    Path(action): Path<String>,
    Json(request): Json<InvokeRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, RelayError> {
    info!(%action, args = request.args.len(), "Invocation received");

    let (channel, mut replies) = CallbackChannel::new();
    let status = match state.bridge.execute(&action, &request.args, channel).await? {
        // The task runs detached; dropping the stream cancels it.
        Dispatch::Pending(_) => DispatchStatus::Pending,
        Dispatch::Completed => DispatchStatus::Completed,
    };

    let dispatched = DispatchedEvent { action, status };

    let stream = async_stream::stream! {
        yield Event::default().event("dispatched").json_data(&dispatched);

        while let Some(result) = replies.recv().await {
            let keep_open = result.keep_callback;
            yield Event::default().event("result").json_data(&result);

            if !keep_open {
                break;
            }
        }

        debug!(action = %dispatched.action, "Reply stream closed");
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Accept an inbound push from the platform transport.
///
/// Always 202: deliveries with no consumer, or that are not JSON objects,
/// are dropped here without telling the sender.
pub async fn deliveries(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<DeliveryResponse>) {
    let delivered = state.bridge.relay().on_raw_delivery(body);
    (StatusCode::ACCEPTED, Json(DeliveryResponse { delivered }))
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        consumer_attached: state.bridge.channels().is_attached(),
    })
}
