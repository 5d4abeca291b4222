//! WebSocket live feed of stored readings for one device.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use envmon_events::{DeviceSubscription, FeedMessage, FeedRecvError};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub device_id: Option<String>,
}

/// GET /api/v1/ws/readings?device_id=<id>
///
/// The subscription is taken before the upgrade completes so no insert that
/// happens after the handshake is missed.
pub async fn reading_feed(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> AppResult<impl IntoResponse> {
    let device_id = params
        .device_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("device_id is required".into()))?;

    let subscription = state.feed.subscribe(device_id);
    let shutdown = state.shutdown.clone();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, subscription, shutdown)))
}

/// Forward matching readings until either side goes away.
///
/// A lagged subscription is closed with `1013 (try again later)`; the client
/// is expected to reconnect and refetch history. Server shutdown closes with
/// `1001 (going away)`.
async fn handle_socket(
    socket: WebSocket,
    mut subscription: DeviceSubscription,
    shutdown: CancellationToken,
) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let device_id = subscription.device_id().to_string();
    tracing::info!(conn_id = %conn_id, device_id = %device_id, "Live feed connected");

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                let _ = sink.send(close(close_code::AWAY, "server shutting down")).await;
                break;
            }
            received = subscription.recv() => match received {
                Ok(reading) => {
                    let text = match serde_json::to_string(&FeedMessage::inserted(&reading)) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(
                                conn_id = %conn_id,
                                error = %e,
                                "Failed to encode feed message",
                            );
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        tracing::debug!(conn_id = %conn_id, "WebSocket sink closed");
                        break;
                    }
                }
                Err(FeedRecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        conn_id = %conn_id,
                        device_id = %device_id,
                        skipped,
                        "Live feed lagged, closing",
                    );
                    let _ = sink.send(close(close_code::AGAIN, "subscription lagged")).await;
                    break;
                }
                Err(FeedRecvError::Closed) => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }

    tracing::info!(conn_id = %conn_id, device_id = %device_id, "Live feed disconnected");
}

fn close(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}
