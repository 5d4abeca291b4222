use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use envmon_core::messages::MSG_TYPE_READING_INSERTED;

use super::{FeedError, FeedSubscription, ReadingFeed, FEED_CHANNEL_CAPACITY};
use crate::row::{FeedFrame, ReadingRow};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Subscribes to `GET /api/v1/ws/readings?device_id=<id>`.
#[derive(Debug, Clone)]
pub struct WsFeed {
    /// Feed URL without query string, e.g. `ws://host:3000/api/v1/ws/readings`.
    url: String,
}

impl WsFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl ReadingFeed for WsFeed {
    async fn subscribe(&self, device_id: &str) -> Result<FeedSubscription, FeedError> {
        let url = reqwest::Url::parse_with_params(&self.url, [("device_id", device_id)])
            .map_err(|e| FeedError::InvalidUrl(format!("{}: {e}", self.url)))?;

        let (socket, _response) = connect_async(url.as_str()).await?;
        tracing::info!(url = %url, "Live feed connected");

        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let reader = tokio::spawn(read_frames(socket, tx, cancel.clone()));
        Ok(FeedSubscription::new(rx, cancel, Some(reader)))
    }
}

/// Forward insert frames into `tx` until cancelled or the socket ends.
async fn read_frames(socket: Socket, tx: mpsc::Sender<ReadingRow>, cancel: CancellationToken) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                tracing::debug!("Live feed unsubscribed");
                break;
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let Some(row) = parse_frame(&text) else {
                        continue;
                    };
                    if tx.send(row).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "Server closed live feed");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Live feed receive error");
                    break;
                }
                None => {
                    tracing::info!("Live feed stream exhausted");
                    break;
                }
            }
        }
    }
}

fn parse_frame(text: &str) -> Option<ReadingRow> {
    match serde_json::from_str::<FeedFrame>(text) {
        Ok(frame) if frame.msg_type == MSG_TYPE_READING_INSERTED => frame.row,
        Ok(frame) => {
            tracing::debug!(msg_type = %frame.msg_type, "Ignoring feed message");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Malformed feed message");
            None
        }
    }
}
