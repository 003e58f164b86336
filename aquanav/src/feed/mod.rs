//! Realtime sensor feed.
//!
//! A [`SensorFeed`] is one websocket connection, owned by the screen that
//! opened it and closed when that screen ends. There is no shared or global
//! connection.
//!
//! Each text (or UTF-8 binary) frame carries either one collection or an
//! array of them:
//!
//! ```json
//! {"sensorId": "S1", "readings": [{"sensorId": "S1", "lat": -6.2, "lon": 106.8, "ph": 7.1}]}
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::reconcile::SensorCollection;

/// Errors raised by the realtime feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("No feed URL configured")]
    NotConfigured,

    #[error("Failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Connecting to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("Websocket error: {0}")]
    Protocol(String),

    #[error("Malformed feed frame: {0}")]
    Parse(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Frame {
    One(SensorCollection),
    Many(Vec<SensorCollection>),
}

/// Parses one frame payload into collections.
pub fn parse_frame(text: &str) -> Result<Vec<SensorCollection>, FeedError> {
    match serde_json::from_str::<Frame>(text) {
        Ok(Frame::One(collection)) => Ok(vec![collection]),
        Ok(Frame::Many(collections)) => Ok(collections),
        Err(e) => Err(FeedError::Parse(e.to_string())),
    }
}

/// An open realtime connection.
pub struct SensorFeed {
    url: String,
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pending: VecDeque<SensorCollection>,
    frames: u64,
    skipped: u64,
}

impl SensorFeed {
    /// Opens the feed named in the configuration.
    pub async fn from_config(config: &FeedConfig) -> Result<Self, FeedError> {
        let url = config.url.as_deref().ok_or(FeedError::NotConfigured)?;
        Self::connect(url, config.connect_timeout).await
    }

    /// Opens a websocket connection to `url`.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self, FeedError> {
        let (socket, response) = tokio::time::timeout(connect_timeout, connect_async(url))
            .await
            .map_err(|_| FeedError::Timeout {
                url: url.to_string(),
                secs: connect_timeout.as_secs(),
            })?
            .map_err(|e| FeedError::Connect {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        info!(url = %url, status = response.status().as_u16(), "Sensor feed connected");

        Ok(Self {
            url: url.to_string(),
            socket,
            pending: VecDeque::new(),
            frames: 0,
            skipped: 0,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Frames received so far, including skipped ones.
    pub fn frames_received(&self) -> u64 {
        self.frames
    }

    /// Frames that could not be parsed.
    pub fn frames_skipped(&self) -> u64 {
        self.skipped
    }

    /// Next collection from the server.
    ///
    /// Unparseable frames are logged and skipped. Returns `None` once the
    /// server closes the connection or the connection fails. Cancel safe.
    pub async fn next_collection(&mut self) -> Option<SensorCollection> {
        loop {
            if let Some(collection) = self.pending.pop_front() {
                return Some(collection);
            }

            let message = match self.socket.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    warn!(url = %self.url, error = %e, "Sensor feed failed");
                    return None;
                }
                None => return None,
            };

            let text = match message {
                Message::Text(text) => text,
                Message::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => {
                        self.frames += 1;
                        self.skipped += 1;
                        warn!(url = %self.url, "Skipping non-UTF-8 binary frame");
                        continue;
                    }
                },
                Message::Close(frame) => {
                    info!(url = %self.url, frame = ?frame, "Sensor feed closed by server");
                    return None;
                }
                // Pings are answered by the protocol layer
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            self.frames += 1;
            match parse_frame(&text) {
                Ok(collections) => {
                    debug!(collections = collections.len(), "Feed frame received");
                    self.pending.extend(collections);
                }
                Err(e) => {
                    self.skipped += 1;
                    warn!(url = %self.url, error = %e, "Skipping malformed feed frame");
                }
            }
        }
    }

    /// Sends a close frame and waits for the handshake to finish.
    pub async fn close(mut self) -> Result<(), FeedError> {
        match self.socket.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => {}
            Err(e) => return Err(FeedError::Protocol(e.to_string())),
        }

        // Drain until the server acknowledges the close
        while let Some(Ok(_)) = self.socket.next().await {}

        info!(
            url = %self.url,
            frames = self.frames,
            skipped = self.skipped,
            "Sensor feed closed"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures::SinkExt;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::accept_async;

    /// Serves one websocket client: sends `frames`, then either closes or
    /// waits for the client to close. Resolves to whether a client close
    /// frame was received.
    pub(crate) async fn serve(frames: Vec<Message>, close: bool) -> (String, JoinHandle<bool>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            for frame in frames {
                ws.send(frame).await.unwrap();
            }
            if close {
                ws.close(None).await.ok();
                while let Some(Ok(_)) = ws.next().await {}
                return false;
            }
            while let Some(message) = ws.next().await {
                if matches!(message, Ok(Message::Close(_))) {
                    return true;
                }
            }
            false
        });

        (format!("ws://{}", addr), task)
    }

    const S1: &str = r#"{"sensorId":"S1","readings":[{"sensorId":"S1","lat":-6.2,"lon":106.8,"ph":7.1}]}"#;

    #[test]
    fn test_parse_single_and_array_frames() {
        let one = parse_frame(S1).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].sensor_id, "S1");
        assert_eq!(one[0].readings[0].ph, Some(7.1));

        let many = parse_frame(&format!("[{},{}]", S1, S1)).unwrap();
        assert_eq!(many.len(), 2);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_frame("hello"), Err(FeedError::Parse(_))));
        assert!(matches!(
            parse_frame(r#"{"readings": []}"#),
            Err(FeedError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_feed_skips_malformed_frames() {
        let frames = vec![
            Message::Text(S1.to_string()),
            Message::Text("not json".to_string()),
            Message::Binary(format!("[{}]", S1).into_bytes()),
        ];
        let (url, server) = serve(frames, true).await;

        let mut feed = SensorFeed::connect(&url, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(feed.next_collection().await.unwrap().sensor_id, "S1");
        assert_eq!(feed.next_collection().await.unwrap().sensor_id, "S1");
        assert!(feed.next_collection().await.is_none());
        assert_eq!(feed.frames_received(), 3);
        assert_eq!(feed.frames_skipped(), 1);

        drop(feed);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_close_sends_close_frame() {
        let (url, server) = serve(vec![Message::Text(S1.to_string())], false).await;

        let mut feed = SensorFeed::connect(&url, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(feed.next_collection().await.is_some());

        feed.close().await.unwrap();
        assert!(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = SensorFeed::connect(&format!("ws://{}", addr), Duration::from_secs(5)).await;
        assert!(matches!(result, Err(FeedError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_from_config_requires_url() {
        let result = SensorFeed::from_config(&FeedConfig::default()).await;
        assert!(matches!(result, Err(FeedError::NotConfigured)));
    }
}
