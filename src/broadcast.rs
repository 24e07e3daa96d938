// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! WebSocket streaming of processed frames to web viewers.
//!
//! Viewers connect to [`STREAM_PATH`] and receive a `connected` greeting
//! followed by one JSON text message per broadcast frame:
//!
//! ```json
//! {"type": "frame", "metadata": {"width": 480, "height": 640, ...}, "imageData": "<base64 JPEG>"}
//! ```
//!
//! Each viewer has a backlog of a few frames; a viewer that falls behind
//! skips the oldest ones instead of stalling the pipeline.

use crate::pipeline::ProcessedFrame;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use futures::{SinkExt, StreamExt};
use image::{codecs::jpeg::JpegEncoder, ExtendedColorType};
use serde_json::{json, Value};
use std::{future::Future, io, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{
    net::TcpListener,
    sync::broadcast::{self, error::RecvError},
    time::{interval_at, Instant},
};
use tracing::{debug, info, warn};

/// Port the viewer connects to by default.
pub const DEFAULT_PORT: u16 = 8080;

/// WebSocket endpoint path.
pub const STREAM_PATH: &str = "/stream";

const FRAME_BACKLOG: usize = 3;
const JPEG_QUALITY: u8 = 85;
const PING_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("cannot stream {0} channel frame")]
    Channels(usize),

    #[error("jpeg encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Compresses a processed frame to JPEG.
pub fn encode_jpeg(frame: &ProcessedFrame) -> Result<Vec<u8>, BroadcastError> {
    let color = match frame.channels() {
        1 => ExtendedColorType::L8,
        3 => ExtendedColorType::Rgb8,
        n => return Err(BroadcastError::Channels(n)),
    };
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode(
        frame.data(),
        frame.width(),
        frame.height(),
        color,
    )?;
    Ok(jpeg)
}

/// The `frame` message sent to viewers for one processed frame.
pub fn frame_message(frame: &ProcessedFrame, fps: f32) -> Result<Value, BroadcastError> {
    let jpeg = encode_jpeg(frame)?;
    Ok(json!({
        "type": "frame",
        "metadata": frame.metadata(fps),
        "imageData": BASE64.encode(jpeg),
    }))
}

/// The greeting sent once to every new viewer.
pub fn welcome_message() -> Value {
    json!({
        "type": "connected",
        "message": "Connected to Edge Viewer",
    })
}

/// Fans processed frames out to every connected viewer.
///
/// Cloning is cheap; all clones feed the same set of viewers.
#[derive(Debug, Clone)]
pub struct FrameBroadcaster {
    tx: broadcast::Sender<Arc<str>>,
}

impl Default for FrameBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FRAME_BACKLOG);
        Self { tx }
    }

    /// Number of viewers currently subscribed.
    pub fn connection_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Queues a frame for every connected viewer and returns how many will
    /// receive it. With no viewers the frame is not encoded at all.
    pub fn send(&self, frame: &ProcessedFrame, fps: f32) -> Result<usize, BroadcastError> {
        if self.connection_count() == 0 {
            return Ok(0);
        }
        let text: Arc<str> = frame_message(frame, fps)?.to_string().into();
        // Viewers may disconnect between the count and the send
        Ok(self.tx.send(text).unwrap_or(0))
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(STREAM_PATH, get(stream_handler))
            .with_state(self.clone())
    }

    /// Serves the stream endpoint on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(addr = %listener.local_addr()?, path = STREAM_PATH, "frame stream listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("frame stream stopped");
        Ok(())
    }
}

async fn stream_handler(
    ws: WebSocketUpgrade,
    State(broadcaster): State<FrameBroadcaster>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster))
}

async fn handle_socket(socket: WebSocket, broadcaster: FrameBroadcaster) {
    // Subscribe before the greeting so no frame sent after it is missed
    let mut frames = broadcaster.tx.subscribe();
    let (mut sender, mut receiver) = socket.split();
    info!(viewers = broadcaster.connection_count(), "viewer connected");

    if sender
        .send(Message::Text(welcome_message().to_string()))
        .await
        .is_err()
    {
        warn!("viewer left before the greeting");
        return;
    }

    let mut ping = interval_at(Instant::now() + PING_INTERVAL, PING_INTERVAL);
    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => debug!(%text, "viewer message"),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!("viewer receive error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }

            frame = frames.recv() => {
                match frame {
                    Ok(text) => {
                        if sender.send(Message::Text(text.to_string())).await.is_err() {
                            warn!("failed to send frame to viewer, disconnecting");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "viewer lagging"),
                    Err(RecvError::Closed) => break,
                }
            }

            _ = ping.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
    info!("viewer disconnected");
}
