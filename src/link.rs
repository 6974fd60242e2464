//! # Sensor Link Module
//!
//! WebSocket client that connects to the sensor node and forwards what it
//! receives to the relay loop as [`LinkEvent`]s.
//!
//! This module handles:
//! - Connecting to the sensor node's WebSocket server
//! - Reporting connect/disconnect so the pipeline can switch Idle/Active
//! - Forwarding text frames (one orientation message each)
//! - Reconnecting after a fixed interval when the link drops

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::{RelayError, Result};

/// Events produced by the sensor link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
    Message(String),
}

/// Sensor node WebSocket client.
#[derive(Debug, Clone)]
pub struct SensorLink {
    url: String,
    reconnect_interval: Duration,
}

impl SensorLink {
    /// Creates a client for `url` (e.g. `ws://192.168.4.1:81/`).
    pub fn new(url: impl Into<String>, reconnect_interval: Duration) -> Self {
        Self {
            url: url.into(),
            reconnect_interval,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Keep the link up until the event receiver is dropped.
    ///
    /// Every successful connection is bracketed by `Connected` and
    /// `Disconnected`. Non-text frames are ignored.
    pub async fn run(self, events: mpsc::Sender<LinkEvent>) {
        loop {
            match self.session(&events).await {
                Ok(()) => debug!("Sensor link session ended"),
                Err(RelayError::Unavailable(_)) => {
                    debug!("Relay stopped, closing sensor link");
                    return;
                }
                Err(e) => warn!("{}", e),
            }

            if events.is_closed() {
                return;
            }
            sleep(self.reconnect_interval).await;
        }
    }

    /// One connection attempt and, if it succeeds, its lifetime.
    async fn session(&self, events: &mpsc::Sender<LinkEvent>) -> Result<()> {
        let (mut stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| RelayError::Link(format!("Failed to connect to {}: {}", self.url, e)))?;

        info!("Connected to sensor node at {}", self.url);
        forward(events, LinkEvent::Connected).await?;

        let mut outcome = Ok(());
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if let Err(e) = forward(events, LinkEvent::Message(text)).await {
                        outcome = Err(e);
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    outcome = Err(RelayError::Link(format!("Sensor link read failed: {}", e)));
                    break;
                }
            }
        }

        info!("Disconnected from sensor node");
        // The relay may already be gone; nothing left to report then
        let _ = events.send(LinkEvent::Disconnected).await;
        outcome
    }
}

async fn forward(events: &mpsc::Sender<LinkEvent>, event: LinkEvent) -> Result<()> {
    events
        .send(event)
        .await
        .map_err(|_| RelayError::Unavailable("link event receiver dropped".to_string()))
}
