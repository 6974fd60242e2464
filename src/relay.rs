//! # Relay Loop
//!
//! Single task that owns the pipeline and serves both the sensor link and the
//! control surface.
//!
//! Link events and control requests are taken one at a time and each runs to
//! completion before the next is looked at, so the smoothing state and the
//! channel map need no locking. Pending link events go before control
//! requests, but after [`LINK_BURST_LIMIT`] link events in a row one waiting
//! request is served, so a link queue that never empties cannot starve the
//! control surface. A test pulse holds the loop for its whole dwell; sensor
//! messages and other requests wait in their queues meanwhile.
//!
//! ## Usage
//!
//! ```no_run
//! use attitude_relay::channel_map::ChannelMap;
//! use attitude_relay::control::ControlSurface;
//! use attitude_relay::dac::log_sink::LoggingDac;
//! use attitude_relay::pipeline::IngestPipeline;
//! use attitude_relay::relay::{Relay, RelayHandle};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pipeline = IngestPipeline::new(LoggingDac::new(), ChannelMap::new());
//!     let relay = Relay::new(pipeline, ControlSurface::default());
//!
//!     let (_link_tx, link_rx) = mpsc::channel(64);
//!     let (handle, requests) = RelayHandle::channel(16);
//!     tokio::spawn(relay.run(link_rx, requests));
//!
//!     let values = handle.read_values().await.unwrap();
//!     println!("yaw = {}", values.yaw);
//! }
//! ```

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::channel_map::ChannelAssignment;
use crate::control::{ConfigUpdate, ControlSurface};
use crate::dac::{Channel, DacSink};
use crate::error::{RelayError, Result};
use crate::link::LinkEvent;
use crate::orientation::Orientation;
use crate::pipeline::{IngestPipeline, PipelineStats};

/// Number of accepted messages between status log lines (~20 s at 50 Hz).
pub const LOG_INTERVAL_MESSAGES: u64 = 1000;

/// Consecutive link events handled before a waiting control request is let in.
pub const LINK_BURST_LIMIT: usize = 32;

/// Control request with its reply slot.
#[derive(Debug)]
pub enum ControlRequest {
    ReadValues {
        reply: oneshot::Sender<Orientation>,
    },
    ReadConfig {
        reply: oneshot::Sender<ChannelAssignment>,
    },
    WriteConfig {
        update: ConfigUpdate,
        reply: oneshot::Sender<Result<ChannelAssignment>>,
    },
    TestChannel {
        channel: Option<i64>,
        reply: oneshot::Sender<Result<Channel>>,
    },
}

/// Owner of the pipeline; runs until both inputs are closed.
#[derive(Debug)]
pub struct Relay<D> {
    pipeline: IngestPipeline<D>,
    control: ControlSurface,
    last_logged: u64,
}

impl<D: DacSink> Relay<D> {
    pub fn new(pipeline: IngestPipeline<D>, control: ControlSurface) -> Self {
        Self {
            pipeline,
            control,
            last_logged: 0,
        }
    }

    /// Serve link events and control requests until both channels close.
    ///
    /// # Returns
    ///
    /// Final pipeline counters.
    pub async fn run(
        mut self,
        mut link: mpsc::Receiver<LinkEvent>,
        mut requests: mpsc::Receiver<ControlRequest>,
    ) -> PipelineStats {
        info!("Relay loop started");

        let mut burst = 0;
        loop {
            tokio::select! {
                biased;
                Some(event) = link.recv() => {
                    self.on_link_event(event);
                    burst += 1;
                    if burst >= LINK_BURST_LIMIT {
                        burst = 0;
                        if let Ok(request) = requests.try_recv() {
                            self.on_request(request).await;
                        }
                    }
                }
                Some(request) = requests.recv() => {
                    burst = 0;
                    self.on_request(request).await;
                }
                else => break,
            }
        }

        let stats = self.pipeline.stats();
        info!(
            "Relay loop stopped: {} accepted, {} rate-limited, {} malformed",
            stats.accepted, stats.rate_limited, stats.malformed
        );
        stats
    }

    fn on_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => self.pipeline.on_connect(),
            LinkEvent::Disconnected => self.pipeline.on_disconnect(),
            LinkEvent::Message(payload) => {
                match self.pipeline.handle_message(&payload, Instant::now()) {
                    Ok(_) => self.log_progress(),
                    Err(RelayError::RateLimited) => trace!("Rate limited sensor message"),
                    Err(RelayError::LinkInactive) => debug!("Dropped message while idle"),
                    Err(e) => warn!("{}", e),
                }
            }
        }
    }

    async fn on_request(&mut self, request: ControlRequest) {
        // A dropped reply receiver only means the client went away
        match request {
            ControlRequest::ReadValues { reply } => {
                let _ = reply.send(self.control.read_values(&self.pipeline));
            }
            ControlRequest::ReadConfig { reply } => {
                let _ = reply.send(self.control.read_config(&self.pipeline));
            }
            ControlRequest::WriteConfig { update, reply } => {
                let result = self.control.write_config(&mut self.pipeline, update);
                if let Err(e) = &result {
                    warn!("Rejected channel mapping: {}", e);
                }
                let _ = reply.send(result);
            }
            ControlRequest::TestChannel { channel, reply } => {
                let result = self.control.test_channel(&mut self.pipeline, channel).await;
                let _ = reply.send(result);
            }
        }
    }

    fn log_progress(&mut self) {
        let stats = self.pipeline.stats();
        if stats.accepted - self.last_logged >= LOG_INTERVAL_MESSAGES {
            info!(
                "Processed {} messages ({} rate-limited, {} malformed)",
                stats.accepted, stats.rate_limited, stats.malformed
            );
            self.last_logged = stats.accepted;
        }
    }
}

/// Cloneable client for the relay's control operations.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    requests: mpsc::Sender<ControlRequest>,
}

impl RelayHandle {
    /// Creates a handle and the request receiver to pass to [`Relay::run`].
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ControlRequest>) {
        let (requests, rx) = mpsc::channel(capacity);
        (Self { requests }, rx)
    }

    pub async fn read_values(&self) -> Result<Orientation> {
        self.call(|reply| ControlRequest::ReadValues { reply }).await
    }

    pub async fn read_config(&self) -> Result<ChannelAssignment> {
        self.call(|reply| ControlRequest::ReadConfig { reply }).await
    }

    pub async fn write_config(&self, update: ConfigUpdate) -> Result<ChannelAssignment> {
        self.call(|reply| ControlRequest::WriteConfig { update, reply })
            .await?
    }

    pub async fn test_channel(&self, channel: Option<i64>) -> Result<Channel> {
        self.call(|reply| ControlRequest::TestChannel { channel, reply })
            .await?
    }

    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ControlRequest,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(build(tx))
            .await
            .map_err(|_| RelayError::Unavailable("relay loop has stopped".to_string()))?;
        rx.await
            .map_err(|_| RelayError::Unavailable("relay dropped the request".to_string()))
    }
}
