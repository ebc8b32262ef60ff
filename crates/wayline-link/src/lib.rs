pub mod error;
pub mod link;
pub mod modes;
pub mod telemetry;
pub mod transport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{decode_error, ErrorCode, LinkError};
pub use link::Link;
pub use transport::{MavTransport, Transport};

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// `mavlink::connect` address, e.g. "tcpout:127.0.0.1:5762" or "serial:/dev/ttyACM0:57600".
    pub url: String,

    /// MAVLink ids we use (ground side). 255 is the usual GCS id.
    pub sys_id: u8,
    pub comp_id: u8,

    /// Wait for each individual response. Default 5s.
    pub request_timeout_ms: Option<u64>,

    /// Wait for the vehicle heartbeat when connecting. Default 5s.
    pub heartbeat_timeout_ms: Option<u64>,

    /// Frames buffered between the reader thread and the link. Default 1024.
    pub channel_capacity: Option<usize>,
}

impl LinkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(5_000))
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms.unwrap_or(5_000))
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity.unwrap_or(1024).max(16)
    }
}
