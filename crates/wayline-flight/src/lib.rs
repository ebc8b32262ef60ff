pub mod airdrop;
pub mod doctor;
pub mod error;
pub mod flight;

pub use airdrop::{AirdropPlan, ReleaseTrigger};
pub use error::{decode_error, FlightError};
pub use flight::{Flight, FlightState};

use serde::Deserialize;
use std::time::Duration;

/// Orchestration timing. Unset fields take the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlightConfig {
    /// Overall budget of one mission upload. Default 20s.
    pub mission_send_timeout_s: Option<u64>,
    /// Pause between takeoff upload and arming. Default 5s.
    pub takeoff_settle_s: Option<u64>,
    /// Wait for the last waypoint of a leg. Default 30s.
    pub waypoint_timeout_s: Option<u64>,
    pub landing_timeout_s: Option<u64>,
    pub landing_retry_delay_s: Option<u64>,
}

impl FlightConfig {
    pub fn mission_send_timeout(&self) -> Duration {
        Duration::from_secs(self.mission_send_timeout_s.unwrap_or(20))
    }

    pub fn takeoff_settle(&self) -> Duration {
        Duration::from_secs(self.takeoff_settle_s.unwrap_or(5))
    }

    pub fn waypoint_timeout(&self) -> Duration {
        Duration::from_secs(self.waypoint_timeout_s.unwrap_or(30))
    }

    /// Default 120s.
    pub fn landing_timeout(&self) -> Duration {
        Duration::from_secs(self.landing_timeout_s.unwrap_or(120))
    }

    /// Default 10s.
    pub fn landing_retry_delay(&self) -> Duration {
        Duration::from_secs(self.landing_retry_delay_s.unwrap_or(10))
    }
}
