use thiserror::Error;
use wayline_link::{ErrorCode, LinkError};
use wayline_mission::MissionError;

pub const PREFLIGHT_NOT_DONE: i32 = 301;
pub const DETECT_NOT_LOADED: i32 = 302;
pub const AIRDROP_NOT_BUILT: i32 = 303;
pub const NO_MISSION_QUEUED: i32 = 304;
pub const LAND_NOT_LOADED: i32 = 305;
pub const INVALID_CHANNEL: i32 = 306;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlightError {
    #[error("preflight check has not completed")]
    PreflightNotDone,

    #[error("no detect mission loaded")]
    DetectNotLoaded,

    #[error("airdrop mission has not been built")]
    AirdropNotBuilt,

    #[error("mission queue is empty")]
    NoMissionQueued,

    #[error("no land mission loaded")]
    LandNotLoaded,

    #[error("RC channel {0} does not exist")]
    InvalidChannel(u8),

    #[error(transparent)]
    Mission(#[from] MissionError),

    #[error(transparent)]
    Link(#[from] LinkError),
}

impl ErrorCode for FlightError {
    fn code(&self) -> i32 {
        match self {
            FlightError::PreflightNotDone => PREFLIGHT_NOT_DONE,
            FlightError::DetectNotLoaded => DETECT_NOT_LOADED,
            FlightError::AirdropNotBuilt => AIRDROP_NOT_BUILT,
            FlightError::NoMissionQueued => NO_MISSION_QUEUED,
            FlightError::LandNotLoaded => LAND_NOT_LOADED,
            FlightError::InvalidChannel(_) => INVALID_CHANNEL,
            FlightError::Mission(e) => e.code(),
            FlightError::Link(e) => e.code(),
        }
    }
}

/// One message for any code raised below the binary, whichever layer it came from.
pub fn decode_error(code: i32) -> String {
    let name = match code {
        PREFLIGHT_NOT_DONE => "PREFLIGHT NOT DONE ERROR",
        DETECT_NOT_LOADED => "DETECT MISSION NOT LOADED ERROR",
        AIRDROP_NOT_BUILT => "AIRDROP MISSION NOT BUILT ERROR",
        NO_MISSION_QUEUED => "NO MISSION QUEUED ERROR",
        LAND_NOT_LOADED => "LAND MISSION NOT LOADED ERROR",
        INVALID_CHANNEL => "INVALID RC CHANNEL ERROR",
        _ => return wayline_mission::decode_error(code),
    };
    format!("{} ({})", name, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_layers_are_decoded_through() {
        assert_eq!(decode_error(101), "TIMEOUT ERROR (101)");
        assert_eq!(decode_error(201), "FILE NOT FOUND ERROR (201)");
        assert_eq!(decode_error(303), "AIRDROP MISSION NOT BUILT ERROR (303)");
        assert_eq!(decode_error(0), "UNKNOWN ERROR (0)");
    }

    #[test]
    fn wrapped_errors_keep_their_code() {
        let e = FlightError::from(MissionError::from(LinkError::NoHeartbeat));
        assert_eq!(e.code(), 105);
        assert_eq!(FlightError::InvalidChannel(0).code(), 306);
    }
}
