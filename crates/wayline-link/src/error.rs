use mavlink::common::{MavCmd, MavMissionResult, MavResult};
use thiserror::Error;

pub const TIMEOUT: i32 = 101;
pub const COMMAND_REJECTED: i32 = 102;
pub const MISSION_REJECTED: i32 = 103;
pub const TRANSPORT: i32 = 104;
pub const NO_HEARTBEAT: i32 = 105;
pub const UNKNOWN_MODE: i32 = 111;

/// Stable numeric code of an error, shared with existing tooling.
///
/// 1xx link, 2xx mission store, 3xx flight orchestration. Success has no code.
pub trait ErrorCode {
    fn code(&self) -> i32;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    #[error("timed out waiting for the vehicle")]
    Timeout,

    #[error("vehicle rejected {command:?}: {result:?}")]
    CommandRejected { command: MavCmd, result: MavResult },

    #[error("vehicle rejected the mission transfer: {0:?}")]
    MissionRejected(MavMissionResult),

    #[error("transport: {0}")]
    Transport(String),

    #[error("no heartbeat from vehicle")]
    NoHeartbeat,

    #[error("unknown flight mode {0:?}")]
    UnknownMode(String),
}

impl ErrorCode for LinkError {
    fn code(&self) -> i32 {
        match self {
            LinkError::Timeout => TIMEOUT,
            LinkError::CommandRejected { .. } => COMMAND_REJECTED,
            LinkError::MissionRejected(_) => MISSION_REJECTED,
            LinkError::Transport(_) => TRANSPORT,
            LinkError::NoHeartbeat => NO_HEARTBEAT,
            LinkError::UnknownMode(_) => UNKNOWN_MODE,
        }
    }
}

/// Human readable name for a link-layer code.
pub fn decode_error(code: i32) -> String {
    let name = match code {
        TIMEOUT => "TIMEOUT ERROR",
        COMMAND_REJECTED => "COMMAND REJECTED ERROR",
        MISSION_REJECTED => "MISSION REJECTED ERROR",
        TRANSPORT => "TRANSPORT ERROR",
        NO_HEARTBEAT => "NO HEARTBEAT ERROR",
        UNKNOWN_MODE => "UNKNOWN MODE ERROR",
        _ => "UNKNOWN ERROR",
    };
    format!("{} ({})", name, code)
}
