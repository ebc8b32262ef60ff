use std::path::PathBuf;
use thiserror::Error;
use wayline_link::{ErrorCode, LinkError};

pub const FILE_NOT_FOUND: i32 = 201;
pub const FILE_EMPTY: i32 = 202;
pub const START_OUT_OF_RANGE: i32 = 203;
pub const END_OUT_OF_RANGE: i32 = 204;
pub const MALFORMED_ROW: i32 = 205;
pub const UNKNOWN_SEQUENCE: i32 = 206;
pub const WRITE_FAILED: i32 = 207;
pub const TOO_MANY_ITEMS: i32 = 208;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MissionError {
    #[error("mission file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("mission file has no items: {0}")]
    FileEmpty(PathBuf),

    #[error("start index {start} out of range ({rows} rows)")]
    StartOutOfRange { start: usize, rows: usize },

    #[error("end index {end} out of range ({rows} rows)")]
    EndOutOfRange { end: usize, rows: usize },

    #[error("line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("vehicle requested item {0}, not in the plan")]
    UnknownSequence(u16),

    #[error("writing {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("{0} items do not fit in a 16-bit mission count")]
    TooManyItems(usize),

    #[error(transparent)]
    Link(#[from] LinkError),
}

impl ErrorCode for MissionError {
    fn code(&self) -> i32 {
        match self {
            MissionError::FileNotFound(_) => FILE_NOT_FOUND,
            MissionError::FileEmpty(_) => FILE_EMPTY,
            MissionError::StartOutOfRange { .. } => START_OUT_OF_RANGE,
            MissionError::EndOutOfRange { .. } => END_OUT_OF_RANGE,
            MissionError::MalformedRow { .. } => MALFORMED_ROW,
            MissionError::UnknownSequence(_) => UNKNOWN_SEQUENCE,
            MissionError::WriteFailed { .. } => WRITE_FAILED,
            MissionError::TooManyItems(_) => TOO_MANY_ITEMS,
            MissionError::Link(e) => e.code(),
        }
    }
}

/// Human readable name for a mission-layer code, falling back to the link layer.
pub fn decode_error(code: i32) -> String {
    let name = match code {
        FILE_NOT_FOUND => "FILE NOT FOUND ERROR",
        FILE_EMPTY => "FILE EMPTY ERROR",
        START_OUT_OF_RANGE => "START INDEX OUT OF RANGE ERROR",
        END_OUT_OF_RANGE => "END INDEX OUT OF RANGE ERROR",
        MALFORMED_ROW => "MALFORMED ROW ERROR",
        UNKNOWN_SEQUENCE => "UNKNOWN SEQUENCE ERROR",
        WRITE_FAILED => "FILE WRITE ERROR",
        TOO_MANY_ITEMS => "TOO MANY ITEMS ERROR",
        _ => return wayline_link::decode_error(code),
    };
    format!("{} ({})", name, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_codes_pass_through() {
        assert_eq!(MissionError::from(LinkError::Timeout).code(), 101);
        assert_eq!(decode_error(101), "TIMEOUT ERROR (101)");
        assert_eq!(decode_error(203), "START INDEX OUT OF RANGE ERROR (203)");
        assert_eq!(decode_error(299), "UNKNOWN ERROR (299)");
    }
}
