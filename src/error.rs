//! Error types for the replay pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::SessionType;

/// Failures raised by the session-loading collaborator.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("no session data for {year} round {round} ({session_type})")]
    SessionNotFound {
        year: i32,
        round: u32,
        session_type: SessionType,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("session has no completed laps")]
    NoCompletedLaps,

    #[error("telemetry bundle contains no frames")]
    NoFrames,

    #[error("{0}")]
    Other(String),
}

/// A raw value that could not be coerced to its canonical numeric type.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{field}: expected {expected}, got {value}")]
pub struct CoerceError {
    pub field: &'static str,
    pub expected: &'static str,
    pub value: String,
}

/// Broad failure categories, used for logging and by callers that need to
/// tell upstream data problems apart from malformed telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UpstreamData,
    MalformedFrame,
    RosterLookup,
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("frame {index}: {source}")]
    MalformedFrame {
        index: usize,
        #[source]
        source: CoerceError,
    },

    #[error("frame {index}, driver {driver}: {source}")]
    MalformedSample {
        index: usize,
        driver: String,
        #[source]
        source: CoerceError,
    },

    #[error("track outline misaligned: {x_len} X samples, {y_len} Y samples")]
    MisalignedTrack { x_len: usize, y_len: usize },

    #[error("no driver record for {0}")]
    MissingDriver(String),

    #[error("driver {driver} appears in frame {index} but not in the session roster")]
    UnknownParticipant { index: usize, driver: String },
}

impl ReplayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReplayError::Upstream(_) => ErrorKind::UpstreamData,
            ReplayError::MalformedFrame { .. }
            | ReplayError::MalformedSample { .. }
            | ReplayError::MisalignedTrack { .. } => ErrorKind::MalformedFrame,
            ReplayError::MissingDriver(_) | ReplayError::UnknownParticipant { .. } => {
                ErrorKind::RosterLookup
            }
        }
    }
}

pub type Result<T, E = ReplayError> = std::result::Result<T, E>;
