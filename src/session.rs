//! Interface to the session-loading collaborator.
//!
//! The collaborator owns lap selection, telemetry derivation and caching. This
//! crate only consumes what it hands back through these traits.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::UpstreamError;
use crate::frame::RawFrame;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    #[default]
    #[serde(rename = "R")]
    Race,
    #[serde(rename = "S")]
    Sprint,
}

impl SessionType {
    pub fn code(&self) -> &'static str {
        match self {
            SessionType::Race => "R",
            SessionType::Sprint => "S",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub year: i32,
    pub round: u32,
    pub session_type: SessionType,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "EventName")]
    pub name: String,
    #[serde(rename = "RoundNumber")]
    pub round: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DriverRecord {
    #[serde(rename = "Abbreviation")]
    pub abbreviation: String,
    #[serde(rename = "FullName")]
    pub full_name: String,
    #[serde(rename = "TeamName")]
    pub team_name: String,
    /// Number or string, depending on the source.
    #[serde(rename = "DriverNumber")]
    pub driver_number: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LapTelemetry {
    #[serde(rename = "X")]
    pub x: Vec<f64>,
    #[serde(rename = "Y")]
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Lap {
    pub number: u32,
    pub driver: String,
    /// Seconds; `None` for laps that were never completed.
    #[serde(default)]
    pub lap_time: Option<f64>,
    #[serde(default)]
    pub telemetry: LapTelemetry,
}

impl Lap {
    pub fn telemetry(&self) -> &LapTelemetry {
        &self.telemetry
    }
}

/// Telemetry handed over by the collaborator for one session.
#[derive(Debug, Clone, Default)]
pub struct TelemetryBundle {
    pub frames: Vec<RawFrame>,
    pub track_statuses: Value,
    pub driver_colors: Value,
}

pub trait Session: fmt::Debug + Send + Sync {
    fn key(&self) -> SessionKey;
    fn event(&self) -> &EventRecord;
    /// Driver codes taking part in the session.
    fn drivers(&self) -> &[String];
    fn driver(&self, code: &str) -> Option<&DriverRecord>;
    /// Fastest completed lap, or `None` when no lap was completed.
    fn fastest_lap(&self) -> Option<&Lap>;
    fn total_laps(&self) -> Option<u32>;
}

/// Synchronous boundary to whatever loads sessions and race telemetry.
/// Implementations must tolerate concurrent calls for the same session.
pub trait SessionLoader: Send + Sync {
    fn load_session(
        &self,
        year: i32,
        round: u32,
        session_type: SessionType,
    ) -> Result<Box<dyn Session>, UpstreamError>;

    fn telemetry_bundle(
        &self,
        session: &dyn Session,
        session_type: SessionType,
        refresh: bool,
    ) -> Result<TelemetryBundle, UpstreamError>;

    /// Rotation in degrees. Zero and `None` both mean "unavailable".
    fn circuit_rotation(&self, session: &dyn Session) -> Option<f64>;
}
