use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::compound::Compound;
use crate::session::SessionType;

/// One driver's state at a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSample {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub position: Option<i64>,
    pub status: String,
    pub compound: Compound,
    pub speed: Option<f64>,
    pub gear: Option<i64>,
    pub drs: Option<i64>,
}

/// One instant in race time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub time: f64,
    pub lap: i64,
    pub positions: BTreeMap<String, DriverSample>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackGeometry {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub abbreviation: String,
    pub full_name: String,
    pub team: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub name: String,
    pub round: u32,
    pub year: i32,
    pub session_type: SessionType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayPayload {
    pub event: EventSummary,
    pub track: TrackGeometry,
    pub frames: Vec<ReplayFrame>,
    pub track_statuses: Value,
    pub driver_colors: Value,
    pub drivers: BTreeMap<String, DriverInfo>,
    pub circuit_rotation: f64,
    pub total_laps: Option<u32>,
}
