//! Raw telemetry frames and their normalization into [`ReplayFrame`].
//!
//! Frames reach us in one of two shapes. Frames reloaded from a prior
//! serialization use short keys (`t`, `drivers`, `tyre`) and carry an integer
//! compound code; frames produced by the telemetry assembler in the current
//! run carry `time`, `positions`, a driver status and an already named
//! compound. Which shape a bundle holds is decided once, where the bundle is
//! read, and recorded as a [`RawFrame`] variant.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::coerce::{require_f64, require_i64, to_f64, to_i64};
use crate::compound::Compound;
use crate::error::{CoerceError, ReplayError, Result};
use crate::types::{DriverSample, ReplayFrame};

/// Status reported for every driver of a cached frame.
pub const ON_TRACK: &str = "OnTrack";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CachedSample {
    #[serde(default)]
    pub x: Option<Value>,
    #[serde(default)]
    pub y: Option<Value>,
    #[serde(default)]
    pub position: Option<Value>,
    #[serde(default)]
    pub tyre: Option<Value>,
    #[serde(default)]
    pub speed: Option<Value>,
    #[serde(default)]
    pub gear: Option<Value>,
    #[serde(default)]
    pub drs: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CachedFrame {
    #[serde(default)]
    pub t: Option<Value>,
    #[serde(default)]
    pub lap: Option<Value>,
    #[serde(default)]
    pub drivers: BTreeMap<String, CachedSample>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComputedSample {
    #[serde(default)]
    pub x: Option<Value>,
    #[serde(default)]
    pub y: Option<Value>,
    #[serde(default)]
    pub position: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub compound: Option<String>,
    #[serde(default)]
    pub speed: Option<Value>,
    #[serde(default)]
    pub gear: Option<Value>,
    #[serde(default)]
    pub drs: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComputedFrame {
    pub time: Value,
    pub lap: Value,
    #[serde(default)]
    pub positions: BTreeMap<String, ComputedSample>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawFrame {
    Cached(CachedFrame),
    Computed(ComputedFrame),
}

/// Discriminant naming the shape of every frame in a serialized bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    Cached,
    Computed,
}

impl FrameFormat {
    /// Decode one serialized frame of this format.
    pub fn decode(self, value: Value) -> serde_json::Result<RawFrame> {
        Ok(match self {
            FrameFormat::Cached => RawFrame::Cached(serde_json::from_value(value)?),
            FrameFormat::Computed => RawFrame::Computed(serde_json::from_value(value)?),
        })
    }
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Tyre codes only select a compound, so integers too wide for `i64`
/// saturate and resolve to `Unknown` instead of failing the sample.
fn tyre_compound(raw: Option<&Value>) -> Result<Compound, CoerceError> {
    match raw {
        Some(Value::Number(n)) if n.as_i64().is_none() => {
            if let Some(f) = n.as_f64().filter(|f| f.is_finite()) {
                return Ok(Compound::from_code(f.trunc() as i64));
            }
        }
        Some(Value::String(s)) if is_integer_literal(s.trim()) => {
            return Ok(s
                .trim()
                .parse::<i64>()
                .map(Compound::from_code)
                .unwrap_or(Compound::Unknown));
        }
        _ => {}
    }
    Ok(Compound::from_code(to_i64("tyre", raw)?.unwrap_or(0)))
}

fn cached_sample(raw: &CachedSample) -> Result<DriverSample, CoerceError> {
    let compound = tyre_compound(raw.tyre.as_ref())?;
    Ok(DriverSample {
        x: to_f64("x", raw.x.as_ref())?,
        y: to_f64("y", raw.y.as_ref())?,
        position: to_i64("position", raw.position.as_ref())?,
        status: ON_TRACK.to_string(),
        compound,
        speed: to_f64("speed", raw.speed.as_ref())?,
        gear: to_i64("gear", raw.gear.as_ref())?,
        drs: to_i64("drs", raw.drs.as_ref())?,
    })
}

fn computed_sample(raw: ComputedSample) -> Result<DriverSample, CoerceError> {
    Ok(DriverSample {
        x: to_f64("x", raw.x.as_ref())?,
        y: to_f64("y", raw.y.as_ref())?,
        position: to_i64("position", raw.position.as_ref())?,
        compound: raw
            .compound
            .as_deref()
            .map_or(Compound::Unknown, Compound::from_name),
        status: raw.status.unwrap_or_else(|| ON_TRACK.to_string()),
        speed: to_f64("speed", raw.speed.as_ref())?,
        gear: to_i64("gear", raw.gear.as_ref())?,
        drs: to_i64("drs", raw.drs.as_ref())?,
    })
}

fn checked_frame(index: usize, time: f64, lap: i64) -> Result<(f64, i64)> {
    if time < 0.0 {
        return Err(ReplayError::MalformedFrame {
            index,
            source: CoerceError {
                field: "time",
                expected: "a non-negative number",
                value: time.to_string(),
            },
        });
    }
    if lap < 1 {
        return Err(ReplayError::MalformedFrame {
            index,
            source: CoerceError {
                field: "lap",
                expected: "a lap number of at least 1",
                value: lap.to_string(),
            },
        });
    }
    Ok((time, lap))
}

/// Normalize the frame at `index` of a bundle.
pub fn normalize_frame(index: usize, raw: RawFrame) -> Result<ReplayFrame> {
    let frame_err = |source| ReplayError::MalformedFrame { index, source };

    match raw {
        RawFrame::Cached(frame) => {
            let time = to_f64("t", frame.t.as_ref()).map_err(frame_err)?.unwrap_or(0.0);
            let lap = to_i64("lap", frame.lap.as_ref()).map_err(frame_err)?.unwrap_or(1);
            let (time, lap) = checked_frame(index, time, lap)?;

            let mut positions = BTreeMap::new();
            for (driver, sample) in frame.drivers {
                let sample = cached_sample(&sample).map_err(|source| {
                    ReplayError::MalformedSample {
                        index,
                        driver: driver.clone(),
                        source,
                    }
                })?;
                positions.insert(driver, sample);
            }
            Ok(ReplayFrame {
                time,
                lap,
                positions,
            })
        }
        RawFrame::Computed(frame) => {
            let time = require_f64("time", &frame.time).map_err(frame_err)?;
            let lap = require_i64("lap", &frame.lap).map_err(frame_err)?;
            let (time, lap) = checked_frame(index, time, lap)?;

            let mut positions = BTreeMap::new();
            for (driver, sample) in frame.positions {
                let sample = computed_sample(sample).map_err(|source| {
                    ReplayError::MalformedSample {
                        index,
                        driver: driver.clone(),
                        source,
                    }
                })?;
                positions.insert(driver, sample);
            }
            Ok(ReplayFrame {
                time,
                lap,
                positions,
            })
        }
    }
}

/// Normalize a whole frame sequence, preserving its order.
/// The first malformed frame aborts the lot.
pub fn normalize_frames(frames: Vec<RawFrame>) -> Result<Vec<ReplayFrame>> {
    frames
        .into_iter()
        .enumerate()
        .map(|(index, raw)| normalize_frame(index, raw))
        .collect()
}
