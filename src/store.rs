//! Read-only session store over a directory of previously serialized sessions.
//!
//! Layout, relative to the cache root:
//!
//! ```text
//! <year>/<round:02>_<R|S>/session.json    event, drivers, laps, total laps
//! <year>/<round:02>_<R|S>/telemetry.json  {"format": "cached"|"computed", "frames": [...], ...}
//! <year>/<round:02>_<R|S>/circuit.json    {"rotation": <degrees>}   (optional)
//! ```

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::UpstreamError;
use crate::frame::{FrameFormat, RawFrame};
use crate::session::{
    DriverRecord, EventRecord, Lap, Session, SessionKey, SessionLoader, SessionType,
    TelemetryBundle,
};

const SESSION_FILE: &str = "session.json";
const TELEMETRY_FILE: &str = "telemetry.json";
const CIRCUIT_FILE: &str = "circuit.json";

#[derive(Deserialize)]
struct SessionDocument {
    event: EventRecord,
    #[serde(default)]
    drivers: Vec<String>,
    #[serde(default)]
    driver_info: BTreeMap<String, DriverRecord>,
    #[serde(default)]
    laps: Vec<Lap>,
    #[serde(default)]
    total_laps: Option<u32>,
}

#[derive(Deserialize)]
struct TelemetryDocument {
    format: FrameFormat,
    #[serde(default)]
    frames: Vec<Value>,
    #[serde(default)]
    track_statuses: Value,
    #[serde(default)]
    driver_colors: Value,
}

#[derive(Deserialize)]
struct CircuitDocument {
    #[serde(default)]
    rotation: Option<f64>,
}

/// A session read back from the store.
#[derive(Debug)]
pub struct StoredSession {
    key: SessionKey,
    event: EventRecord,
    drivers: Vec<String>,
    driver_info: BTreeMap<String, DriverRecord>,
    laps: Vec<Lap>,
    total_laps: Option<u32>,
}

impl Session for StoredSession {
    fn key(&self) -> SessionKey {
        self.key
    }

    fn event(&self) -> &EventRecord {
        &self.event
    }

    fn drivers(&self) -> &[String] {
        &self.drivers
    }

    fn driver(&self, code: &str) -> Option<&DriverRecord> {
        self.driver_info.get(code)
    }

    /// Smallest recorded lap time wins; laps without a time never finished.
    fn fastest_lap(&self) -> Option<&Lap> {
        self.laps
            .iter()
            .filter_map(|lap| lap.lap_time.map(|t| (t, lap)))
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, lap)| lap)
    }

    fn total_laps(&self) -> Option<u32> {
        self.total_laps
    }
}

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn session_dir(&self, key: SessionKey) -> PathBuf {
        self.root
            .join(key.year.to_string())
            .join(format!("{:02}_{}", key.round, key.session_type.code()))
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, UpstreamError> {
        let text = fs::read_to_string(path).map_err(|source| UpstreamError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| UpstreamError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl SessionLoader for FileSessionStore {
    fn load_session(
        &self,
        year: i32,
        round: u32,
        session_type: SessionType,
    ) -> Result<Box<dyn Session>, UpstreamError> {
        let key = SessionKey {
            year,
            round,
            session_type,
        };
        let dir = self.session_dir(key);
        if !dir.is_dir() {
            return Err(UpstreamError::SessionNotFound {
                year,
                round,
                session_type,
            });
        }

        let doc: SessionDocument = Self::read_json(&dir.join(SESSION_FILE))?;
        tracing::debug!(
            path = %dir.display(),
            drivers = doc.drivers.len(),
            laps = doc.laps.len(),
            "loaded stored session"
        );
        Ok(Box::new(StoredSession {
            key,
            event: doc.event,
            drivers: doc.drivers,
            driver_info: doc.driver_info,
            laps: doc.laps,
            total_laps: doc.total_laps,
        }))
    }

    fn telemetry_bundle(
        &self,
        session: &dyn Session,
        session_type: SessionType,
        refresh: bool,
    ) -> Result<TelemetryBundle, UpstreamError> {
        let key = SessionKey {
            session_type,
            ..session.key()
        };
        if refresh {
            tracing::debug!(year = key.year, round = key.round, "refresh requested; store only serves stored telemetry");
        }

        let path = self.session_dir(key).join(TELEMETRY_FILE);
        let doc: TelemetryDocument = Self::read_json(&path)?;
        let format = doc.format;
        let frames = doc
            .frames
            .into_iter()
            .map(|value| format.decode(value))
            .collect::<serde_json::Result<Vec<RawFrame>>>()
            .map_err(|source| UpstreamError::Parse {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), ?format, frames = frames.len(), "loaded stored telemetry");

        Ok(TelemetryBundle {
            frames,
            track_statuses: doc.track_statuses,
            driver_colors: doc.driver_colors,
        })
    }

    fn circuit_rotation(&self, session: &dyn Session) -> Option<f64> {
        let path = self.session_dir(session.key()).join(CIRCUIT_FILE);
        if !path.exists() {
            return None;
        }
        match Self::read_json::<CircuitDocument>(&path) {
            Ok(doc) => doc.rotation,
            Err(e) => {
                tracing::warn!("ignoring circuit info: {}", e);
                None
            }
        }
    }
}
