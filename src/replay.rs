use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{ReplayError, Result, UpstreamError};
use crate::frame::normalize_frames;
use crate::session::{Session, SessionLoader, SessionType};
use crate::types::{DriverInfo, EventSummary, ReplayFrame, ReplayPayload, TrackGeometry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayRequest {
    pub year: i32,
    pub round: u32,
    pub session_type: SessionType,
    pub refresh: bool,
}

/// Outline of the circuit, taken from the fastest lap's X/Y telemetry.
pub fn track_geometry(session: &dyn Session) -> Result<TrackGeometry> {
    let lap = session.fastest_lap().ok_or(UpstreamError::NoCompletedLaps)?;
    let telemetry = lap.telemetry();
    if telemetry.x.len() != telemetry.y.len() {
        return Err(ReplayError::MisalignedTrack {
            x_len: telemetry.x.len(),
            y_len: telemetry.y.len(),
        });
    }
    Ok(TrackGeometry {
        x: telemetry.x.clone(),
        y: telemetry.y.clone(),
    })
}

/// Missing numbers render as an empty string rather than `"null"`.
fn driver_number(raw: &Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Descriptive record for every driver the session lists.
pub fn driver_roster(session: &dyn Session) -> Result<BTreeMap<String, DriverInfo>> {
    let mut roster = BTreeMap::new();
    for code in session.drivers() {
        let record = session
            .driver(code)
            .ok_or_else(|| ReplayError::MissingDriver(code.clone()))?;
        roster.insert(
            code.clone(),
            DriverInfo {
                abbreviation: record.abbreviation.clone(),
                full_name: record.full_name.clone(),
                team: record.team_name.clone(),
                number: driver_number(&record.driver_number),
            },
        );
    }
    Ok(roster)
}

fn check_participants(frames: &[ReplayFrame], roster: &BTreeMap<String, DriverInfo>) -> Result<()> {
    for (index, frame) in frames.iter().enumerate() {
        if let Some(driver) = frame.positions.keys().find(|code| !roster.contains_key(*code)) {
            return Err(ReplayError::UnknownParticipant {
                index,
                driver: driver.clone(),
            });
        }
    }
    Ok(())
}

/// Zero and "unavailable" are indistinguishable here; both report 0.0.
fn rotation_or_default(rotation: Option<f64>) -> f64 {
    match rotation {
        Some(r) if r.is_finite() && r != 0.0 => r,
        _ => 0.0,
    }
}

/// Load one session through `loader` and assemble its replay payload.
/// Any failure along the way fails the whole request.
pub fn build_replay(loader: &dyn SessionLoader, req: &ReplayRequest) -> Result<ReplayPayload> {
    let session = loader.load_session(req.year, req.round, req.session_type)?;
    let session = session.as_ref();
    let bundle = loader.telemetry_bundle(session, req.session_type, req.refresh)?;

    let track = track_geometry(session)?;
    let circuit_rotation = rotation_or_default(loader.circuit_rotation(session));

    let frames = normalize_frames(bundle.frames)?;
    if frames.is_empty() {
        return Err(UpstreamError::NoFrames.into());
    }

    let drivers = driver_roster(session)?;
    check_participants(&frames, &drivers)?;

    let event = session.event();
    tracing::debug!(
        event = %event.name,
        frames = frames.len(),
        drivers = drivers.len(),
        track_points = track.x.len(),
        "assembled replay"
    );

    Ok(ReplayPayload {
        event: EventSummary {
            name: event.name.clone(),
            round: event.round,
            year: req.year,
            session_type: req.session_type,
        },
        track,
        frames,
        track_statuses: bundle.track_statuses,
        driver_colors: bundle.driver_colors,
        drivers,
        circuit_rotation,
        total_laps: session.total_laps(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::frame::{FrameFormat, RawFrame};
    use crate::session::{
        DriverRecord, EventRecord, Lap, LapTelemetry, SessionKey, TelemetryBundle,
    };
    use serde_json::json;

    #[derive(Debug)]
    struct FakeSession {
        key: SessionKey,
        event: EventRecord,
        codes: Vec<String>,
        records: BTreeMap<String, DriverRecord>,
        laps: Vec<Lap>,
        total_laps: Option<u32>,
    }

    impl Session for FakeSession {
        fn key(&self) -> SessionKey {
            self.key
        }
        fn event(&self) -> &EventRecord {
            &self.event
        }
        fn drivers(&self) -> &[String] {
            &self.codes
        }
        fn driver(&self, code: &str) -> Option<&DriverRecord> {
            self.records.get(code)
        }
        fn fastest_lap(&self) -> Option<&Lap> {
            self.laps
                .iter()
                .filter(|lap| lap.lap_time.is_some())
                .min_by(|a, b| a.lap_time.unwrap_or(f64::MAX).total_cmp(&b.lap_time.unwrap_or(f64::MAX)))
        }
        fn total_laps(&self) -> Option<u32> {
            self.total_laps
        }
    }

    fn record(abbr: &str, number: Value) -> DriverRecord {
        DriverRecord {
            abbreviation: abbr.to_string(),
            full_name: format!("{} Driver", abbr),
            team_name: "Team".to_string(),
            driver_number: number,
        }
    }

    fn lap(number: u32, lap_time: Option<f64>, x: Vec<f64>, y: Vec<f64>) -> Lap {
        Lap {
            number,
            driver: "VER".to_string(),
            lap_time,
            telemetry: LapTelemetry { x, y },
        }
    }

    fn session() -> FakeSession {
        let mut records = BTreeMap::new();
        records.insert("VER".to_string(), record("VER", json!(1)));
        records.insert("HAM".to_string(), record("HAM", json!("44")));
        FakeSession {
            key: SessionKey {
                year: 2023,
                round: 1,
                session_type: SessionType::Race,
            },
            event: EventRecord {
                name: "Bahrain Grand Prix".to_string(),
                round: 1,
            },
            codes: vec!["VER".to_string(), "HAM".to_string()],
            records,
            laps: vec![
                lap(1, Some(95.2), vec![0.0, 1.0], vec![0.0, 1.0]),
                lap(2, Some(93.1), vec![5.0, 6.0, 7.0], vec![1.0, 2.0, 3.0]),
                lap(3, None, vec![], vec![]),
            ],
            total_laps: Some(57),
        }
    }

    struct FakeLoader {
        frames: Vec<Value>,
        rotation: Option<f64>,
        session: fn() -> FakeSession,
    }

    impl SessionLoader for FakeLoader {
        fn load_session(
            &self,
            _year: i32,
            _round: u32,
            _session_type: SessionType,
        ) -> std::result::Result<Box<dyn Session>, UpstreamError> {
            Ok(Box::new((self.session)()))
        }

        fn telemetry_bundle(
            &self,
            _session: &dyn Session,
            _session_type: SessionType,
            _refresh: bool,
        ) -> std::result::Result<TelemetryBundle, UpstreamError> {
            let frames = self
                .frames
                .iter()
                .map(|v| FrameFormat::Cached.decode(v.clone()))
                .collect::<serde_json::Result<Vec<RawFrame>>>()
                .map_err(|e| UpstreamError::Other(e.to_string()))?;
            Ok(TelemetryBundle {
                frames,
                track_statuses: json!([{"status": "1", "start_time": 0.0}]),
                driver_colors: json!({"VER": "#3671C6"}),
            })
        }

        fn circuit_rotation(&self, _session: &dyn Session) -> Option<f64> {
            self.rotation
        }
    }

    fn request() -> ReplayRequest {
        ReplayRequest {
            year: 2023,
            round: 1,
            session_type: SessionType::Race,
            refresh: false,
        }
    }

    fn loader(frames: Vec<Value>, rotation: Option<f64>) -> FakeLoader {
        FakeLoader {
            frames,
            rotation,
            session,
        }
    }

    #[test]
    fn test_geometry_uses_fastest_completed_lap() {
        let track = track_geometry(&session()).unwrap();
        assert_eq!(track.x, vec![5.0, 6.0, 7.0]);
        assert_eq!(track.x.len(), track.y.len());
    }

    #[test]
    fn test_geometry_without_completed_laps() {
        let mut s = session();
        s.laps.retain(|l| l.lap_time.is_none());
        let err = track_geometry(&s).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamData);
    }

    #[test]
    fn test_geometry_rejects_misaligned_series() {
        let mut s = session();
        s.laps = vec![lap(1, Some(90.0), vec![1.0, 2.0], vec![1.0])];
        assert!(matches!(
            track_geometry(&s),
            Err(ReplayError::MisalignedTrack { x_len: 2, y_len: 1 })
        ));
    }

    #[test]
    fn test_roster_stringifies_numbers() {
        let roster = driver_roster(&session()).unwrap();
        assert_eq!(roster["VER"].number, "1");
        assert_eq!(roster["HAM"].number, "44");
        assert_eq!(roster["VER"].full_name, "VER Driver");
    }

    #[test]
    fn test_roster_null_number() {
        let mut s = session();
        s.records.insert("HAM".to_string(), record("HAM", Value::Null));
        let roster = driver_roster(&s).unwrap();
        assert_eq!(roster["HAM"].number, "");
    }

    #[test]
    fn test_roster_missing_record() {
        let mut s = session();
        s.records.remove("HAM");
        let err = driver_roster(&s).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RosterLookup);
        assert!(err.to_string().contains("HAM"));
    }

    #[test]
    fn test_build_replay() {
        let frames = vec![
            json!({"t": 0.0, "lap": 1, "drivers": {"VER": {"x": 1.0, "y": 2.0, "tyre": 1}}}),
            json!({"t": 0.5, "lap": 1, "drivers": {"VER": {"x": 1.5, "y": 2.5, "tyre": 1},
                                                    "HAM": {"x": 0.5, "y": 0.5, "tyre": 2}}}),
        ];
        let payload = build_replay(&loader(frames, Some(92.0)), &request()).unwrap();

        assert_eq!(payload.event.name, "Bahrain Grand Prix");
        assert_eq!(payload.event.year, 2023);
        assert_eq!(payload.frames.len(), 2);
        assert_eq!(payload.circuit_rotation, 92.0);
        assert_eq!(payload.total_laps, Some(57));
        assert_eq!(payload.driver_colors, json!({"VER": "#3671C6"}));
        for frame in &payload.frames {
            for code in frame.positions.keys() {
                assert!(payload.drivers.contains_key(code));
            }
        }
    }

    #[test]
    fn test_rotation_defaults_to_zero() {
        let frames = vec![json!({"t": 0.0, "lap": 1, "drivers": {"VER": {}}})];
        for rotation in [None, Some(0.0), Some(f64::NAN)] {
            let payload = build_replay(&loader(frames.clone(), rotation), &request()).unwrap();
            assert_eq!(payload.circuit_rotation, 0.0);
        }
    }

    #[test]
    fn test_total_laps_absent() {
        fn no_total() -> FakeSession {
            FakeSession {
                total_laps: None,
                ..session()
            }
        }
        let frames = vec![json!({"t": 0.0, "lap": 1})];
        let fake = FakeLoader {
            frames,
            rotation: None,
            session: no_total,
        };
        let payload = build_replay(&fake, &request()).unwrap();
        assert_eq!(payload.total_laps, None);
    }

    #[test]
    fn test_empty_frames_fail() {
        let err = build_replay(&loader(vec![], None), &request()).unwrap_err();
        assert!(matches!(err, ReplayError::Upstream(UpstreamError::NoFrames)));
    }

    #[test]
    fn test_participant_outside_roster_fails() {
        let frames = vec![json!({"t": 0.0, "lap": 1, "drivers": {"ALB": {}}})];
        let err = build_replay(&loader(frames, None), &request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RosterLookup);
        assert!(err.to_string().contains("ALB"));
    }
}
