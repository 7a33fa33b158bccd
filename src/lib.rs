//! Race replay service: turns stored or freshly assembled race telemetry into
//! a canonical frame-by-frame payload for the browser client.

pub mod coerce;
pub mod compound;
pub mod config;
pub mod error;
pub mod frame;
pub mod replay;
pub mod session;
pub mod store;
pub mod types;
pub mod web;

pub use compound::Compound;
pub use error::{ErrorKind, ReplayError, UpstreamError};
pub use replay::{build_replay, ReplayRequest};
pub use session::{Session, SessionLoader, SessionType};
pub use store::FileSessionStore;
pub use types::{DriverInfo, DriverSample, ReplayFrame, ReplayPayload, TrackGeometry};
