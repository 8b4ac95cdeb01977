pub mod error;
pub mod field;
pub mod geometry;
pub mod machine;
pub mod models;
pub mod next_track;
pub mod options;
pub mod planner;
pub mod sink;
pub mod steering;
pub mod zone;

pub use error::{Result, TurnError};
pub use field::FieldGeometry;
pub use machine::{TickInput, TickOutcome, TurnCompleted, TurnPhase, TurnState, TurnStateMachine, TurnStatus};
pub use models::{Boundary, Track, TrackKind, TurnPath, Vec2, Vec3};
pub use next_track::{next_track, track_at_paths_away, NextTrack};
pub use options::{TurnOptions, VehicleOptions};
pub use planner::{synthesize, PlannedTurn, Strategy, TurnRequest};
pub use sink::{NoopSink, RecordingSink, TurnSink};
pub use steering::{PurePursuit, SteerCommand, TurnFollower};
pub use zone::{classify_zone, Zone};

pub fn version() -> &'static str { env!("CARGO_PKG_VERSION") }
