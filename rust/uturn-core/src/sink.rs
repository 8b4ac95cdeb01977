//! Output side of the engine. The state machine calls these from inside its
//! tick; implementations must not call back into the machine.

use crate::machine::{TurnCompleted, TurnStatus};
use crate::models::TurnPath;
use crate::next_track::NextTrack;

/// Visualization and steering outputs. Every method defaults to a no-op so a
/// consumer only implements what it renders.
pub trait TurnSink {
    /// New turn path, or `None` once it is discarded.
    fn on_turn_path(&mut self, _path: Option<&TurnPath>) {}
    fn on_next_track(&mut self, _next: Option<&NextTrack>) {}
    fn on_in_turn(&mut self, _in_turn: bool) {}
    /// Steering angle in radians, positive right. Only sent while executing.
    fn on_steer(&mut self, _angle: f64) {}
    fn on_status(&mut self, _status: &TurnStatus) {}
    /// Guidance must re-localize against the new pass from scratch.
    fn on_turn_completed(&mut self, _event: &TurnCompleted) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TurnSink for NoopSink {}

#[derive(Clone, Debug, PartialEq)]
pub enum SinkEvent {
    TurnPath(Option<TurnPath>),
    NextTrack(Option<NextTrack>),
    InTurn(bool),
    Steer(f64),
    Status(TurnStatus),
    Completed(TurnCompleted),
}

/// Keeps every call in order. Used by tests and the CLI walk.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
}

impl RecordingSink {
    pub fn new() -> Self { Self::default() }

    pub fn statuses(&self) -> impl Iterator<Item = &TurnStatus> + '_ {
        self.events.iter().filter_map(|e| match e {
            SinkEvent::Status(s) => Some(s),
            _ => None,
        })
    }

    pub fn completions(&self) -> impl Iterator<Item = &TurnCompleted> + '_ {
        self.events.iter().filter_map(|e| match e {
            SinkEvent::Completed(c) => Some(c),
            _ => None,
        })
    }

    /// Latest path handed out, `None` if it was cleared afterwards.
    pub fn current_path(&self) -> Option<&TurnPath> {
        self.events.iter().rev().find_map(|e| match e {
            SinkEvent::TurnPath(p) => Some(p.as_ref()),
            _ => None,
        })?
    }
}

impl TurnSink for RecordingSink {
    fn on_turn_path(&mut self, path: Option<&TurnPath>) { self.events.push(SinkEvent::TurnPath(path.cloned())); }
    fn on_next_track(&mut self, next: Option<&NextTrack>) { self.events.push(SinkEvent::NextTrack(next.cloned())); }
    fn on_in_turn(&mut self, in_turn: bool) { self.events.push(SinkEvent::InTurn(in_turn)); }
    fn on_steer(&mut self, angle: f64) { self.events.push(SinkEvent::Steer(angle)); }
    fn on_status(&mut self, status: &TurnStatus) { self.events.push(SinkEvent::Status(status.clone())); }
    fn on_turn_completed(&mut self, event: &TurnCompleted) { self.events.push(SinkEvent::Completed(*event)); }
}
