//! Turn state machine.
//!
//! `Idle -> PathPending -> Executing -> Idle`. The owner calls
//! [`TurnStateMachine::tick`] once per guidance update with the current pose
//! and collaborators; everything the machine remembers between ticks lives
//! in one [`TurnState`].

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, TurnError};
use crate::field::FieldGeometry;
use crate::geometry::{nearest_on_polyline, ray_polygon_distance};
use crate::models::{angle_diff, direction, heading_between, Track, TrackKind, TurnPath, Vec2, Vec3};
use crate::next_track::{next_paths_away, next_track, track_at_paths_away, NextTrack};
use crate::options::TurnOptions;
use crate::planner::{synthesize, synthesize_manual, PlannedTurn, Strategy, TurnRequest};
use crate::sink::TurnSink;
use crate::steering::{PurePursuit, SteerCommand, TurnFollower};
use crate::zone::{classify_zone, Zone};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    #[default]
    Idle,
    PathPending,
    Executing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscardReason {
    /// Drove into the headland without reaching the start of the path.
    EnteredHeadland,
    TurnedAway,
    SettingsChanged,
    DirectionChanged,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TurnStatus {
    Created { strategy: Strategy, points: usize },
    Triggered,
    Completed { paths_away: i32 },
    Discarded(DiscardReason),
    EndOfField,
    CreationFailed(TurnError),
    Reset,
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnStatus::Created { strategy, points } => write!(f, "U-turn path created ({strategy:?}, {points} points)"),
            TurnStatus::Triggered => f.write_str("U-turn started"),
            TurnStatus::Completed { paths_away } => write!(f, "U-turn completed, now {paths_away} passes away"),
            TurnStatus::Discarded(reason) => write!(f, "U-turn path discarded: {reason:?}"),
            TurnStatus::EndOfField => f.write_str("end of field reached"),
            TurnStatus::CreationFailed(e) => write!(f, "failed to create U-turn path: {e}"),
            TurnStatus::Reset => f.write_str("U-turn state reset"),
        }
    }
}

/// Sent once per completed turn. Guidance has to drop whatever index it kept
/// on the old pass and re-localize on the pass `paths_away` describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnCompleted {
    pub paths_away: i32,
    pub turned_left: bool,
    pub relocalize: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    SameWay,
    OppositeWay,
    Misaligned,
}

/// Travel heading of the track near `p`: the AB heading, or the heading of
/// the nearest curve segment.
pub fn local_heading(track: &Track, p: Vec2) -> Option<f64> {
    match track.kind() {
        TrackKind::AbLine => track.heading(),
        TrackKind::Curve => {
            let (i, _, _) = nearest_on_polyline(&track.points, p)?;
            let a = track.points.get(i)?.xy();
            let b = track.points.get(i + 1)?.xy();
            Some(heading_between(a, b))
        }
    }
}

pub fn track_alignment(track: &Track, pose: Vec3, tolerance: f64) -> Alignment {
    let Some(base) = local_heading(track, pose.xy()) else { return Alignment::Misaligned };
    let off = angle_diff(base, pose.heading).abs();
    if off <= tolerance {
        Alignment::SameWay
    } else if PI - off <= tolerance {
        Alignment::OppositeWay
    } else {
        Alignment::Misaligned
    }
}

/// Everything the machine carries between ticks.
///
/// `path` is `Some` exactly when `phase` is not `Idle`.
#[derive(Clone, Debug, Default)]
pub struct TurnState {
    pub phase: TurnPhase,
    pub path: Option<TurnPath>,
    pub next: Option<NextTrack>,
    /// Pass the vehicle occupies, counted from the reference track.
    pub paths_away: i32,
    pub is_turn_left: bool,
    pub was_heading_same_way_at_turn_start: bool,
    pub last_turn_was_left: Option<bool>,
    /// Operator choice for the next turn, cleared when a turn completes.
    pub direction_override: Option<bool>,
    /// Ticks to wait before the next creation attempt.
    pub retry_cooldown: u32,
    /// Odometer since the turn was triggered.
    pub traveled: f64,
    row_skip_at_start: u32,
    fingerprint: Option<[u64; 8]>,
    last_position: Option<Vec2>,
}

impl TurnState {
    pub fn is_executing(&self) -> bool { self.phase == TurnPhase::Executing && self.path.is_some() }

    pub fn is_consistent(&self) -> bool {
        (self.phase == TurnPhase::Idle) == self.path.is_none()
    }
}

/// One guidance update.
#[derive(Clone, Copy, Debug)]
pub struct TickInput<'a> {
    pub pose: Vec3,
    /// m/s, used for the look-ahead.
    pub speed: f64,
    /// The original reference track; the followed pass is derived from it.
    pub reference: Option<&'a Track>,
    pub field: Option<&'a FieldGeometry>,
    pub options: &'a TurnOptions,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickOutcome {
    pub phase: TurnPhase,
    pub zone: Zone,
    /// Raycast along the vehicle heading to the headland line, +inf if none.
    pub distance_to_headland: f64,
    pub steer: Option<SteerCommand>,
    pub completed: bool,
}

pub struct TurnStateMachine<F: TurnFollower = PurePursuit> {
    state: TurnState,
    follower: F,
}

impl Default for TurnStateMachine<PurePursuit> {
    fn default() -> Self { Self::new() }
}

impl TurnStateMachine<PurePursuit> {
    pub fn new() -> Self { Self::with_follower(PurePursuit::new()) }
}

impl<F: TurnFollower> TurnStateMachine<F> {
    pub fn with_follower(follower: F) -> Self { Self { state: TurnState::default(), follower } }

    pub fn state(&self) -> &TurnState { &self.state }

    pub fn phase(&self) -> TurnPhase { self.state.phase }

    pub fn paths_away(&self) -> i32 { self.state.paths_away }

    /// The pass guidance should follow right now.
    pub fn active_track(&self, reference: &Track, options: &TurnOptions) -> Result<Track> {
        track_at_paths_away(reference, self.state.paths_away, options.pass_spacing())
    }

    /// Direction the next (or pending) turn will take: operator override,
    /// else the opposite of the last turn, else the configured first turn.
    pub fn intended_turn_left(&self, options: &TurnOptions) -> bool {
        if self.state.phase == TurnPhase::Executing {
            return self.state.is_turn_left;
        }
        self.state
            .direction_override
            .unwrap_or_else(|| self.state.last_turn_was_left.map_or(options.first_turn_left, |l| !l))
    }

    /// Refused while a turn is executing.
    pub fn set_turn_direction(&mut self, left: bool) -> bool {
        if self.state.phase == TurnPhase::Executing {
            return false;
        }
        self.state.direction_override = Some(left);
        true
    }

    pub fn swap_turn_direction(&mut self, options: &TurnOptions) -> bool {
        let left = self.intended_turn_left(options);
        self.set_turn_direction(!left)
    }

    pub fn tick(&mut self, input: &TickInput<'_>, sink: &mut dyn TurnSink) -> TickOutcome {
        let opts = input.options.validated();
        let pos = input.pose.xy();
        let moved = self.state.last_position.map_or(0.0, |p| p.distance(pos));
        self.state.last_position = Some(pos);

        let headland = input.field.and_then(FieldGeometry::valid_headland);
        let zone = classify_zone(pos, headland, input.field.map(|f| &f.boundary.points[..]));
        let distance_to_headland =
            headland.map_or(f64::INFINITY, |h| ray_polygon_distance(pos, direction(input.pose.heading), h));
        let active = input.reference.and_then(|r| track_at_paths_away(r, self.state.paths_away, opts.pass_spacing()).ok());
        let alignment = active
            .as_ref()
            .map_or(Alignment::Misaligned, |t| track_alignment(t, input.pose, opts.alignment_tolerance()));
        debug!(phase = ?self.state.phase, ?zone, distance_to_headland, ?alignment, "turn tick");

        match self.state.phase {
            TurnPhase::Idle => {
                if let (Some(field), Some(reference), Some(active)) = (input.field, input.reference, active.as_ref()) {
                    let ctx = CreateContext { pose: input.pose, field, reference, active, zone, distance_to_headland, alignment };
                    self.try_create(&ctx, &opts, sink);
                } else if self.state.retry_cooldown > 0 {
                    self.state.retry_cooldown -= 1;
                }
            }
            TurnPhase::PathPending => self.check_pending(pos, zone, alignment, &opts, sink),
            TurnPhase::Executing => self.state.traveled += moved,
        }

        let mut outcome = TickOutcome { phase: self.state.phase, zone, distance_to_headland, steer: None, completed: false };
        if self.state.phase == TurnPhase::Executing {
            if let Some(path) = self.state.path.clone() {
                let cmd = self.follower.steer(&path, input.pose, input.speed, &opts.vehicle);
                sink.on_steer(cmd.angle);
                outcome.steer = Some(cmd);
                if self.completion_due(&path, pos, cmd, &opts) {
                    outcome.completed = self.complete_turn(sink);
                }
            }
        }
        outcome.phase = self.state.phase;
        outcome
    }

    fn try_create(&mut self, ctx: &CreateContext<'_>, opts: &TurnOptions, sink: &mut dyn TurnSink) {
        if self.state.retry_cooldown > 0 {
            self.state.retry_cooldown -= 1;
            return;
        }
        if ctx.zone != Zone::InCultivated {
            return;
        }
        let same_way = match ctx.alignment {
            Alignment::SameWay => true,
            Alignment::OppositeWay => false,
            Alignment::Misaligned => return,
        };
        let d = ctx.distance_to_headland;
        if !(d > opts.min_trigger_distance && d < opts.max_trigger_distance) {
            return;
        }
        if !ctx.field.is_current(opts) {
            return self.creation_failed(TurnError::StaleField, opts, sink);
        }

        let left = self.intended_turn_left(opts);
        let next = match next_track(ctx.reference, self.state.paths_away, left, same_way, opts) {
            Ok(n) => n,
            Err(e) => return self.creation_failed(e, opts, sink),
        };
        match next.track.midpoint() {
            Some(mid) if ctx.field.inside_boundary(mid) => {}
            _ => {
                info!(paths_away = next.paths_away, "end of field reached");
                self.state.retry_cooldown = opts.retry_cooldown_ticks;
                sink.on_status(&TurnStatus::EndOfField);
                return;
            }
        }

        let req = TurnRequest {
            pose: ctx.pose,
            track: ctx.active,
            field: ctx.field,
            next: &next,
            is_turn_left: left,
            is_heading_same_way: same_way,
            options: opts,
        };
        let turn = match synthesize(&req) {
            Ok(t) => t,
            Err(e) => return self.creation_failed(e, opts, sink),
        };
        let path = trim_behind(&turn, ctx.pose.xy());
        if path.len() < 2 {
            return self.creation_failed(TurnError::DegenerateGeometry("turn path lies behind the vehicle"), opts, sink);
        }

        info!(
            strategy = ?turn.strategy,
            points = path.len(),
            radius = turn.radius,
            left,
            same_way,
            distance = d,
            next_paths_away = next.paths_away,
            "turn path created"
        );
        let status = TurnStatus::Created { strategy: turn.strategy, points: path.len() };
        sink.on_next_track(Some(&next));
        sink.on_turn_path(Some(&path));
        sink.on_status(&status);

        let s = &mut self.state;
        s.phase = TurnPhase::PathPending;
        s.path = Some(path);
        s.next = Some(next);
        s.is_turn_left = left;
        s.was_heading_same_way_at_turn_start = same_way;
        s.row_skip_at_start = opts.row_skip;
        s.fingerprint = Some(opts.path_fingerprint());
        s.traveled = 0.0;
    }

    fn creation_failed(&mut self, reason: TurnError, opts: &TurnOptions, sink: &mut dyn TurnSink) {
        warn!(%reason, cooldown = opts.retry_cooldown_ticks, "turn creation failed");
        self.state.retry_cooldown = opts.retry_cooldown_ticks;
        sink.on_status(&TurnStatus::CreationFailed(reason));
    }

    fn check_pending(&mut self, pos: Vec2, zone: Zone, alignment: Alignment, opts: &TurnOptions, sink: &mut dyn TurnSink) {
        let s = &self.state;
        let reversed = match alignment {
            Alignment::SameWay => !s.was_heading_same_way_at_turn_start,
            Alignment::OppositeWay => s.was_heading_same_way_at_turn_start,
            Alignment::Misaligned => true,
        };
        let reason = if reversed {
            Some(DiscardReason::TurnedAway)
        } else if s.fingerprint != Some(opts.path_fingerprint()) {
            Some(DiscardReason::SettingsChanged)
        } else if s.direction_override.is_some_and(|l| l != s.is_turn_left) {
            Some(DiscardReason::DirectionChanged)
        } else {
            None
        };
        if let Some(reason) = reason {
            return self.discard(reason, sink);
        }

        let start = s.path.as_ref().and_then(|p| p.first()).map(|p| p.xy());
        match start {
            Some(first) if first.distance(pos) < opts.capture_radius => {
                info!(paths_away = self.state.paths_away, left = self.state.is_turn_left, "turn triggered");
                self.state.phase = TurnPhase::Executing;
                self.state.traveled = 0.0;
                self.follower.reset();
                sink.on_in_turn(true);
                sink.on_status(&TurnStatus::Triggered);
            }
            Some(_) if zone == Zone::InHeadland => self.discard(DiscardReason::EnteredHeadland, sink),
            Some(_) => {}
            None => self.discard(DiscardReason::SettingsChanged, sink),
        }
    }

    fn discard(&mut self, reason: DiscardReason, sink: &mut dyn TurnSink) {
        info!(?reason, "pending turn path discarded");
        let s = &mut self.state;
        s.phase = TurnPhase::Idle;
        s.path = None;
        s.next = None;
        s.fingerprint = None;
        sink.on_turn_path(None);
        sink.on_next_track(None);
        sink.on_status(&TurnStatus::Discarded(reason));
    }

    fn completion_due(&self, path: &[Vec3], pos: Vec2, cmd: SteerCommand, opts: &TurnOptions) -> bool {
        let (Some(first), Some(last)) = (path.first(), path.last()) else { return true };
        let d_first = first.xy().distance(pos);
        let d_last = last.xy().distance(pos);
        if self.state.traveled < opts.min_travel_distance || d_last >= d_first {
            return false;
        }
        d_last < opts.capture_radius || cmd.complete
    }

    /// Finishes the executing turn. A no-op returning `false` in any other
    /// phase, so a second call for the same turn changes nothing.
    pub fn complete_turn(&mut self, sink: &mut dyn TurnSink) -> bool {
        if self.state.phase != TurnPhase::Executing {
            return false;
        }
        let s = &mut self.state;
        s.paths_away = next_paths_away(s.paths_away, s.is_turn_left, s.was_heading_same_way_at_turn_start, s.row_skip_at_start);
        if let Some(next) = &s.next {
            if next.paths_away != s.paths_away {
                warn!(predicted = next.paths_away, actual = s.paths_away, "completed pass differs from preview");
            }
        }
        s.last_turn_was_left = Some(s.is_turn_left);
        s.direction_override = None;
        s.phase = TurnPhase::Idle;
        s.path = None;
        s.next = None;
        s.fingerprint = None;
        s.traveled = 0.0;
        self.follower.reset();

        let event = TurnCompleted { paths_away: s.paths_away, turned_left: s.is_turn_left, relocalize: true };
        info!(paths_away = event.paths_away, left = event.turned_left, "turn completed");
        sink.on_turn_path(None);
        sink.on_next_track(None);
        sink.on_in_turn(false);
        sink.on_turn_completed(&event);
        sink.on_status(&TurnStatus::Completed { paths_away: event.paths_away });
        true
    }

    /// Operator-initiated turn from the current pose. Goes straight to
    /// `Executing`; a pending path is replaced.
    pub fn manual_turn(&mut self, left: bool, input: &TickInput<'_>, sink: &mut dyn TurnSink) -> Result<()> {
        let result = self.build_manual(left, input);
        let (turn, next, same_way) = match result {
            Ok(v) => v,
            Err(e) => {
                warn!(reason = %e, "manual turn refused");
                sink.on_status(&TurnStatus::CreationFailed(e.clone()));
                return Err(e);
            }
        };
        let opts = input.options.validated();
        info!(left, points = turn.path.len(), next_paths_away = next.paths_away, "manual turn started");
        sink.on_next_track(Some(&next));
        sink.on_turn_path(Some(&turn.path));
        sink.on_in_turn(true);
        sink.on_status(&TurnStatus::Created { strategy: turn.strategy, points: turn.path.len() });
        sink.on_status(&TurnStatus::Triggered);

        let s = &mut self.state;
        s.phase = TurnPhase::Executing;
        s.path = Some(turn.path);
        s.next = Some(next);
        s.is_turn_left = left;
        s.was_heading_same_way_at_turn_start = same_way;
        s.row_skip_at_start = opts.row_skip;
        s.fingerprint = Some(opts.path_fingerprint());
        s.traveled = 0.0;
        s.last_position = Some(input.pose.xy());
        self.follower.reset();
        Ok(())
    }

    fn build_manual(&self, left: bool, input: &TickInput<'_>) -> Result<(PlannedTurn, NextTrack, bool)> {
        if self.state.phase == TurnPhase::Executing {
            return Err(TurnError::TurnInProgress);
        }
        let opts = input.options.validated();
        let field = input.field.ok_or(TurnError::MissingBoundary)?;
        let reference = input.reference.ok_or(TurnError::MissingTrack)?;
        let active = track_at_paths_away(reference, self.state.paths_away, opts.pass_spacing())?;
        let base = local_heading(&active, input.pose.xy()).ok_or(TurnError::MissingTrack)?;
        let same_way = angle_diff(base, input.pose.heading).abs() <= FRAC_PI_2;
        let next = next_track(reference, self.state.paths_away, left, same_way, &opts)?;
        let turn = synthesize_manual(input.pose, &next, left, field, &opts)?;
        Ok((turn, next, same_way))
    }

    /// Field closed or switched: back to a fresh `Idle`, counters included.
    pub fn reset(&mut self, sink: &mut dyn TurnSink) {
        let was = self.state.phase;
        self.state = TurnState::default();
        self.follower.reset();
        info!(from = ?was, "turn state reset");
        sink.on_turn_path(None);
        sink.on_next_track(None);
        sink.on_in_turn(false);
        sink.on_status(&TurnStatus::Reset);
    }
}

struct CreateContext<'a> {
    pose: Vec3,
    field: &'a FieldGeometry,
    reference: &'a Track,
    active: &'a Track,
    zone: Zone,
    distance_to_headland: f64,
    alignment: Alignment,
}

/// Drops entry points the vehicle has already passed, so the first point is
/// always ahead of it. The arc is never trimmed.
fn trim_behind(turn: &PlannedTurn, pos: Vec2) -> TurnPath {
    let dir = turn.frame.direction();
    let limit = turn.sections.arc_start.min(turn.path.len());
    let skip = turn.path[..limit].iter().take_while(|p| (p.xy() - pos).dot(dir) < 0.0).count();
    if skip == 0 { turn.path.clone() } else { Arc::from(&turn.path[skip..]) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Boundary;
    use crate::sink::{NoopSink, RecordingSink, SinkEvent};

    struct Field {
        field: FieldGeometry,
        reference: Track,
        opts: TurnOptions,
    }

    impl Field {
        /// 100 m square, AB line 10 m from the west edge, 8 m headland.
        fn square() -> Self {
            let opts = TurnOptions { headland_width: 8.0, turn_radius: 6.0, tool_width: 6.0, ..TurnOptions::default() };
            Self::with(opts, 10.0)
        }

        fn with(opts: TurnOptions, easting: f64) -> Self {
            let b = Boundary::new(vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(100.0, 0.0),
                Vec2::new(100.0, 100.0),
                Vec2::new(0.0, 100.0),
            ]);
            let field = FieldGeometry::build(b, &opts).unwrap();
            let reference = Track::ab_line("ab", Vec2::new(easting, 0.0), Vec2::new(easting, 100.0));
            Self { field, reference, opts }
        }

        fn input(&self, pose: Vec3) -> TickInput<'_> {
            TickInput { pose, speed: 2.0, reference: Some(&self.reference), field: Some(&self.field), options: &self.opts }
        }
    }

    fn drive_through(m: &mut TurnStateMachine, f: &Field, sink: &mut RecordingSink) -> bool {
        let path = m.state().path.clone().unwrap();
        for p in path.iter() {
            let out = m.tick(&f.input(*p), sink);
            if out.completed {
                return true;
            }
        }
        false
    }

    #[test]
    fn creates_inside_window() {
        let f = Field::square();
        let mut m = TurnStateMachine::new();
        let mut sink = RecordingSink::new();
        let out = m.tick(&f.input(Vec3::new(10.0, 57.0, 0.0)), &mut sink);
        assert_eq!(out.zone, Zone::InCultivated);
        assert!((out.distance_to_headland - 35.0).abs() < 1e-9);
        assert_eq!(out.phase, TurnPhase::PathPending);
        let path = m.state().path.clone().unwrap();
        assert!(path.len() > 10);
        assert!(m.state().is_consistent());
        assert_eq!(m.state().next.as_ref().map(|n| n.paths_away), Some(1));
        assert!(path[0].northing > 57.0);
    }

    #[test]
    fn outside_window_stays_idle() {
        let f = Field::square();
        let mut m = TurnStateMachine::new();
        for n in [20.0, 85.0] {
            let out = m.tick(&f.input(Vec3::new(10.0, n, 0.0)), &mut NoopSink);
            assert_eq!(out.phase, TurnPhase::Idle);
        }
        // misaligned
        let out = m.tick(&f.input(Vec3::new(10.0, 57.0, 1.0)), &mut NoopSink);
        assert_eq!(out.phase, TurnPhase::Idle);
        assert!(m.state().is_consistent());
    }

    #[test]
    fn full_turn_updates_paths_away() {
        let f = Field::square();
        let mut m = TurnStateMachine::new();
        let mut sink = RecordingSink::new();
        m.tick(&f.input(Vec3::new(10.0, 57.0, 0.0)), &mut sink);
        let preview = m.state().next.clone().unwrap();

        // drive up the pass until the turn triggers
        let mut n = 57.0;
        while m.phase() == TurnPhase::PathPending && n < 92.0 {
            n += 0.5;
            m.tick(&f.input(Vec3::new(10.0, n, 0.0)), &mut sink);
        }
        assert_eq!(m.phase(), TurnPhase::Executing);
        assert!(m.state().is_executing());

        assert!(drive_through(&mut m, &f, &mut sink));
        assert_eq!(m.phase(), TurnPhase::Idle);
        assert_eq!(m.paths_away(), 1);
        assert_eq!(m.state().last_turn_was_left, Some(false));
        assert!(m.state().path.is_none());
        let done: Vec<_> = sink.completions().copied().collect();
        assert_eq!(done, vec![TurnCompleted { paths_away: 1, turned_left: false, relocalize: true }]);
        assert!(sink.events.iter().any(|e| matches!(e, SinkEvent::Steer(_))));

        // the pass guidance follows now is the one that was previewed
        assert_eq!(m.active_track(&f.reference, &f.opts).unwrap(), preview.track);
        // next turn alternates
        assert!(m.intended_turn_left(&f.opts));
    }

    #[test]
    fn completion_is_idempotent() {
        let f = Field::square();
        let mut m = TurnStateMachine::new();
        let mut sink = RecordingSink::new();
        assert!(!m.complete_turn(&mut sink));
        assert_eq!(m.paths_away(), 0);
        m.tick(&f.input(Vec3::new(10.0, 57.0, 0.0)), &mut sink);
        // pending is not executing
        assert!(!m.complete_turn(&mut sink));
        assert_eq!(m.paths_away(), 0);
        assert_eq!(sink.completions().count(), 0);
    }

    #[test]
    fn end_of_field_never_goes_pending() {
        let opts = TurnOptions { headland_width: 8.0, tool_width: 15.0, retry_cooldown_ticks: 3, ..TurnOptions::default() };
        let f = Field::with(opts, 88.0);
        let mut m = TurnStateMachine::new();
        let mut sink = RecordingSink::new();
        for _ in 0..5 {
            let out = m.tick(&f.input(Vec3::new(88.0, 57.0, 0.0)), &mut sink);
            assert_eq!(out.phase, TurnPhase::Idle);
        }
        // one report, three quiet ticks, one more report
        let statuses: Vec<_> = sink.statuses().cloned().collect();
        assert_eq!(statuses, vec![TurnStatus::EndOfField, TurnStatus::EndOfField]);
        assert_eq!(statuses[0].to_string(), "end of field reached");
    }

    #[test]
    fn pending_path_dropped_in_headland() {
        let f = Field::square();
        let mut m = TurnStateMachine::new();
        let mut sink = RecordingSink::new();
        m.tick(&f.input(Vec3::new(10.0, 57.0, 0.0)), &mut sink);
        let out = m.tick(&f.input(Vec3::new(10.0, 95.0, 0.0)), &mut sink);
        assert_eq!(out.phase, TurnPhase::Idle);
        assert!(sink.statuses().any(|s| *s == TurnStatus::Discarded(DiscardReason::EnteredHeadland)));
        assert!(sink.current_path().is_none());
    }

    #[test]
    fn pending_path_dropped_on_settings_change() {
        let f = Field::square();
        let mut m = TurnStateMachine::new();
        let mut sink = RecordingSink::new();
        m.tick(&f.input(Vec3::new(10.0, 57.0, 0.0)), &mut sink);
        let changed = TurnOptions { extension_length: 15.0, ..f.opts.clone() };
        let input = TickInput { options: &changed, ..f.input(Vec3::new(10.0, 57.5, 0.0)) };
        m.tick(&input, &mut sink);
        assert_eq!(m.phase(), TurnPhase::Idle);
        assert!(sink.statuses().any(|s| *s == TurnStatus::Discarded(DiscardReason::SettingsChanged)));
    }

    #[test]
    fn swapping_direction_rebuilds_pending_path() {
        let f = Field::square();
        let mut m = TurnStateMachine::new();
        let mut sink = RecordingSink::new();
        m.tick(&f.input(Vec3::new(10.0, 57.0, 0.0)), &mut sink);
        assert!(!m.state().is_turn_left);
        assert!(m.swap_turn_direction(&f.opts));
        m.tick(&f.input(Vec3::new(10.0, 57.5, 0.0)), &mut sink);
        assert_eq!(m.phase(), TurnPhase::Idle);
        m.tick(&f.input(Vec3::new(10.0, 58.0, 0.0)), &mut sink);
        assert_eq!(m.phase(), TurnPhase::PathPending);
        assert!(m.state().is_turn_left);
        assert_eq!(m.state().next.as_ref().map(|n| n.paths_away), Some(-1));
    }

    #[test]
    fn stale_field_blocks_creation() {
        let mut f = Field::square();
        f.opts.headland_width = 12.0;
        let mut m = TurnStateMachine::new();
        let mut sink = RecordingSink::new();
        let out = m.tick(&f.input(Vec3::new(10.0, 57.0, 0.0)), &mut sink);
        assert_eq!(out.phase, TurnPhase::Idle);
        assert!(m.state().path.is_none());
        assert_eq!(sink.statuses().last(), Some(&TurnStatus::CreationFailed(TurnError::StaleField)));

        // rebuilding with the new settings clears it
        let f = Field::with(f.opts.clone(), 10.0);
        let mut m = TurnStateMachine::new();
        assert_eq!(m.tick(&f.input(Vec3::new(10.0, 57.0, 0.0)), &mut sink).phase, TurnPhase::PathPending);
    }

    #[test]
    fn missing_collaborators_keep_idle() {
        let f = Field::square();
        let mut m = TurnStateMachine::new();
        let no_field = TickInput { field: None, ..f.input(Vec3::new(10.0, 57.0, 0.0)) };
        assert_eq!(m.tick(&no_field, &mut NoopSink).phase, TurnPhase::Idle);
        let no_track = TickInput { reference: None, ..f.input(Vec3::new(10.0, 57.0, 0.0)) };
        let out = m.tick(&no_track, &mut NoopSink);
        assert_eq!(out.phase, TurnPhase::Idle);
        assert_eq!(out.zone, Zone::InCultivated);
    }

    #[test]
    fn manual_turn_executes_immediately() {
        let f = Field::square();
        let mut m = TurnStateMachine::new();
        let mut sink = RecordingSink::new();
        let pose = Vec3::new(40.0, 50.0, PI);
        m.manual_turn(true, &f.input(pose), &mut sink).unwrap();
        assert_eq!(m.phase(), TurnPhase::Executing);
        let path = m.state().path.clone().unwrap();
        assert_eq!(path[0].xy(), pose.xy());
        // heading south against the line, a left turn moves east: positive offset
        assert_eq!(m.state().next.as_ref().map(|n| n.paths_away), Some(1));
        assert_eq!(m.manual_turn(true, &f.input(pose), &mut sink).unwrap_err(), TurnError::TurnInProgress);
    }

    #[test]
    fn reset_clears_everything() {
        let f = Field::square();
        let mut m = TurnStateMachine::new();
        let mut sink = RecordingSink::new();
        m.tick(&f.input(Vec3::new(10.0, 57.0, 0.0)), &mut sink);
        m.set_turn_direction(true);
        m.reset(&mut sink);
        assert_eq!(m.phase(), TurnPhase::Idle);
        assert!(m.state().path.is_none() && m.state().next.is_none());
        assert_eq!(m.state().direction_override, None);
        assert_eq!(sink.statuses().last(), Some(&TurnStatus::Reset));
    }

    #[test]
    fn alignment_classification() {
        let t = Track::ab_line("ab", Vec2::new(0.0, 0.0), Vec2::new(0.0, 10.0));
        let tol = 20f64.to_radians();
        assert_eq!(track_alignment(&t, Vec3::new(0.0, 5.0, 0.1), tol), Alignment::SameWay);
        assert_eq!(track_alignment(&t, Vec3::new(0.0, 5.0, PI - 0.1), tol), Alignment::OppositeWay);
        assert_eq!(track_alignment(&t, Vec3::new(0.0, 5.0, FRAC_PI_2), tol), Alignment::Misaligned);
    }
}
