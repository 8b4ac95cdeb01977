//! Turn path synthesizer.
//!
//! [`synthesize`] runs the constrained solver first and, when it fails,
//! calls the fallback constructor explicitly. Both strategies share the same
//! [`TurnFrame`]: where the current pass crosses the headland ahead and the
//! travel heading there.

use std::f64::consts::PI;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TurnError};
use crate::field::FieldGeometry;
use crate::geometry::{assign_headings, line_intersection, nearest_on_polyline, ray_polygon_distance, total_heading_change};
use crate::models::{direction, heading_between, normalize_heading, Track, TrackKind, TurnPath, Vec2, Vec3};
use crate::next_track::NextTrack;
use crate::options::TurnOptions;

mod approach;
pub mod constrained;
pub mod fallback;
pub mod shape;
pub mod smoothing;

pub use smoothing::smooth;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Constrained,
    Fallback,
}

/// Everything one synthesis needs, passed in explicitly.
#[derive(Clone, Copy, Debug)]
pub struct TurnRequest<'a> {
    pub pose: Vec3,
    /// The pass the vehicle is on now, already offset from the reference.
    pub track: &'a Track,
    pub field: &'a FieldGeometry,
    pub next: &'a NextTrack,
    pub is_turn_left: bool,
    pub is_heading_same_way: bool,
    pub options: &'a TurnOptions,
}

/// Where the turn is anchored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TurnFrame {
    /// Projection of the vehicle onto the current pass.
    pub origin: Vec2,
    /// Point where the current pass crosses the headland line ahead.
    pub crossing: Vec2,
    /// Travel heading at the crossing.
    pub heading: f64,
}

impl TurnFrame {
    pub fn direction(&self) -> Vec2 { direction(self.heading) }

    /// Signed distance of `p` ahead of the crossing along the travel heading.
    pub fn along(&self, p: Vec2) -> f64 { (p - self.crossing).dot(self.direction()) }
}

/// Index ranges of the three legs inside [`PlannedTurn::path`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSections {
    /// First index of the arc (the last entry point is `arc_start`).
    pub arc_start: usize,
    /// First index of the exit leg (the last arc point is `exit_start`).
    pub exit_start: usize,
}

#[derive(Clone, Debug)]
pub struct PlannedTurn {
    pub path: TurnPath,
    pub strategy: Strategy,
    pub radius: f64,
    pub frame: TurnFrame,
    pub sections: PathSections,
    /// Net signed heading change, radians.
    pub heading_change: f64,
    /// Why the constrained solver was skipped, when the fallback produced the path.
    pub primary_failure: Option<TurnError>,
}

/// Raw output of one strategy before post-processing.
#[derive(Debug)]
pub(crate) struct RawTurn {
    pub points: Vec<Vec3>,
    pub sections: PathSections,
    pub radius: f64,
}

pub fn synthesize(req: &TurnRequest<'_>) -> Result<PlannedTurn> {
    if !req.field.boundary.is_valid() {
        return Err(TurnError::MissingBoundary);
    }
    if !req.track.is_usable() {
        return Err(TurnError::MissingTrack);
    }
    if !(req.next.turn_offset.is_finite() && req.next.turn_offset > 1e-3) {
        return Err(TurnError::DegenerateGeometry("turn offset is zero"));
    }
    let frame = locate_frame(req)?;
    debug!(
        crossing_e = frame.crossing.easting,
        crossing_n = frame.crossing.northing,
        heading = frame.heading.to_degrees(),
        turn_offset = req.next.turn_offset,
        left = req.is_turn_left,
        "turn frame located"
    );

    let primary = constrained::plan(req, &frame).and_then(|raw| finish(raw, req.options));
    match primary {
        Ok((raw, heading_change)) => Ok(planned(raw, heading_change, Strategy::Constrained, frame, None)),
        Err(reason) => {
            warn!(%reason, "constrained turn failed, using fallback geometry");
            let (raw, heading_change) = fallback::plan(req, &frame).and_then(|raw| finish(raw, req.options))?;
            Ok(planned(raw, heading_change, Strategy::Fallback, frame, Some(reason)))
        }
    }
}

/// Turn from the vehicle's current pose, without a headland. Always uses the
/// fallback geometry.
pub fn synthesize_manual(pose: Vec3, next: &NextTrack, is_turn_left: bool, field: &FieldGeometry, options: &TurnOptions) -> Result<PlannedTurn> {
    if !field.boundary.is_valid() {
        return Err(TurnError::MissingBoundary);
    }
    let frame = TurnFrame { origin: pose.xy(), crossing: pose.xy(), heading: normalize_heading(pose.heading) };
    let (raw, heading_change) =
        fallback::manual(&frame, next.turn_offset, is_turn_left, field, options).and_then(|raw| finish(raw, options))?;
    Ok(planned(raw, heading_change, Strategy::Fallback, frame, None))
}

fn planned(raw: RawTurn, heading_change: f64, strategy: Strategy, frame: TurnFrame, primary_failure: Option<TurnError>) -> PlannedTurn {
    PlannedTurn {
        path: Arc::from(raw.points),
        strategy,
        radius: raw.radius,
        frame,
        sections: raw.sections,
        heading_change,
        primary_failure,
    }
}

/// Smoothing, heading assignment and the spiral check shared by both strategies.
fn finish(mut raw: RawTurn, options: &TurnOptions) -> Result<(RawTurn, f64)> {
    let smoothed = smooth(&raw.points, options.smoothing_passes_clamped());
    raw.points = assign_headings(&smoothed, false);
    let change = total_heading_change(&raw.points);
    if change.abs() > options.max_heading_change() {
        return Err(TurnError::Spiral { degrees: change.abs().to_degrees() });
    }
    Ok((raw, change))
}

/// Finds where the current pass meets the headland ahead of the vehicle.
///
/// AB lines cast a ray from the vehicle's projection onto the line. Curves
/// walk their segments in the travel direction and take the heading of the
/// segment that crosses; past the last point the final segment is extended.
pub fn locate_frame(req: &TurnRequest<'_>) -> Result<TurnFrame> {
    let headland = req.field.valid_headland().ok_or(TurnError::HeadlandUnavailable)?;
    let pos = req.pose.xy();
    match req.track.kind() {
        TrackKind::AbLine => {
            let a = req.track.points[0].xy();
            let b = req.track.points[1].xy();
            let base = heading_between(a, b);
            let heading = if req.is_heading_same_way { base } else { normalize_heading(base + PI) };
            let along = direction(base);
            let origin = a + along * (pos - a).dot(along);
            let dir = direction(heading);
            let d = ray_polygon_distance(origin, dir, headland);
            if !d.is_finite() {
                return Err(TurnError::NoHeadlandCrossing);
            }
            Ok(TurnFrame { origin, crossing: origin + dir * d, heading })
        }
        TrackKind::Curve => curve_frame(req.track, pos, req.is_heading_same_way, headland),
    }
}

fn curve_frame(track: &Track, pos: Vec2, same_way: bool, headland: &[Vec3]) -> Result<TurnFrame> {
    let pts = approach::pass_points(track, same_way);
    if pts.len() < 2 {
        return Err(TurnError::DegenerateGeometry("curve needs two points"));
    }
    let (seg, origin, _) = nearest_on_polyline(&pts, pos).ok_or(TurnError::DegenerateGeometry("empty curve"))?;

    let mut from = origin;
    for &to in &pts[seg + 1..] {
        if from.distance_sq(to) > 1e-12 {
            if let Some(hit) = first_crossing(from, to, headland) {
                return Ok(TurnFrame { origin, crossing: hit, heading: heading_between(from, to) });
            }
        }
        from = to;
    }
    if track.closed {
        return Err(TurnError::NoHeadlandCrossing);
    }

    // ran off the end of an open curve: keep going straight
    let n = pts.len();
    let (a, b) = (pts[n - 2], pts[n - 1]);
    if a.distance_sq(b) <= 1e-12 {
        return Err(TurnError::NoHeadlandCrossing);
    }
    let heading = heading_between(a, b);
    let d = ray_polygon_distance(b, direction(heading), headland);
    if !d.is_finite() {
        return Err(TurnError::NoHeadlandCrossing);
    }
    Ok(TurnFrame { origin, crossing: b + direction(heading) * d, heading })
}

fn first_crossing(a: Vec2, b: Vec2, ring: &[Vec3]) -> Option<Vec2> {
    let n = ring.len();
    (0..n)
        .filter_map(|i| line_intersection(a, b, ring[i].xy(), ring[(i + 1) % n].xy()))
        .filter(|p| p.distance_sq(a) > 1e-12)
        .min_by(|p, q| p.distance_sq(a).total_cmp(&q.distance_sq(a)))
}

/// Entry leg runs forward, every arc point lies at or beyond the end of the
/// entry leg, and the exit leg runs back. `tolerance` absorbs smoothing at
/// the joints.
pub fn is_monotonic(turn: &PlannedTurn, tolerance: f64) -> bool {
    let along: Vec<f64> = turn.path.iter().map(|p| turn.frame.along(p.xy())).collect();
    let PathSections { arc_start, exit_start } = turn.sections;
    if arc_start > exit_start || exit_start >= along.len() {
        return false;
    }
    let entry = &along[..=arc_start];
    let arc = &along[arc_start..=exit_start];
    let exit = &along[exit_start..];
    let entry_end = entry[entry.len() - 1];
    entry.windows(2).all(|w| w[1] >= w[0] - tolerance)
        && arc.iter().all(|&a| a >= entry_end - tolerance)
        && exit.windows(2).all(|w| w[1] <= w[0] + tolerance)
}
