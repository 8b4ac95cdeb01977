//! Primary solver. Builds the arc for the configured radius and slides it
//! back from the outer edge of the turn area until every arc point fits.

use tracing::debug;

use super::approach::Approach;
use super::shape::{u_turn_primitives, PathBuilder};
use super::{PathSections, RawTurn, TurnFrame, TurnRequest};
use crate::error::{Result, TurnError};

/// Arc radius for a given pass offset: the configured radius, never below
/// half the offset or the absolute floor.
pub fn effective_radius(turn_radius: f64, turn_offset: f64, min_turn_radius: f64) -> f64 {
    turn_radius.max(turn_offset / 2.0).max(min_turn_radius)
}

pub(crate) fn plan(req: &TurnRequest<'_>, frame: &TurnFrame) -> Result<RawTurn> {
    let opts = req.options;
    if req.field.turn_area.is_none() {
        return Err(TurnError::TurnAreaCollapsed(req.field.distance_from_boundary()));
    }
    let w = req.next.turn_offset;
    let radius = effective_radius(opts.turn_radius, w, opts.min_turn_radius);
    let approach = Approach::new(req.track, req.is_heading_same_way, frame);
    let primitives = u_turn_primitives(w, radius, req.is_turn_left);
    let arc_at = |shift: f64| {
        let (start, heading) = approach.anchor(shift);
        let mut arc = PathBuilder::new(start, heading, opts.point_spacing, opts.min_arc_points);
        arc.apply(&primitives);
        arc.finish()
    };

    let step = opts.point_spacing.max(0.1);
    let start = req.field.headland_width() - req.field.distance_from_boundary();
    // never slide the arc behind the vehicle
    let floor = frame.along(req.pose.xy());
    let (shift, arc_points) = (0..opts.max_slide_steps)
        .map(|k| start - step * k as f64)
        .take_while(|&s| s >= floor)
        .map(|s| (s, arc_at(s)))
        .find(|(_, arc)| arc.iter().all(|p| req.field.inside_turn_area(p.xy())))
        .ok_or(TurnError::ArcOutsideTurnArea)?;
    debug!(shift, radius, turn_offset = w, "constrained arc placed");

    // entry follows the pass back from the arc start
    let mut points = approach.entry(opts.extension_length + (-shift).max(0.0), shift, opts.point_spacing);
    let arc_idx = points.len() - 1;
    points.extend_from_slice(&arc_points[1..]);
    let exit_idx = points.len() - 1;
    let exit_len = opts.extension_length + shift.max(0.0);

    let exit_from = points[exit_idx];
    let mut exit = PathBuilder::new(exit_from.xy(), exit_from.heading, opts.point_spacing, opts.min_arc_points);
    exit.straight(exit_len);
    let exit_points = exit.finish();
    points.extend_from_slice(&exit_points[1..]);

    let end = points[points.len() - 1].xy();
    if !req.field.inside_boundary(end) {
        return Err(TurnError::ExitOutsideBoundary);
    }
    Ok(RawTurn { points, sections: PathSections { arc_start: arc_idx, exit_start: exit_idx }, radius })
}
