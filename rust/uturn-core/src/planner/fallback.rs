//! Fallback constructor: entry leg, 180 degree arc, mirrored exit leg, laid
//! out directly from the headland crossing without searching. Deterministic
//! for a given request.

use tracing::debug;

use super::approach::Approach;
use super::shape::{u_turn_primitives, PathBuilder};
use super::{PathSections, RawTurn, TurnFrame, TurnRequest};
use crate::error::{Result, TurnError};
use crate::field::FieldGeometry;
use crate::models::Vec3;
use crate::options::TurnOptions;

/// How far past the headland crossing the arc starts. Negative values start
/// the arc before the crossing.
pub fn headland_leg_length(headland_width: f64, turn_radius: f64, distance_from_boundary: f64) -> f64 {
    headland_width - turn_radius - distance_from_boundary
}

/// Configured radius, or half the offset when the passes are closer than
/// the diameter (a plain semicircle).
pub fn fallback_radius(turn_offset: f64, turn_radius: f64, min_turn_radius: f64) -> f64 {
    let configured = turn_radius.max(min_turn_radius);
    if turn_offset < 2.0 * configured { turn_offset / 2.0 } else { configured }
}

pub(crate) fn plan(req: &TurnRequest<'_>, frame: &TurnFrame) -> Result<RawTurn> {
    let opts = req.options;
    let w = req.next.turn_offset;
    if w < 1e-3 {
        return Err(TurnError::DegenerateGeometry("turn offset is zero"));
    }
    let radius = fallback_radius(w, opts.turn_radius, opts.min_turn_radius);
    let leg = headland_leg_length(req.field.headland_width(), radius, req.field.distance_from_boundary());
    let exit_len = (opts.extension_length + leg).max(0.0);
    let approach = Approach::new(req.track, req.is_heading_same_way, frame);
    let entry = approach.entry(opts.extension_length.max(-leg), leg, opts.point_spacing);

    let raw = lay_out(entry, exit_len, w, radius, req.is_turn_left, opts)?;
    validate(&raw, frame, req.field)?;
    debug!(radius, leg, exit_len, "fallback turn built");
    Ok(raw)
}

/// Operator-initiated turn laid out from the vehicle's own pose, with no
/// headland involved. The entry leg is one capture radius long so the
/// vehicle is on the path from the start.
pub(crate) fn manual(frame: &TurnFrame, turn_offset: f64, is_turn_left: bool, field: &FieldGeometry, opts: &TurnOptions) -> Result<RawTurn> {
    if turn_offset < 1e-3 {
        return Err(TurnError::DegenerateGeometry("turn offset is zero"));
    }
    let radius = fallback_radius(turn_offset, opts.turn_radius, opts.min_turn_radius);
    let mut entry = PathBuilder::new(frame.origin, frame.heading, opts.point_spacing, opts.min_arc_points);
    entry.straight(opts.capture_radius);
    let raw = lay_out(entry.finish(), opts.extension_length, turn_offset, radius, is_turn_left, opts)?;
    validate(&raw, frame, field)?;
    debug!(radius, turn_offset, "manual turn built");
    Ok(raw)
}

/// Arc and exit leg appended to an entry leg that ends where the arc starts.
fn lay_out(mut points: Vec<Vec3>, exit_len: f64, w: f64, radius: f64, left: bool, opts: &TurnOptions) -> Result<RawTurn> {
    let anchor = *points.last().ok_or(TurnError::DegenerateGeometry("empty entry leg"))?;
    let arc_idx = points.len() - 1;
    let mut b = PathBuilder::new(anchor.xy(), anchor.heading, opts.point_spacing, opts.min_arc_points);
    b.apply(&u_turn_primitives(w, radius, left));
    let exit_idx = arc_idx + b.len() - 1;
    b.straight(exit_len);
    points.extend_from_slice(&b.finish()[1..]);
    Ok(RawTurn { points, sections: PathSections { arc_start: arc_idx, exit_start: exit_idx }, radius })
}

fn validate(raw: &RawTurn, frame: &TurnFrame, field: &FieldGeometry) -> Result<()> {
    let end = raw.points[raw.points.len() - 1].xy();
    if !field.inside_boundary(end) {
        return Err(TurnError::ExitOutsideBoundary);
    }
    if field.distance_from_boundary() >= 0.0 {
        let apex = raw.points[raw.sections.arc_start..=raw.sections.exit_start]
            .iter()
            .map(|p| p.xy())
            .max_by(|p, q| frame.along(*p).total_cmp(&frame.along(*q)));
        if let Some(apex) = apex {
            if !field.inside_boundary(apex) {
                return Err(TurnError::ApexOutsideBoundary);
            }
        }
    }
    Ok(())
}
