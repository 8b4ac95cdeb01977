//! Next-track calculator: which parallel pass follows the turn, and how far
//! apart the two passes are.
//!
//! Offsets are measured to the right of the reference track's A->B direction.
//! Whether a turn moves the pass index up or down depends on both the turn
//! direction and whether the vehicle travels A->B:
//!
//! | turn  | travel A->B | offset   |
//! |-------|-------------|----------|
//! | left  | yes         | negative |
//! | left  | no          | positive |
//! | right | yes         | positive |
//! | right | no          | negative |

use serde::{Deserialize, Serialize};

use crate::error::{Result, TurnError};
use crate::geometry::offset_polyline;
use crate::models::Track;
use crate::options::TurnOptions;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NextTrack {
    /// Preview geometry of the pass after the turn.
    pub track: Track,
    /// Pass index the vehicle will occupy after the turn.
    pub paths_away: i32,
    /// Signed offset of `track` from the reference track.
    pub offset_distance: f64,
    /// Perpendicular distance between the current and next pass, always
    /// positive. The synthesizer takes this value as-is.
    pub turn_offset: f64,
}

#[inline]
pub fn positive_offset(is_turn_left: bool, is_heading_same_way: bool) -> bool {
    is_turn_left ^ is_heading_same_way
}

#[inline]
pub fn paths_to_move(row_skip: u32) -> i32 {
    i32::try_from(row_skip).unwrap_or(i32::MAX - 1).saturating_add(1)
}

pub fn next_paths_away(paths_away: i32, is_turn_left: bool, is_heading_same_way: bool, row_skip: u32) -> i32 {
    let step = paths_to_move(row_skip);
    if positive_offset(is_turn_left, is_heading_same_way) {
        paths_away.saturating_add(step)
    } else {
        paths_away.saturating_sub(step)
    }
}

/// The pass `paths_away` spacings from the reference track. Guidance uses the
/// same function to derive the followed line, so the preview and the line
/// followed after the turn cannot drift apart.
pub fn track_at_paths_away(reference: &Track, paths_away: i32, spacing: f64) -> Result<Track> {
    if !reference.is_usable() {
        return Err(TurnError::MissingTrack);
    }
    let offset = spacing * f64::from(paths_away);
    let points = offset_polyline(&reference.points, offset);
    if points.len() < 2 {
        return Err(TurnError::DegenerateGeometry("offset track collapsed"));
    }
    Ok(Track { name: reference.name.clone(), points, closed: reference.closed, active: reference.active })
}

pub fn next_track(
    reference: &Track,
    paths_away: i32,
    is_turn_left: bool,
    is_heading_same_way: bool,
    options: &TurnOptions,
) -> Result<NextTrack> {
    let spacing = options.pass_spacing();
    let step = paths_to_move(options.row_skip);
    let next = next_paths_away(paths_away, is_turn_left, is_heading_same_way, options.row_skip);
    let track = track_at_paths_away(reference, next, spacing)?;
    Ok(NextTrack {
        track,
        paths_away: next,
        offset_distance: spacing * f64::from(next),
        turn_offset: (f64::from(step) * spacing).abs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{heading_between, right_normal, Vec2, Vec3};
    use approx::assert_relative_eq;

    fn ab() -> Track {
        Track::ab_line("ab", Vec2::new(10.0, 0.0), Vec2::new(10.0, 100.0))
    }

    #[test]
    fn left_turn_same_way_is_negative() {
        assert!(!positive_offset(true, true));
        assert_eq!(next_paths_away(0, true, true, 0), -1);
    }

    #[test]
    fn left_turn_opposite_way_is_positive() {
        assert!(positive_offset(true, false));
        assert_eq!(next_paths_away(0, true, false, 0), 1);
    }

    #[test]
    fn right_turn_same_way_is_positive() {
        assert!(positive_offset(false, true));
        assert_eq!(next_paths_away(0, false, true, 0), 1);
    }

    #[test]
    fn right_turn_opposite_way_is_negative() {
        assert!(!positive_offset(false, false));
        assert_eq!(next_paths_away(0, false, false, 0), -1);
    }

    #[test]
    fn row_skip_moves_further() {
        assert_eq!(paths_to_move(0), 1);
        assert_eq!(paths_to_move(2), 3);
        assert_eq!(next_paths_away(4, false, true, 2), 7);
        assert_eq!(next_paths_away(4, false, false, 2), 1);
    }

    #[test]
    fn ab_next_track_is_translated() {
        let opts = TurnOptions { tool_width: 6.0, overlap: 1.0, ..TurnOptions::default() };
        let n = next_track(&ab(), 2, false, true, &opts).unwrap();
        assert_eq!(n.paths_away, 3);
        assert_relative_eq!(n.offset_distance, 15.0);
        assert_relative_eq!(n.turn_offset, 5.0);
        // north-bound reference: right is +easting
        assert_relative_eq!(n.track.points[0].easting, 25.0, epsilon = 1e-9);
        assert_relative_eq!(n.track.points[1].easting, 25.0, epsilon = 1e-9);
        assert_relative_eq!(n.track.points[1].northing, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn turn_offset_is_positive_for_negative_moves() {
        let opts = TurnOptions { row_skip: 1, ..TurnOptions::default() };
        let n = next_track(&ab(), 0, true, true, &opts).unwrap();
        assert_eq!(n.paths_away, -2);
        assert_relative_eq!(n.turn_offset, 12.0);
        assert_relative_eq!(n.offset_distance, -12.0);
    }

    #[test]
    fn curve_next_track_uses_polyline_offset() {
        let pts: Vec<Vec3> = (0..10).map(|k| Vec2::new(0.0, k as f64 * 10.0).with_heading(0.0)).collect();
        let curve = Track::curve("c", pts);
        let n = next_track(&curve, 0, false, true, &TurnOptions::default()).unwrap();
        assert_eq!(n.track.points.len(), 10);
        assert!(n.track.points.iter().all(|p| (p.easting - 6.0).abs() < 1e-9));
    }

    #[test]
    fn preview_matches_rederived_track() {
        let opts = TurnOptions::default();
        let n = next_track(&ab(), 0, false, true, &opts).unwrap();
        let again = track_at_paths_away(&ab(), n.paths_away, opts.pass_spacing()).unwrap();
        assert_eq!(n.track, again);
        let h = heading_between(again.points[0].xy(), again.points[1].xy());
        let shift = again.points[0].xy() - ab().points[0].xy();
        assert_relative_eq!(shift.dot(right_normal(h)), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn unusable_reference_is_rejected() {
        let bad = Track::ab_line("bad", Vec2::new(0.0, 0.0), Vec2::new(0.0, 0.0));
        assert_eq!(next_track(&bad, 0, false, true, &TurnOptions::default()).unwrap_err(), TurnError::MissingTrack);
    }
}
