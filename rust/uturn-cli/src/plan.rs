use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

use uturn_core::geometry::path_length;
use uturn_core::machine::{track_alignment, Alignment};
use uturn_core::{next_track, synthesize, track_at_paths_away, Strategy, Track, TurnRequest, Vec3};

use crate::scenario::Scenario;

#[derive(Clone, Debug, Serialize)]
pub struct PlanReport {
    pub strategy: Strategy,
    pub radius: f64,
    /// Why the constrained shape was rejected when the fallback was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_failure: Option<String>,
    pub turn_left: bool,
    pub heading_same_way: bool,
    pub next_paths_away: i32,
    pub next_track: Track,
    pub heading_change_deg: f64,
    pub length_m: f64,
    pub path: Vec<Vec3>,
}

/// Plans the turn the vehicle would make at the end of its current pass.
pub fn plan(scenario: &Scenario) -> Result<PlanReport> {
    let options = scenario.options();
    let field = scenario.field()?;
    let active = track_at_paths_away(&scenario.track, scenario.paths_away, options.pass_spacing())
        .with_context(|| format!("cannot offset track to pass {}", scenario.paths_away))?;
    let heading_same_way = match track_alignment(&active, scenario.pose, options.alignment_tolerance()) {
        Alignment::SameWay => true,
        Alignment::OppositeWay => false,
        Alignment::Misaligned => bail!("pose heading is not aligned with the track"),
    };
    let turn_left = scenario.turn_left.unwrap_or(options.first_turn_left);
    let next = next_track(&scenario.track, scenario.paths_away, turn_left, heading_same_way, &options)?;

    let req = TurnRequest {
        pose: scenario.pose,
        track: &active,
        field: &field,
        next: &next,
        is_turn_left: turn_left,
        is_heading_same_way: heading_same_way,
        options: &options,
    };
    let turn = synthesize(&req).context("turn synthesis failed")?;
    let length_m = path_length(&turn.path);
    info!(strategy = ?turn.strategy, points = turn.path.len(), radius = turn.radius, length_m, "planned turn");

    Ok(PlanReport {
        strategy: turn.strategy,
        radius: turn.radius,
        primary_failure: turn.primary_failure.as_ref().map(ToString::to_string),
        turn_left,
        heading_same_way,
        next_paths_away: next.paths_away,
        next_track: next.track,
        heading_change_deg: turn.heading_change.to_degrees(),
        length_m,
        path: turn.path.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::tests::square;

    #[test]
    fn plans_constrained_right_turn() {
        let report = plan(&square()).unwrap();
        assert_eq!(report.strategy, Strategy::Constrained);
        assert!(report.primary_failure.is_none());
        assert!(!report.turn_left);
        assert_eq!(report.next_paths_away, 1);
        assert!((report.heading_change_deg.abs() - 180.0).abs() < 5.0);
        assert!(report.length_m > 20.0);
        let last = report.path.last().unwrap();
        assert!((last.easting - 16.0).abs() < 0.1);
    }

    #[test]
    fn misaligned_pose_is_rejected() {
        let mut s = square();
        s.pose.heading = std::f64::consts::FRAC_PI_2;
        assert!(plan(&s).is_err());
    }
}
