//! Turn-following steering. The state machine only relies on the
//! [`TurnFollower`] contract; [`PurePursuit`] is the stock implementation.

use serde::{Deserialize, Serialize};

use crate::geometry::closest_on_segment;
use crate::models::{angle_diff, heading_between, Vec3};
use crate::options::VehicleOptions;

/// How many segments past the current one the progress search looks at.
const SEARCH_WINDOW: usize = 40;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SteerCommand {
    /// Front wheel angle in radians, positive steers right.
    pub angle: f64,
    /// The follower ran off the end of the path.
    pub complete: bool,
}

pub trait TurnFollower {
    /// Forget progress; called whenever a new path is handed over.
    fn reset(&mut self);

    fn steer(&mut self, path: &[Vec3], pose: Vec3, speed: f64, vehicle: &VehicleOptions) -> SteerCommand;
}

/// Pure pursuit on the turn polyline. Progress along the path only moves
/// forward, so the exit leg running back alongside the entry leg cannot pull
/// the goal point backwards.
#[derive(Clone, Debug, Default)]
pub struct PurePursuit {
    index: usize,
}

impl PurePursuit {
    pub fn new() -> Self { Self::default() }
}

impl TurnFollower for PurePursuit {
    fn reset(&mut self) { self.index = 0; }

    fn steer(&mut self, path: &[Vec3], pose: Vec3, speed: f64, vehicle: &VehicleOptions) -> SteerCommand {
        if path.len() < 2 {
            return SteerCommand { angle: 0.0, complete: true };
        }
        let pos = pose.xy();
        let last_seg = path.len() - 2;
        let from = self.index.min(last_seg);
        let to = (from + SEARCH_WINDOW).min(last_seg);

        let mut best = (from, f64::INFINITY, 0.0);
        for i in from..=to {
            let (q, t) = closest_on_segment(pos, path[i].xy(), path[i + 1].xy());
            let d = q.distance(pos);
            if d < best.1 {
                best = (i, d, t);
            }
        }
        self.index = best.0;

        let lookahead = vehicle.lookahead + vehicle.lookahead_speed_gain * speed.abs();
        let end = path[path.len() - 1].xy();
        let goal = path[self.index + 1..]
            .iter()
            .map(|p| p.xy())
            .find(|p| p.distance(pos) >= lookahead)
            .unwrap_or(end);

        let alpha = angle_diff(pose.heading, heading_between(pos, goal));
        let ld = goal.distance(pos).max(1e-3);
        let max = vehicle.max_steer_angle_deg.to_radians();
        let angle = (2.0 * vehicle.wheelbase * alpha.sin() / ld).atan().clamp(-max, max);
        let complete = self.index == last_seg && best.2 >= 1.0 - 1e-9;
        SteerCommand { angle, complete }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Vec2;

    fn north_path() -> Vec<Vec3> {
        (0..=20).map(|k| Vec2::new(0.0, k as f64).with_heading(0.0)).collect()
    }

    #[test]
    fn steers_back_toward_the_path() {
        let mut pp = PurePursuit::new();
        let v = VehicleOptions::default();
        let left_of = pp.steer(&north_path(), Vec3::new(-1.0, 2.0, 0.0), 2.0, &v);
        assert!(left_of.angle > 0.0);
        pp.reset();
        let right_of = pp.steer(&north_path(), Vec3::new(1.0, 2.0, 0.0), 2.0, &v);
        assert!(right_of.angle < 0.0);
        assert!(!right_of.complete);
    }

    #[test]
    fn angle_is_clamped() {
        let mut pp = PurePursuit::new();
        let v = VehicleOptions { max_steer_angle_deg: 10.0, ..VehicleOptions::default() };
        let cmd = pp.steer(&north_path(), Vec3::new(0.0, 2.0, std::f64::consts::FRAC_PI_2), 0.0, &v);
        assert!((cmd.angle + 10f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn completes_past_the_end() {
        let mut pp = PurePursuit::new();
        let v = VehicleOptions::default();
        let path = north_path();
        for n in [5.0, 10.0, 15.0, 19.0] {
            assert!(!pp.steer(&path, Vec3::new(0.0, n, 0.0), 1.0, &v).complete);
        }
        assert!(pp.steer(&path, Vec3::new(0.0, 21.0, 0.0), 1.0, &v).complete);
        assert_eq!(pp.index, 19);
    }

    #[test]
    fn degenerate_path_is_complete() {
        let mut pp = PurePursuit::new();
        let cmd = pp.steer(&[Vec3::new(0.0, 0.0, 0.0)], Vec3::new(0.0, 0.0, 0.0), 0.0, &VehicleOptions::default());
        assert!(cmd.complete);
    }
}
