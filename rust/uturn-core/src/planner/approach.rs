//! The stretch of the current pass leading up to the headland crossing.
//!
//! Entry legs are laid along the pass itself rather than along the tangent at
//! the crossing, so on a bending pass the first path point sits on the line
//! the vehicle is actually driving.

use super::TurnFrame;
use crate::geometry::{assign_headings, nearest_on_polyline};
use crate::models::{direction, heading_between, normalize_heading, Track, Vec2, Vec3};
use std::f64::consts::PI;

/// Pass points in travel order. Closed tracks repeat their first point.
pub(crate) fn pass_points(track: &Track, same_way: bool) -> Vec<Vec2> {
    let mut pts: Vec<Vec2> = track.points.iter().map(|p| p.xy()).collect();
    if track.closed {
        if let Some(&first) = pts.first() {
            pts.push(first);
        }
    }
    if !same_way {
        pts.reverse();
    }
    pts
}

/// The pass walked backwards from the crossing. `chain[0]` is the crossing;
/// `dist[i]` is the distance behind it along the pass. Past the first pass
/// point the last segment is extended.
#[derive(Clone, Debug)]
pub(crate) struct Approach {
    chain: Vec<Vec2>,
    dist: Vec<f64>,
    crossing: Vec2,
    heading: f64,
}

impl Approach {
    pub fn new(track: &Track, same_way: bool, frame: &TurnFrame) -> Self {
        let pts = pass_points(track, same_way);
        let mut chain = vec![frame.crossing];
        if let Some((seg, _, _)) = nearest_on_polyline(&pts, frame.crossing) {
            for p in pts[..=seg.min(pts.len() - 1)].iter().rev() {
                if chain.last().map_or(true, |q| q.distance_sq(*p) > 1e-12) {
                    chain.push(*p);
                }
            }
        }
        if chain.len() < 2 {
            chain.push(frame.crossing - frame.direction());
        }
        let mut dist = Vec::with_capacity(chain.len());
        let mut acc = 0.0;
        dist.push(0.0);
        for w in chain.windows(2) {
            acc += w[0].distance(w[1]);
            dist.push(acc);
        }
        Self { chain, dist, crossing: frame.crossing, heading: frame.heading }
    }

    /// Point on the pass `d` metres behind the crossing, and the travel
    /// heading there.
    pub fn at(&self, d: f64) -> (Vec2, f64) {
        let last = self.chain.len() - 1;
        let i = self.dist.iter().rposition(|&x| x <= d).unwrap_or(0).min(last - 1);
        let (a, b) = (self.chain[i], self.chain[i + 1]);
        let len = self.dist[i + 1] - self.dist[i];
        let t = if len > 1e-12 { (d - self.dist[i]) / len } else { 0.0 };
        let p = a + (b - a) * t;
        (p, normalize_heading(heading_between(a, b) + PI))
    }

    /// Where the arc starts for a shift along the travel heading: past the
    /// crossing it continues straight into the headland, before it it sits on
    /// the pass with the pass heading.
    pub fn anchor(&self, shift: f64) -> (Vec2, f64) {
        if shift >= 0.0 {
            (self.crossing + direction(self.heading) * shift, self.heading)
        } else {
            self.at(-shift)
        }
    }

    /// Entry leg from `start_behind` metres behind the crossing up to the
    /// anchor for `shift`, spaced at most `spacing` apart.
    pub fn entry(&self, start_behind: f64, shift: f64, spacing: f64) -> Vec<Vec3> {
        let spacing = spacing.max(0.01);
        let end_behind = (-shift).max(0.0);
        let from = start_behind.max(end_behind);
        let span = from - end_behind;
        let steps = if span > 1e-9 { (span / spacing).ceil() as usize } else { 0 };
        let mut pts: Vec<Vec2> = (0..=steps)
            .map(|k| {
                let d = if steps == 0 { end_behind } else { from - span * k as f64 / steps as f64 };
                self.at(d).0
            })
            .collect();
        if shift > 1e-9 {
            let dir = direction(self.heading);
            let n = (shift / spacing).ceil() as usize;
            pts.extend((1..=n).map(|k| self.crossing + dir * (shift * k as f64 / n as f64)));
        }
        let mut out = assign_headings(&pts, false);
        if let Some(last) = out.last_mut() {
            last.heading = self.anchor(shift).1;
        }
        out
    }
}
