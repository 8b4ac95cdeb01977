//! Pure planar geometry helpers used by the zone classifier, the offset
//! service and the turn synthesizer. No state, no allocation unless a
//! function returns a new point list.

use itertools::Itertools;

use crate::models::{angle_diff, heading_between, AsVec2, Vec2};

pub mod offset;

pub use offset::{assign_headings, inward_offset_polygon, offset_polyline, outward_offset_polygon};

/// Determinant threshold below which two lines are treated as parallel.
pub const PARALLEL_EPS: f64 = 1e-10;
/// Squared segment length below which a segment is a single point (1e-4 m).
pub const DEGENERATE_SEG_SQ: f64 = 1e-4 * 1e-4;

/// Even-odd point-in-polygon test (northing crossing formulation).
///
/// The ring closes implicitly (last -> first). Edges use a half-open
/// northing interval, so points exactly on a west or south edge count as
/// inside and points exactly on an east or north edge count as outside.
/// Zero-length and horizontal edges never toggle.
pub fn point_in_polygon<P: AsVec2>(polygon: &[P], point: Vec2) -> bool {
    let n = polygon.len();
    if n < 3 { return false; }
    let (px, py) = (point.easting, point.northing);
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = polygon[i].vec2();
        let b = polygon[j].vec2();
        if (a.northing > py) != (b.northing > py) {
            let x_at = (b.easting - a.easting) * (py - a.northing) / (b.northing - a.northing) + a.easting;
            if px < x_at { inside = !inside; }
        }
        j = i;
    }
    inside
}

/// Closest point on segment a-b to `p`, with the clamped projection parameter.
pub fn closest_on_segment(p: Vec2, a: Vec2, b: Vec2) -> (Vec2, f64) {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq < DEGENERATE_SEG_SQ {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t, t)
}

pub fn point_to_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    closest_on_segment(p, a, b).0.distance(p)
}

/// Intersection of segments p1-p2 and p3-p4, or `None` when they are
/// parallel/degenerate or the crossing lies outside either segment.
pub fn line_intersection(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> Option<Vec2> {
    let d1 = p2 - p1;
    let d2 = p4 - p3;
    let det = d1.cross(d2);
    if det.abs() < PARALLEL_EPS {
        return None;
    }
    let w = p3 - p1;
    let t = w.cross(d2) / det;
    let u = w.cross(d1) / det;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }
    Some(p1 + d1 * t)
}

pub fn segment_intersect(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> bool {
    line_intersection(p1, p2, p3, p4).is_some()
}

/// Distance along the unit ray to segment a-b, if the ray hits it ahead of
/// the origin.
pub fn ray_segment_distance(origin: Vec2, dir: Vec2, a: Vec2, b: Vec2) -> Option<f64> {
    let e = b - a;
    let det = dir.cross(e);
    if det.abs() < PARALLEL_EPS {
        return None;
    }
    let w = a - origin;
    let t = w.cross(e) / det;
    let u = w.cross(dir) / det;
    if t > 0.0 && (0.0..=1.0).contains(&u) { Some(t) } else { None }
}

/// Casts a ray from `origin` along `direction` against every edge of the
/// closed polygon and returns the nearest hit distance, or +inf.
pub fn ray_polygon_distance<P: AsVec2>(origin: Vec2, direction: Vec2, polygon: &[P]) -> f64 {
    let len = direction.length();
    if polygon.len() < 2 || len < 1e-12 {
        return f64::INFINITY;
    }
    let dir = direction * (1.0 / len);
    let n = polygon.len();
    (0..n)
        .filter_map(|i| ray_segment_distance(origin, dir, polygon[i].vec2(), polygon[(i + 1) % n].vec2()))
        .fold(f64::INFINITY, f64::min)
}

/// Nearest point on an open polyline: (segment index, point, distance).
pub fn nearest_on_polyline<P: AsVec2>(points: &[P], p: Vec2) -> Option<(usize, Vec2, f64)> {
    match points.len() {
        0 => None,
        1 => {
            let q = points[0].vec2();
            Some((0, q, q.distance(p)))
        }
        _ => points
            .iter()
            .map(AsVec2::vec2)
            .tuple_windows()
            .enumerate()
            .map(|(i, (a, b))| {
                let (q, _) = closest_on_segment(p, a, b);
                (i, q, q.distance(p))
            })
            .min_by(|x, y| x.2.total_cmp(&y.2)),
    }
}

/// Shoelace area; positive for counter-clockwise rings in (easting, northing).
pub fn signed_area<P: AsVec2>(ring: &[P]) -> f64 {
    let n = ring.len();
    if n < 3 { return 0.0; }
    let mut a = 0.0;
    for i in 0..n {
        let p = ring[i].vec2();
        let q = ring[(i + 1) % n].vec2();
        a += p.cross(q);
    }
    0.5 * a
}

pub fn path_length<P: AsVec2>(points: &[P]) -> f64 {
    points.iter().map(AsVec2::vec2).tuple_windows().map(|(a, b)| a.distance(b)).sum()
}

/// Net signed heading change along a polyline, radians (positive = clockwise).
/// Zero-length steps are skipped.
pub fn total_heading_change<P: AsVec2>(points: &[P]) -> f64 {
    let headings: Vec<f64> = points
        .iter()
        .map(AsVec2::vec2)
        .tuple_windows()
        .filter(|(a, b)| a.distance_sq(*b) > DEGENERATE_SEG_SQ)
        .map(|(a, b)| heading_between(a, b))
        .collect();
    headings.iter().tuple_windows().map(|(h0, h1)| angle_diff(*h0, *h1)).sum()
}

/// True if any two non-adjacent segments of the open polyline cross.
pub fn has_self_intersection<P: AsVec2>(points: &[P]) -> bool {
    let pts: Vec<Vec2> = points.iter().map(AsVec2::vec2).collect();
    let n = pts.len();
    if n < 4 { return false; }
    for i in 0..n - 1 {
        for j in (i + 2)..n - 1 {
            if line_intersection(pts[i], pts[i + 1], pts[j], pts[j + 1]).is_some() {
                return true;
            }
        }
    }
    false
}
