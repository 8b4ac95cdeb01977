//! Parallel offsets of open polylines and closed rings.
//!
//! Sign convention: a positive distance offsets to the right of the
//! direction of travel along the point order, a negative one to the left.
//! Vertices are joined with a miter, falling back to a bevel when the miter
//! would run away on sharp corners. Points that end up closer to the source
//! than the offset distance (folded inside a tight bend) are dropped, then any
//! remaining loops are cut at their crossing point.

use crate::models::{heading_between, right_normal, AsVec2, Vec2, Vec3};

use super::{line_intersection, point_to_segment_distance, signed_area, PARALLEL_EPS};

/// Miter length limit as a multiple of |distance|.
const MITER_LIMIT: f64 = 4.0;
/// Consecutive input points closer than this are merged.
const MERGE_EPS: f64 = 1e-6;

/// Offsets an open polyline. A two-point line is translated exactly; longer
/// polylines are mitered and cleaned of folds and loops. Headings of the
/// result point to the next vertex.
pub fn offset_polyline<P: AsVec2>(points: &[P], distance: f64) -> Vec<Vec3> {
    let pts = dedup(points, false);
    if pts.len() < 2 {
        return Vec::new();
    }
    if distance.abs() < MERGE_EPS {
        return assign_headings(&pts, false);
    }
    if pts.len() == 2 {
        let h = heading_between(pts[0], pts[1]);
        let n = right_normal(h) * distance;
        return vec![(pts[0] + n).with_heading(h), (pts[1] + n).with_heading(h)];
    }

    let raw = miter_offset(&pts, distance, false);
    let filtered = drop_folded(&raw, &pts, distance.abs(), false);
    let cleaned = prune_open_loops(filtered);
    if cleaned.len() < 2 {
        return Vec::new();
    }
    assign_headings(&cleaned, false)
}

/// Shrinks a closed ring by `distance` (>= 0). `None` when the ring is
/// invalid or the offset collapses it.
pub fn inward_offset_polygon<P: AsVec2>(polygon: &[P], distance: f64) -> Option<Vec<Vec3>> {
    offset_ring(polygon, distance.abs(), true)
}

/// Grows a closed ring by `distance` (>= 0).
pub fn outward_offset_polygon<P: AsVec2>(polygon: &[P], distance: f64) -> Option<Vec<Vec3>> {
    offset_ring(polygon, distance.abs(), false)
}

/// Heading of each vertex = direction to the next vertex. Closed rings wrap;
/// the last vertex of an open line keeps the previous segment's heading.
pub fn assign_headings<P: AsVec2>(points: &[P], closed: bool) -> Vec<Vec3> {
    let n = points.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let p = points[i].vec2();
        let h = if i + 1 < n {
            heading_between(p, points[i + 1].vec2())
        } else if closed && n > 1 {
            heading_between(p, points[0].vec2())
        } else if n > 1 {
            heading_between(points[i - 1].vec2(), p)
        } else {
            0.0
        };
        out.push(p.with_heading(h));
    }
    out
}

fn offset_ring<P: AsVec2>(polygon: &[P], distance: f64, inward: bool) -> Option<Vec<Vec3>> {
    let pts = dedup(polygon, true);
    if pts.len() < 3 {
        return None;
    }
    let area = signed_area(&pts);
    if area.abs() < 1e-9 {
        return None;
    }
    if distance < MERGE_EPS {
        return Some(assign_headings(&pts, true));
    }
    // Counter-clockwise rings have the interior on the left of travel.
    let ccw = area > 0.0;
    let toward_inside = if ccw { -1.0 } else { 1.0 };
    let signed = if inward { toward_inside * distance } else { -toward_inside * distance };

    let raw = miter_offset(&pts, signed, true);
    let filtered = drop_folded(&raw, &pts, distance, true);
    let ring = prune_ring_loops(filtered, area.signum());
    if ring.len() < 3 {
        return None;
    }
    let new_area = signed_area(&ring);
    if new_area.signum() != area.signum() {
        return None;
    }
    if inward && new_area.abs() >= area.abs() {
        return None;
    }
    if !inward && new_area.abs() <= area.abs() {
        return None;
    }
    Some(assign_headings(&ring, true))
}

fn dedup<P: AsVec2>(points: &[P], closed: bool) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(points.len());
    for p in points.iter().map(AsVec2::vec2) {
        if out.last().map_or(true, |q: &Vec2| q.distance(p) > MERGE_EPS) {
            out.push(p);
        }
    }
    if closed && out.len() > 1 {
        if let (Some(first), Some(last)) = (out.first().copied(), out.last().copied()) {
            if first.distance(last) <= MERGE_EPS {
                out.pop();
            }
        }
    }
    out
}

fn miter_offset(pts: &[Vec2], d: f64, closed: bool) -> Vec<Vec2> {
    let n = pts.len();
    let seg_normal = |i: usize| right_normal(heading_between(pts[i], pts[(i + 1) % n]));
    let mut out = Vec::with_capacity(n + 8);

    for i in 0..n {
        let has_prev = closed || i > 0;
        let has_next = closed || i + 1 < n;
        if !has_prev {
            out.push(pts[i] + seg_normal(i) * d);
            continue;
        }
        let prev = (i + n - 1) % n;
        let n1 = seg_normal(prev);
        if !has_next {
            out.push(pts[i] + n1 * d);
            continue;
        }
        let n2 = seg_normal(i);
        let a1 = pts[prev] + n1 * d;
        let b1 = pts[i] + n1 * d;
        let a2 = pts[i] + n2 * d;
        let b2 = pts[(i + 1) % n] + n2 * d;
        let d1 = b1 - a1;
        let d2 = b2 - a2;
        let det = d1.cross(d2);
        if det.abs() < PARALLEL_EPS * d1.length().max(1.0) * d2.length().max(1.0) {
            if d1.dot(d2) > 0.0 {
                out.push(b1);
            } else {
                out.push(b1);
                out.push(a2);
            }
            continue;
        }
        let t = (a2 - a1).cross(d2) / det;
        let miter = a1 + d1 * t;
        if miter.distance(pts[i]) > MITER_LIMIT * d.abs() {
            out.push(b1);
            out.push(a2);
        } else {
            out.push(miter);
        }
    }
    out
}

fn drop_folded(raw: &[Vec2], source: &[Vec2], distance: f64, closed: bool) -> Vec<Vec2> {
    let tol = 1e-6 + distance * 1e-4;
    let n = source.len();
    let segs = if closed { n } else { n.saturating_sub(1) };
    raw.iter()
        .copied()
        .filter(|p| {
            (0..segs).all(|i| point_to_segment_distance(*p, source[i], source[(i + 1) % n]) >= distance - tol)
        })
        .collect()
}

fn prune_open_loops(mut pts: Vec<Vec2>) -> Vec<Vec2> {
    'outer: loop {
        let n = pts.len();
        if n < 4 {
            return pts;
        }
        for i in 0..n - 1 {
            for j in (i + 2)..n - 1 {
                if let Some(x) = line_intersection(pts[i], pts[i + 1], pts[j], pts[j + 1]) {
                    let mut next = Vec::with_capacity(n);
                    next.extend_from_slice(&pts[..=i]);
                    next.push(x);
                    next.extend_from_slice(&pts[j + 1..]);
                    pts = next;
                    continue 'outer;
                }
            }
        }
        return pts;
    }
}

/// Splits a ring at each crossing and keeps the loop with the source
/// orientation and the largest area.
fn prune_ring_loops(mut pts: Vec<Vec2>, orientation: f64) -> Vec<Vec2> {
    'outer: loop {
        let n = pts.len();
        if n < 4 {
            return pts;
        }
        for i in 0..n {
            for j in (i + 2)..n {
                if i == 0 && j == n - 1 {
                    continue;
                }
                let Some(x) = line_intersection(pts[i], pts[i + 1], pts[j], pts[(j + 1) % n]) else {
                    continue;
                };
                let mut a = Vec::with_capacity(n);
                a.extend_from_slice(&pts[..=i]);
                a.push(x);
                a.extend_from_slice(&pts[j + 1..]);
                let mut b = Vec::with_capacity(j - i + 1);
                b.push(x);
                b.extend_from_slice(&pts[i + 1..=j]);
                let score = |r: &[Vec2]| {
                    let s = signed_area(r);
                    if s.signum() == orientation { s.abs() } else { -1.0 }
                };
                pts = if score(&a) >= score(&b) { a } else { b };
                continue 'outer;
            }
        }
        return pts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::has_self_intersection;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn square(size: f64) -> Vec<Vec2> {
        vec![Vec2::new(0.0, 0.0), Vec2::new(size, 0.0), Vec2::new(size, size), Vec2::new(0.0, size)]
    }

    #[test]
    fn straight_line_offset_is_exact_translation() {
        let line = [Vec2::new(3.0, 1.0), Vec2::new(7.0, 4.0)];
        let h = heading_between(line[0], line[1]);
        let off = offset_polyline(&line, 2.5);
        assert_eq!(off.len(), 2);
        let n = right_normal(h) * 2.5;
        assert_eq!(off[0].xy(), line[0] + n);
        assert_eq!(off[1].xy(), line[1] + n);
        assert_relative_eq!(off[0].heading, h);
    }

    #[test]
    fn positive_offset_goes_right_of_travel() {
        let north = [Vec2::new(0.0, 0.0), Vec2::new(0.0, 10.0), Vec2::new(0.0, 20.0)];
        let off = offset_polyline(&north, 3.0);
        assert!(off.iter().all(|p| (p.easting - 3.0).abs() < 1e-9));
        let left = offset_polyline(&north, -3.0);
        assert!(left.iter().all(|p| (p.easting + 3.0).abs() < 1e-9));
    }

    #[test]
    fn tight_curve_offset_has_no_crossings() {
        // semicircle radius 10 travelling clockwise; the inside is on the right
        let arc: Vec<Vec2> = (0..=60)
            .map(|k| {
                let a = PI * k as f64 / 60.0;
                Vec2::new(10.0 - 10.0 * a.cos(), 10.0 * a.sin())
            })
            .collect();
        for d in [2.0, 5.0, 9.5, -4.0, -12.0] {
            let off = offset_polyline(&arc, d);
            assert!(off.len() >= 2, "offset {d} collapsed");
            assert!(!has_self_intersection(&off), "offset {d} self-intersects");
        }
    }

    #[test]
    fn hairpin_offset_is_pruned() {
        // 2 m wide hairpin offset 3 m inward would fold into a bowtie
        let hairpin = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 20.0),
            Vec2::new(1.0, 21.0),
            Vec2::new(2.0, 20.0),
            Vec2::new(2.0, 0.0),
        ];
        let off = offset_polyline(&hairpin, 3.0);
        assert!(!has_self_intersection(&off));
    }

    #[test]
    fn inward_square_offset() {
        let ring = inward_offset_polygon(&square(100.0), 10.0).unwrap();
        assert_eq!(ring.len(), 4);
        for p in &ring {
            assert_relative_eq!(p.easting.min(100.0 - p.easting), 10.0, epsilon = 1e-9);
            assert_relative_eq!(p.northing.min(100.0 - p.northing), 10.0, epsilon = 1e-9);
        }
        // clockwise input gives the same ring
        let cw: Vec<Vec2> = square(100.0).into_iter().rev().collect();
        let ring_cw = inward_offset_polygon(&cw, 10.0).unwrap();
        assert_relative_eq!(signed_area(&ring_cw).abs(), 80.0 * 80.0, epsilon = 1e-6);
    }

    #[test]
    fn outward_square_offset() {
        let ring = outward_offset_polygon(&square(10.0), 2.0).unwrap();
        assert_relative_eq!(signed_area(&ring), 14.0 * 14.0, epsilon = 1e-9);
    }

    #[test]
    fn collapsing_offset_returns_none() {
        assert!(inward_offset_polygon(&square(20.0), 15.0).is_none());
        assert!(inward_offset_polygon(&square(20.0)[..2], 1.0).is_none());
    }

    #[test]
    fn headings_wrap_on_rings() {
        let ring = assign_headings(&square(10.0), true);
        assert_relative_eq!(ring[0].heading, PI / 2.0);
        assert_relative_eq!(ring[3].heading, PI);
        let open = assign_headings(&square(10.0), false);
        assert_relative_eq!(open[3].heading, 1.5 * PI);
    }
}
