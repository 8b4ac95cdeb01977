use serde::{Deserialize, Serialize};

use crate::geometry::point_in_polygon;
use crate::models::{Vec2, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zone {
    Outside,
    InHeadland,
    InCultivated,
}

/// Where the vehicle is relative to the field. The headland line sits inside
/// the outer boundary, so it is tested first. Missing or degenerate rings
/// (< 3 points) are skipped.
pub fn classify_zone(position: Vec2, headland: Option<&[Vec3]>, boundary: Option<&[Vec2]>) -> Zone {
    if let Some(h) = headland.filter(|h| h.len() >= 3) {
        if point_in_polygon(h, position) {
            return Zone::InCultivated;
        }
    }
    if let Some(b) = boundary.filter(|b| b.len() >= 3) {
        if point_in_polygon(b, position) {
            return Zone::InHeadland;
        }
    }
    Zone::Outside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::assign_headings;

    fn ring(lo: f64, hi: f64) -> Vec<Vec2> {
        vec![Vec2::new(lo, lo), Vec2::new(hi, lo), Vec2::new(hi, hi), Vec2::new(lo, hi)]
    }

    #[test]
    fn nested_classification() {
        let boundary = ring(0.0, 100.0);
        let headland = assign_headings(&ring(10.0, 90.0), true);
        let z = |e, n| classify_zone(Vec2::new(e, n), Some(&headland[..]), Some(&boundary[..]));
        assert_eq!(z(50.0, 50.0), Zone::InCultivated);
        assert_eq!(z(5.0, 50.0), Zone::InHeadland);
        assert_eq!(z(95.0, 95.0), Zone::InHeadland);
        assert_eq!(z(-5.0, 50.0), Zone::Outside);
    }

    #[test]
    fn missing_rings_degrade() {
        let boundary = ring(0.0, 100.0);
        assert_eq!(classify_zone(Vec2::new(50.0, 50.0), None, Some(&boundary[..])), Zone::InHeadland);
        assert_eq!(classify_zone(Vec2::new(50.0, 50.0), None, None), Zone::Outside);
        let short = assign_headings(&ring(10.0, 90.0)[..2], false);
        assert_eq!(classify_zone(Vec2::new(50.0, 50.0), Some(&short[..]), Some(&boundary[..])), Zone::InHeadland);
    }
}
