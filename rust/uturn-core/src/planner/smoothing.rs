use crate::models::Vec3;

/// Three-point moving average over interior points. The first and last
/// points are kept exactly; headings are left for the caller to reassign.
pub fn smooth(points: &[Vec3], passes: u32) -> Vec<Vec3> {
    let mut cur = points.to_vec();
    if cur.len() < 3 {
        return cur;
    }
    let mut next = cur.clone();
    for _ in 0..passes {
        for i in 1..cur.len() - 1 {
            let (a, b, c) = (cur[i - 1], cur[i], cur[i + 1]);
            next[i].easting = (a.easting + b.easting + c.easting) / 3.0;
            next[i].northing = (a.northing + b.northing + c.northing) / 3.0;
        }
        std::mem::swap(&mut cur, &mut next);
    }
    cur
}
