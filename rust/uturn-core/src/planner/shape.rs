use std::f64::consts::PI;

use crate::models::{direction, right_normal, Vec2, Vec3};

/// One drawing step of a turn. Arc sweep is signed: positive turns
/// clockwise (to the right), negative counter-clockwise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Primitive {
    Straight(f64),
    Arc { radius: f64, sweep: f64 },
}

/// Arc primitives joining two parallel passes `offset` apart with arcs of
/// `radius`, starting on the current pass heading and ending on the next
/// pass heading the other way.
///
/// Wide passes get two quarter arcs and a straight in between. When the
/// passes are closer than the arc diameter the turn bulbs out: a short swing
/// away from the next pass, a large arc around, and a swing back.
pub fn u_turn_primitives(offset: f64, radius: f64, turn_left: bool) -> Vec<Primitive> {
    let s = if turn_left { -1.0 } else { 1.0 };
    let diameter = 2.0 * radius;
    if offset >= diameter - 1e-9 {
        let mut prims = vec![Primitive::Arc { radius, sweep: s * PI / 2.0 }];
        let gap = offset - diameter;
        if gap > 1e-6 {
            prims.push(Primitive::Straight(gap));
        }
        prims.push(Primitive::Arc { radius, sweep: s * PI / 2.0 });
        prims
    } else {
        let half = offset / 2.0;
        let y = (diameter * diameter - (half + radius).powi(2)).max(0.0).sqrt();
        let beta = y.atan2(half + radius);
        vec![
            Primitive::Arc { radius, sweep: -s * beta },
            Primitive::Arc { radius, sweep: s * (PI + 2.0 * beta) },
            Primitive::Arc { radius, sweep: -s * beta },
        ]
    }
}

/// Turtle that lays down points at a fixed spacing.
pub struct PathBuilder {
    points: Vec<Vec3>,
    pos: Vec2,
    heading: f64,
    spacing: f64,
    min_semicircle_points: usize,
}

impl PathBuilder {
    pub fn new(start: Vec2, heading: f64, spacing: f64, min_semicircle_points: usize) -> Self {
        Self {
            points: vec![start.with_heading(heading)],
            pos: start,
            heading,
            spacing: spacing.max(0.01),
            min_semicircle_points: min_semicircle_points.max(2),
        }
    }

    pub(crate) fn len(&self) -> usize { self.points.len() }

    pub fn position(&self) -> Vec2 { self.pos }

    pub fn heading(&self) -> f64 { self.heading }

    pub fn straight(&mut self, length: f64) -> &mut Self {
        if length <= 1e-9 {
            return self;
        }
        let steps = (length / self.spacing).ceil().max(1.0) as usize;
        let start = self.pos;
        let dir = direction(self.heading);
        for k in 1..=steps {
            let p = start + dir * (length * k as f64 / steps as f64);
            self.points.push(p.with_heading(self.heading));
        }
        self.pos = start + dir * length;
        self
    }

    pub fn arc(&mut self, radius: f64, sweep: f64) -> &mut Self {
        if radius <= 1e-9 || sweep.abs() <= 1e-12 {
            return self;
        }
        let side = sweep.signum();
        let center = self.pos + right_normal(self.heading) * (radius * side);
        let by_spacing = (sweep.abs() * radius / self.spacing).ceil() as usize;
        let by_count = (self.min_semicircle_points as f64 * sweep.abs() / PI).ceil() as usize;
        let steps = by_spacing.max(by_count).max(1);
        let v0 = self.pos - center;
        let h0 = self.heading;
        for k in 1..=steps {
            let phi = sweep * k as f64 / steps as f64;
            let p = center + rotate_cw(v0, phi);
            self.points.push(p.with_heading(h0 + phi));
        }
        self.pos = center + rotate_cw(v0, sweep);
        self.heading = h0 + sweep;
        self
    }

    pub fn apply(&mut self, prims: &[Primitive]) -> &mut Self {
        for p in prims {
            match *p {
                Primitive::Straight(len) => self.straight(len),
                Primitive::Arc { radius, sweep } => self.arc(radius, sweep),
            };
        }
        self
    }

    pub fn finish(self) -> Vec<Vec3> { self.points }
}

/// Rotates a vector clockwise by `phi` in (easting, northing) axes.
#[inline]
pub fn rotate_cw(v: Vec2, phi: f64) -> Vec2 {
    let (s, c) = phi.sin_cos();
    Vec2::new(v.easting * c + v.northing * s, -v.easting * s + v.northing * c)
}
