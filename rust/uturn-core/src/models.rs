use std::f64::consts::{PI, TAU};
use std::ops::{Add, Mul, Sub};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Planar coordinate in the field's local projected frame, meters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub easting: f64,
    pub northing: f64,
}

/// Planar pose. Heading is radians, 0 = north, increasing clockwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub easting: f64,
    pub northing: f64,
    #[serde(default)]
    pub heading: f64,
}

impl Vec2 {
    pub const fn new(easting: f64, northing: f64) -> Self { Self { easting, northing } }

    pub fn dot(self, o: Vec2) -> f64 { self.easting * o.easting + self.northing * o.northing }
    /// z component of the 2D cross product in (easting, northing) axes.
    pub fn cross(self, o: Vec2) -> f64 { self.easting * o.northing - self.northing * o.easting }
    pub fn length(self) -> f64 { self.dot(self).sqrt() }
    pub fn distance(self, o: Vec2) -> f64 { (self - o).length() }
    pub fn distance_sq(self, o: Vec2) -> f64 { let d = self - o; d.dot(d) }

    /// Point `distance` meters ahead along `heading`.
    pub fn project(self, heading: f64, distance: f64) -> Vec2 { self + direction(heading) * distance }

    pub fn with_heading(self, heading: f64) -> Vec3 { Vec3::new(self.easting, self.northing, heading) }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, o: Vec2) -> Vec2 { Vec2::new(self.easting + o.easting, self.northing + o.northing) }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, o: Vec2) -> Vec2 { Vec2::new(self.easting - o.easting, self.northing - o.northing) }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, k: f64) -> Vec2 { Vec2::new(self.easting * k, self.northing * k) }
}

impl Vec3 {
    pub const fn new(easting: f64, northing: f64, heading: f64) -> Self { Self { easting, northing, heading } }

    pub fn xy(self) -> Vec2 { Vec2::new(self.easting, self.northing) }
    pub fn distance(self, o: Vec3) -> f64 { self.xy().distance(o.xy()) }
}

impl From<Vec3> for Vec2 {
    fn from(p: Vec3) -> Self { p.xy() }
}

/// Anything usable as a plain planar point. Lets the geometry helpers take
/// either bare points or poses without copying into a new buffer.
pub trait AsVec2 {
    fn vec2(&self) -> Vec2;
}

impl AsVec2 for Vec2 {
    #[inline]
    fn vec2(&self) -> Vec2 { *self }
}

impl AsVec2 for Vec3 {
    #[inline]
    fn vec2(&self) -> Vec2 { self.xy() }
}

/// Unit vector for a heading (easting = sin, northing = cos).
#[inline]
pub fn direction(heading: f64) -> Vec2 { Vec2::new(heading.sin(), heading.cos()) }

/// Unit vector pointing to the right of travel along `heading`.
#[inline]
pub fn right_normal(heading: f64) -> Vec2 { Vec2::new(heading.cos(), -heading.sin()) }

/// Heading of the vector a -> b in [0, 2pi).
#[inline]
pub fn heading_between(a: Vec2, b: Vec2) -> f64 {
    normalize_heading((b.easting - a.easting).atan2(b.northing - a.northing))
}

/// Maps any angle into [0, 2pi).
#[inline]
pub fn normalize_heading(h: f64) -> f64 {
    let r = h.rem_euclid(TAU);
    if r >= TAU { 0.0 } else { r }
}

/// Signed smallest difference `to - from` in (-pi, pi].
#[inline]
pub fn angle_diff(from: f64, to: f64) -> f64 {
    let d = (to - from).rem_euclid(TAU);
    if d > PI { d - TAU } else { d }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    AbLine,
    Curve,
}

/// A guidance line: two points for an AB line, more for a curve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub name: String,
    pub points: Vec<Vec3>,
    #[serde(default)]
    pub closed: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool { true }

impl Track {
    pub fn ab_line(name: impl Into<String>, a: Vec2, b: Vec2) -> Self {
        let h = heading_between(a, b);
        Self { name: name.into(), points: vec![a.with_heading(h), b.with_heading(h)], closed: false, active: true }
    }

    pub fn curve(name: impl Into<String>, points: Vec<Vec3>) -> Self {
        Self { name: name.into(), points, closed: false, active: true }
    }

    pub fn kind(&self) -> TrackKind {
        if self.points.len() > 2 { TrackKind::Curve } else { TrackKind::AbLine }
    }

    /// AB lines need two distinct points; curves need at least three.
    pub fn is_usable(&self) -> bool {
        match self.points.len() {
            0 | 1 => false,
            2 => self.points[0].distance(self.points[1]) > 1e-6,
            _ => true,
        }
    }

    /// Canonical A->B heading (chord heading for curves).
    pub fn heading(&self) -> Option<f64> {
        if !self.is_usable() { return None; }
        let a = self.points.first()?.xy();
        let b = self.points.last()?.xy();
        if a.distance(b) <= 1e-6 {
            // closed-ish curve, fall back to the first segment
            let b = self.points.get(1)?.xy();
            return Some(heading_between(a, b));
        }
        Some(heading_between(a, b))
    }

    pub fn midpoint(&self) -> Option<Vec2> {
        match self.points.len() {
            0 => None,
            2 => Some((self.points[0].xy() + self.points[1].xy()) * 0.5),
            n => Some(self.points[n / 2].xy()),
        }
    }
}

/// Outer field boundary as a closed ring (the closing edge is implicit).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub points: Vec<Vec2>,
}

impl Boundary {
    pub fn new(points: Vec<Vec2>) -> Self { Self { points } }

    pub fn is_valid(&self) -> bool { self.points.len() >= 3 }
}

/// Immutable turn path snapshot. Cloning shares the buffer, so the renderer
/// can hold one while the guidance tick replaces it.
pub type TurnPath = Arc<[Vec3]>;
