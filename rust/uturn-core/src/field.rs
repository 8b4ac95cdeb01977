//! Boundary/headland offset service. Derives the headland line and the
//! turn-limit ring from the outer boundary. The result is a cached artifact
//! owned by the caller and rebuilt when the boundary or the headland
//! settings change.

use tracing::{debug, warn};

use crate::error::{Result, TurnError};
use crate::geometry::{assign_headings, inward_offset_polygon, outward_offset_polygon, point_in_polygon};
use crate::models::{Boundary, Vec2, Vec3};
use crate::options::TurnOptions;

#[derive(Clone, Debug)]
pub struct FieldGeometry {
    pub boundary: Boundary,
    /// Inward offset of the boundary by the headland width, with headings.
    pub headland: Option<Vec<Vec3>>,
    /// Ring the turn arc has to stay inside.
    pub turn_area: Option<Vec<Vec3>>,
    headland_width: f64,
    distance_from_boundary: f64,
}

impl FieldGeometry {
    pub fn build(boundary: Boundary, options: &TurnOptions) -> Result<Self> {
        if !boundary.is_valid() {
            return Err(TurnError::MissingBoundary);
        }
        let headland_width = options.headland_width.max(0.0);
        let dfb = options.distance_from_boundary;

        let headland = inward_offset_polygon(&boundary.points, headland_width);
        if headland.is_none() {
            warn!(headland_width, "headland offset collapsed; zone classification degrades to boundary only");
        }
        let turn_area = turn_limit_ring(&boundary.points, dfb);
        debug!(
            boundary_points = boundary.points.len(),
            headland_points = headland.as_ref().map_or(0, Vec::len),
            turn_area_points = turn_area.as_ref().map_or(0, Vec::len),
            "field geometry built"
        );
        Ok(Self { boundary, headland, turn_area, headland_width, distance_from_boundary: dfb })
    }

    /// Builds from an externally supplied headland line instead of deriving it.
    pub fn with_headland(boundary: Boundary, headland: Vec<Vec3>, options: &TurnOptions) -> Result<Self> {
        let mut g = Self::build(boundary, options)?;
        g.headland = (headland.len() >= 3).then_some(headland);
        Ok(g)
    }

    pub fn headland_width(&self) -> f64 { self.headland_width }

    pub fn distance_from_boundary(&self) -> f64 { self.distance_from_boundary }

    /// False once the headland-shaping settings moved away from the ones used to build.
    pub fn is_current(&self, options: &TurnOptions) -> bool {
        self.headland_width.to_bits() == options.headland_width.max(0.0).to_bits()
            && self.distance_from_boundary.to_bits() == options.distance_from_boundary.to_bits()
    }

    pub fn valid_headland(&self) -> Option<&[Vec3]> {
        self.headland.as_deref().filter(|h| h.len() >= 3)
    }

    pub fn inside_boundary(&self, p: Vec2) -> bool {
        point_in_polygon(&self.boundary.points, p)
    }

    pub fn inside_turn_area(&self, p: Vec2) -> bool {
        match &self.turn_area {
            Some(ring) => point_in_polygon(ring, p),
            None => false,
        }
    }
}

/// Positive distance shrinks the boundary, negative grows it, zero keeps it.
pub fn turn_limit_ring(boundary: &[Vec2], distance_from_boundary: f64) -> Option<Vec<Vec3>> {
    if distance_from_boundary > 0.0 {
        inward_offset_polygon(boundary, distance_from_boundary)
    } else if distance_from_boundary < 0.0 {
        outward_offset_polygon(boundary, -distance_from_boundary)
    } else if boundary.len() >= 3 {
        Some(assign_headings(boundary, true))
    } else {
        None
    }
}
