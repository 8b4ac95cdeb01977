use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_TRIGGER_DISTANCE: f64 = 10.0;
pub const DEFAULT_MAX_TRIGGER_DISTANCE: f64 = 60.0;
pub const MAX_SMOOTHING_PASSES: u32 = 50;

/// Tunables for headland turns. Read fresh on every tick; nothing in the
/// engine caches derived values across ticks except the field geometry,
/// which the owner rebuilds when boundary or headland settings change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnOptions {
    pub tool_width: f64,
    pub overlap: f64,
    /// 0 = turn into the adjacent pass, N = skip N passes.
    pub row_skip: u32,

    pub turn_radius: f64,
    pub min_turn_radius: f64,
    pub extension_length: f64,
    pub headland_width: f64,
    /// Positive keeps the arc inside the boundary, negative lets it run past.
    pub distance_from_boundary: f64,
    pub smoothing_passes: u32,

    pub min_trigger_distance: f64,
    pub max_trigger_distance: f64,
    pub capture_radius: f64,
    pub min_travel_distance: f64,
    pub alignment_tolerance_deg: f64,
    pub max_heading_change_deg: f64,

    pub point_spacing: f64,
    pub min_arc_points: usize,
    /// Iteration budget of the constrained solver's slide search.
    pub max_slide_steps: usize,

    pub first_turn_left: bool,
    pub retry_cooldown_ticks: u32,

    pub vehicle: VehicleOptions,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleOptions {
    pub wheelbase: f64,
    pub max_steer_angle_deg: f64,
    pub lookahead: f64,
    /// Extra look-ahead per m/s of speed.
    pub lookahead_speed_gain: f64,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            tool_width: 6.0,
            overlap: 0.0,
            row_skip: 0,
            turn_radius: 8.0,
            min_turn_radius: 4.0,
            extension_length: 20.0,
            headland_width: 12.0,
            distance_from_boundary: 2.0,
            smoothing_passes: 4,
            min_trigger_distance: DEFAULT_MIN_TRIGGER_DISTANCE,
            max_trigger_distance: DEFAULT_MAX_TRIGGER_DISTANCE,
            capture_radius: 2.0,
            min_travel_distance: 5.0,
            alignment_tolerance_deg: 20.0,
            max_heading_change_deg: 270.0,
            point_spacing: 0.5,
            min_arc_points: 20,
            max_slide_steps: 200,
            first_turn_left: false,
            retry_cooldown_ticks: 10,
            vehicle: VehicleOptions::default(),
        }
    }
}

impl Default for VehicleOptions {
    fn default() -> Self {
        Self { wheelbase: 3.0, max_steer_angle_deg: 35.0, lookahead: 4.0, lookahead_speed_gain: 0.5 }
    }
}

impl TurnOptions {
    /// Pass-to-pass spacing: tool width minus overlap, never below 1 cm.
    pub fn pass_spacing(&self) -> f64 {
        (self.tool_width - self.overlap).max(0.01)
    }

    pub fn smoothing_passes_clamped(&self) -> u32 {
        self.smoothing_passes.clamp(1, MAX_SMOOTHING_PASSES)
    }

    pub fn alignment_tolerance(&self) -> f64 { self.alignment_tolerance_deg.to_radians() }

    pub fn max_heading_change(&self) -> f64 { self.max_heading_change_deg.to_radians() }

    /// Copy with out-of-range values pulled back into something the geometry
    /// can work with. Never fails.
    pub fn validated(&self) -> Self {
        let mut o = self.clone();
        o.tool_width = finite_or(o.tool_width, 6.0).abs().max(0.1);
        o.overlap = finite_or(o.overlap, 0.0).clamp(0.0, o.tool_width * 0.9);
        o.turn_radius = finite_or(o.turn_radius, 8.0).abs();
        o.min_turn_radius = finite_or(o.min_turn_radius, 4.0).abs().max(0.5);
        o.extension_length = finite_or(o.extension_length, 20.0).max(0.0);
        o.headland_width = finite_or(o.headland_width, 12.0).max(0.0);
        o.distance_from_boundary = finite_or(o.distance_from_boundary, 0.0);
        o.smoothing_passes = o.smoothing_passes_clamped();
        o.min_trigger_distance = finite_or(o.min_trigger_distance, DEFAULT_MIN_TRIGGER_DISTANCE).max(0.0);
        o.max_trigger_distance = finite_or(o.max_trigger_distance, DEFAULT_MAX_TRIGGER_DISTANCE);
        if o.max_trigger_distance <= o.min_trigger_distance {
            o.max_trigger_distance = f64::INFINITY;
        }
        o.capture_radius = finite_or(o.capture_radius, 2.0).abs().max(0.1);
        o.min_travel_distance = finite_or(o.min_travel_distance, 5.0).max(0.0);
        o.alignment_tolerance_deg = finite_or(o.alignment_tolerance_deg, 20.0).clamp(1.0, 89.0);
        o.max_heading_change_deg = finite_or(o.max_heading_change_deg, 270.0).clamp(180.0, 360.0);
        o.point_spacing = finite_or(o.point_spacing, 0.5).clamp(0.05, 5.0);
        o.min_arc_points = o.min_arc_points.max(3);
        o.max_slide_steps = o.max_slide_steps.max(1);
        o.vehicle.wheelbase = finite_or(o.vehicle.wheelbase, 3.0).abs().max(0.1);
        o.vehicle.max_steer_angle_deg = finite_or(o.vehicle.max_steer_angle_deg, 35.0).clamp(1.0, 80.0);
        o.vehicle.lookahead = finite_or(o.vehicle.lookahead, 4.0).abs().max(0.5);
        o.vehicle.lookahead_speed_gain = finite_or(o.vehicle.lookahead_speed_gain, 0.5).max(0.0);
        o
    }

    /// Values that shape a turn path. A pending path built under a different
    /// fingerprint is stale.
    pub fn path_fingerprint(&self) -> [u64; 8] {
        [
            self.tool_width.to_bits(),
            self.overlap.to_bits(),
            u64::from(self.row_skip),
            self.turn_radius.to_bits(),
            self.extension_length.to_bits(),
            self.headland_width.to_bits(),
            self.distance_from_boundary.to_bits(),
            u64::from(self.smoothing_passes),
        ]
    }
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}
