use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use uturn_core::{Boundary, FieldGeometry, Track, TurnOptions, Vec2, Vec3};

/// A field, a reference track and a starting pose, as read from JSON.
/// Missing optional fields fall back to defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub boundary: Vec<Vec2>,
    pub track: Track,
    pub pose: Vec3,
    #[serde(default)]
    pub paths_away: i32,
    /// Forces the turn direction; otherwise `options.first_turn_left`.
    #[serde(default)]
    pub turn_left: Option<bool>,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub options: TurnOptions,
}

fn default_speed() -> f64 { 2.0 }

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
        serde_json::from_str(&text).with_context(|| format!("invalid scenario JSON in {:?}", path))
    }

    pub fn options(&self) -> TurnOptions { self.options.validated() }

    pub fn field(&self) -> Result<FieldGeometry> {
        let boundary = Boundary::new(self.boundary.clone());
        FieldGeometry::build(boundary, &self.options()).context("scenario boundary is unusable")
    }
}
