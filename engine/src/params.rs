use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::mask::DRIVABLE_THRESHOLD;

/// Turn offsets in degrees, straight ahead first, then alternating sides.
pub const DEFAULT_FAN: [f32; 13] = [
    0.0, -15.0, 15.0, -30.0, 30.0, -45.0, 45.0, -60.0, 60.0, -75.0, 75.0, -90.0, 90.0,
];

pub const DEFAULT_DISTANCE_MULTIPLIERS: [f32; 3] = [0.95, 1.0, 1.05];

/// Authoring-time settings for one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionParams {
    pub step_spacing: f32,
    pub max_waypoints: usize,
    /// Approximate track width; the visited-cell size is derived from it.
    pub track_width: f32,
    /// Explicit visited-cell size, overrides the width-derived one.
    pub cell_size: Option<i32>,
    pub sample_radius: f32,
    pub sample_count: usize,
    pub height_above_terrain: f32,
    pub seed_scan_step: f32,
    pub fan_angles: Vec<f32>,
    pub distance_multipliers: Vec<f32>,
    /// Visited cells are only enforced once more than this many exist.
    pub visited_grace: usize,
    /// Waypoints required before a return to the seed counts as a closed loop.
    pub min_loop_steps: usize,
    /// Minimum graph size for successor/predecessor wraparound.
    pub min_loop_size: usize,
    pub drivable_threshold: f32,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            step_spacing: 5.0,
            max_waypoints: 50,
            track_width: 10.0,
            cell_size: None,
            sample_radius: 3.0,
            sample_count: 16,
            height_above_terrain: 0.5,
            seed_scan_step: 0.05,
            fan_angles: DEFAULT_FAN.to_vec(),
            distance_multipliers: DEFAULT_DISTANCE_MULTIPLIERS.to_vec(),
            visited_grace: 10,
            min_loop_steps: 10,
            min_loop_size: 10,
            drivable_threshold: DRIVABLE_THRESHOLD,
        }
    }
}

impl ExtractionParams {
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let params: Self = ron::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&text)
    }

    /// `max(1, round(track_width / 2))` unless overridden.
    pub fn effective_cell_size(&self) -> i32 {
        self.cell_size
            .unwrap_or_else(|| (self.track_width / 2.0).round() as i32)
            .max(1)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(TrackError::InvalidParams(msg));
        if !(self.step_spacing > 0.0) {
            return fail(format!("step_spacing must be positive, got {}", self.step_spacing));
        }
        if self.max_waypoints == 0 {
            return fail("max_waypoints must be at least 1".into());
        }
        if !(self.sample_radius > 0.0) {
            return fail(format!("sample_radius must be positive, got {}", self.sample_radius));
        }
        if self.sample_count < 2 {
            return fail(format!("sample_count must be at least 2, got {}", self.sample_count));
        }
        if !(self.seed_scan_step > 0.0 && self.seed_scan_step <= 1.0) {
            return fail(format!("seed_scan_step must be in (0, 1], got {}", self.seed_scan_step));
        }
        if self.fan_angles.is_empty() {
            return fail("fan_angles is empty".into());
        }
        if self.distance_multipliers.is_empty() || self.distance_multipliers.iter().any(|m| *m <= 0.0) {
            return fail("distance_multipliers must be non-empty and positive".into());
        }
        Ok(())
    }
}
