//! Engine tunables.
//!
//! Every field has a serde default so a partial (or empty) JSON object is a
//! valid config. Distances are meters, angles are degrees.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How boat-vs-boat and boat-vs-zone overlap is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum CollisionPrecision {
    /// Axis-aligned bounds of the rotated rectangles only.
    BoundingBox,
    /// Bounding-box prefilter, then vertex containment in both directions.
    #[default]
    Polygon,
}

fn default_pixels_per_meter() -> f64 {
    10.0
}
fn default_grid_step() -> f64 {
    0.5
}
fn default_top_k() -> usize {
    5
}
fn default_candidate_rotations() -> Vec<f64> {
    vec![0.0, 90.0]
}
fn default_row_gap() -> f64 {
    0.5
}
fn default_dock_end_margin() -> f64 {
    2.0
}
fn default_dock_side_gap() -> f64 {
    1.0
}
fn default_dock_step() -> f64 {
    3.0
}
fn default_dock_berth_depth() -> f64 {
    25.0
}
fn default_rotation_delta() -> f64 {
    180.0
}
fn default_packing_efficiency() -> f64 {
    0.7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Canvas units per meter, used only by the render adapter.
    #[serde(default = "default_pixels_per_meter")]
    pub pixels_per_meter: f64,
    #[serde(default)]
    pub precision: CollisionPrecision,
    /// Spacing of the candidate grid.
    #[serde(default = "default_grid_step")]
    pub grid_step: f64,
    /// Number of candidates returned by the grid search.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_candidate_rotations")]
    pub candidate_rotations: Vec<f64>,
    /// Gap between rows and between neighbours in warehouse packing.
    #[serde(default = "default_row_gap")]
    pub row_gap: f64,
    /// Free distance kept at both ends of a dock.
    #[serde(default = "default_dock_end_margin")]
    pub dock_end_margin: f64,
    /// Distance between the dock edge and a berthed boat's margin.
    #[serde(default = "default_dock_side_gap")]
    pub dock_side_gap: f64,
    /// Minimum advance along the dock per placed boat.
    #[serde(default = "default_dock_step")]
    pub dock_step: f64,
    /// Water depth on each side of a dock line usable for berths.
    #[serde(default = "default_dock_berth_depth")]
    pub dock_berth_depth: f64,
    #[serde(default = "default_rotation_delta")]
    pub rotation_delta: f64,
    /// Share of a warehouse floor assumed usable by the capacity estimate.
    #[serde(default = "default_packing_efficiency")]
    pub packing_efficiency: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pixels_per_meter: default_pixels_per_meter(),
            precision: CollisionPrecision::default(),
            grid_step: default_grid_step(),
            top_k: default_top_k(),
            candidate_rotations: default_candidate_rotations(),
            row_gap: default_row_gap(),
            dock_end_margin: default_dock_end_margin(),
            dock_side_gap: default_dock_side_gap(),
            dock_step: default_dock_step(),
            dock_berth_depth: default_dock_berth_depth(),
            rotation_delta: default_rotation_delta(),
            packing_efficiency: default_packing_efficiency(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Reject values that would make the search loops diverge or divide by
    /// zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("pixelsPerMeter", self.pixels_per_meter),
            ("gridStep", self.grid_step),
            ("dockStep", self.dock_step),
            ("packingEfficiency", self.packing_efficiency),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        let non_negative = [
            ("rowGap", self.row_gap),
            ("dockEndMargin", self.dock_end_margin),
            ("dockSideGap", self.dock_side_gap),
            ("dockBerthDepth", self.dock_berth_depth),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be zero or positive, got {value}"
                )));
            }
        }
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("topK must be at least 1".into()));
        }
        if self.candidate_rotations.is_empty()
            || self.candidate_rotations.iter().any(|r| !r.is_finite())
        {
            return Err(ConfigError::Invalid(
                "candidateRotations must be a non-empty list of angles".into(),
            ));
        }
        Ok(())
    }
}
