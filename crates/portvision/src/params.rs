//! Pipeline parameters and JSON configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use portvision_core::{ChainApprox, HsvThreshold};
use portvision_pose::{CameraModel, SolverParams, TargetGeometry};
use portvision_target::CornerParams;

use crate::PipelineError;

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Every tunable of the target pipeline. Fixed for the life of a
/// [`TargetPipeline`](crate::TargetPipeline).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    pub threshold: HsvThreshold,
    /// Only outer borders; holes and islands inside them are ignored.
    pub external_only: bool,
    pub chain: ChainApprox,
    /// Polygon simplification tolerance as a fraction of the perimeter.
    pub approx_tolerance: f64,
    pub min_vertices: usize,
    pub max_vertices: usize,
    pub check_orientation: bool,
    /// Produce an annotated copy of each frame.
    pub annotate: bool,
    pub camera: CameraModel,
    pub target: TargetGeometry,
    pub solver: SolverParams,
}

impl Default for PipelineParams {
    fn default() -> Self {
        let corners = CornerParams::default();
        Self {
            threshold: HsvThreshold::default(),
            external_only: false,
            chain: ChainApprox::Simple,
            approx_tolerance: corners.approx_tolerance,
            min_vertices: corners.min_vertices,
            max_vertices: corners.max_vertices,
            check_orientation: corners.check_orientation,
            annotate: true,
            camera: CameraModel::default(),
            target: TargetGeometry::default(),
            solver: SolverParams::default(),
        }
    }
}

impl PipelineParams {
    pub fn corner_params(&self) -> CornerParams {
        CornerParams {
            approx_tolerance: self.approx_tolerance,
            min_vertices: self.min_vertices,
            max_vertices: self.max_vertices,
            check_orientation: self.check_orientation,
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.threshold.is_valid() {
            return Err(PipelineError::InvalidParams(
                "HSV ranges must be finite with min <= max".into(),
            ));
        }
        self.corner_params().validate()?;
        self.camera.validate()?;
        self.target.validate()?;
        if self.solver.max_iterations == 0 {
            return Err(PipelineError::InvalidParams(
                "solver.max_iterations must be at least 1".into(),
            ));
        }
        let max_err = self.solver.max_reprojection_error_px;
        if max_err.is_nan() || max_err <= 0.0 {
            return Err(PipelineError::InvalidParams(
                "solver.max_reprojection_error_px must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// On-disk configuration: pipeline parameters plus run options.
///
/// Every field is optional; missing ones take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub pipeline: PipelineParams,
    /// Where annotated frames are written, if anywhere.
    pub annotated_dir: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(PipelineParams::default().validate().is_ok());
    }

    #[test]
    fn empty_object_is_all_defaults() {
        let cfg: PipelineConfig = serde_json::from_str("{}").expect("json");
        assert_eq!(cfg, PipelineConfig::default());
    }

    #[test]
    fn partial_threshold_override() {
        let cfg: PipelineConfig = serde_json::from_str(
            r#"{ "pipeline": { "threshold": { "hue": [40, 90], "saturation": [0, 255], "value": [100, 255] }, "approx_tolerance": 0.02 } }"#,
        )
        .expect("json");
        assert_eq!(cfg.pipeline.threshold.hue.min, 40.0);
        assert_eq!(cfg.pipeline.approx_tolerance, 0.02);
        assert_eq!(cfg.pipeline.max_vertices, 8);
        assert_eq!(cfg.pipeline.camera, CameraModel::default());
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut p = PipelineParams::default();
        p.threshold.value.min = 300.0;
        p.threshold.value.max = 10.0;
        assert!(matches!(p.validate(), Err(PipelineError::InvalidParams(_))));

        let p = PipelineParams {
            approx_tolerance: 1.5,
            ..PipelineParams::default()
        };
        assert!(p.validate().is_err());

        let mut p = PipelineParams::default();
        p.camera.fx = 0.0;
        assert!(p.validate().is_err());
    }
}
