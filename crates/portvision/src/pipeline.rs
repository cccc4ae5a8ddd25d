//! One-frame target pipeline: HSV mask, contours, largest candidate,
//! corner labels, pose and Euler angles.

use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

use portvision_core::annotate::{draw_contour, draw_diamond, palette};
use portvision_core::{find_contours, hsv_threshold, Contour, RgbImage, RgbImageView};
use portvision_pose::{Orientation, PoseEstimator};
use portvision_target::{select_largest, CornerFinder};

use crate::{FrameOutcome, PipelineError, PipelineParams, TargetMeasurement};

const MARKER_SIZE: u32 = 5;
const MARKER_THICKNESS: u32 = 2;
const CONTOUR_THICKNESS: u32 = 3;

/// Outcome of one frame plus its annotated copy, when annotation is enabled.
#[derive(Clone, Debug)]
pub struct FrameResult {
    pub outcome: FrameOutcome,
    pub annotated: Option<RgbImage>,
}

/// Immutable, validated pipeline. Cheap to share across threads.
#[derive(Clone, Debug)]
pub struct TargetPipeline {
    params: PipelineParams,
    corners: CornerFinder,
    pose: PoseEstimator,
}

impl TargetPipeline {
    pub fn new(params: PipelineParams) -> Result<Self, PipelineError> {
        params.validate()?;
        let corners = CornerFinder::new(params.corner_params())?;
        let pose = PoseEstimator::new(params.camera, params.target, params.solver)?;
        Ok(Self {
            params,
            corners,
            pose,
        })
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    pub fn pose_estimator(&self) -> &PoseEstimator {
        &self.pose
    }

    /// Measurement for one frame, or the reason it was dropped.
    pub fn detect(&self, frame: &RgbImageView<'_>) -> Result<TargetMeasurement, PipelineError> {
        let mut outline = Vec::new();
        self.run(frame, &mut outline)
    }

    /// Run the whole pipeline on one frame. The input is never modified.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(width = frame.width, height = frame.height))
    )]
    pub fn process(&self, frame: &RgbImageView<'_>) -> FrameResult {
        let mut outline = Vec::new();
        let outcome = match self.run(frame, &mut outline) {
            Ok(m) => FrameOutcome::Detected(m),
            Err(err) => {
                log_drop(&err);
                FrameOutcome::Dropped(err)
            }
        };
        let annotated = if self.params.annotate && frame.validate().is_ok() {
            Some(annotate(frame, &outline, outcome.measurement()))
        } else {
            None
        };
        FrameResult { outcome, annotated }
    }

    /// On success `outline` receives the selected contour and its
    /// simplified polygon.
    fn run(
        &self,
        frame: &RgbImageView<'_>,
        outline: &mut Vec<Contour>,
    ) -> Result<TargetMeasurement, PipelineError> {
        let mask = hsv_threshold(frame, &self.params.threshold)?;
        let contours = find_contours(&mask, self.params.external_only, self.params.chain);
        log::debug!(
            "{} lit pixels, {} contours",
            mask.count_set(),
            contours.len()
        );

        let candidate = select_largest(&contours).ok_or(PipelineError::NoContours)?;
        let detection = self.corners.find(candidate.contour)?;
        let image_points = detection.corners.to_image_points();

        let pose = self.pose.solve(&image_points)?;
        let orientation = Orientation::from_rotation_vector(&pose.rvec)?;

        outline.push(candidate.contour.clone());
        outline.push(Contour::new(detection.polygon));
        Ok(TargetMeasurement::new(
            pose,
            orientation,
            detection.corners,
            candidate.area,
        ))
    }
}

fn log_drop(err: &PipelineError) {
    if err.is_internal() {
        log::error!("dropping frame: {err}");
    } else if err.is_no_target() {
        log::debug!("no target: {err}");
    } else {
        log::warn!("dropping frame: {err}");
    }
}

fn annotate(
    frame: &RgbImageView<'_>,
    outline: &[Contour],
    measurement: Option<&TargetMeasurement>,
) -> RgbImage {
    let Some(m) = measurement else {
        return frame.to_owned_image();
    };
    let Some(mut canvas) = frame.to_rgb_buffer() else {
        return frame.to_owned_image();
    };
    for shape in outline {
        draw_contour(&mut canvas, shape, palette::CONTOUR, CONTOUR_THICKNESS);
    }
    draw_diamond(
        &mut canvas,
        to_pixel(m.centroid),
        palette::CENTROID,
        MARKER_SIZE,
        MARKER_THICKNESS,
    );
    let [tl, tr, br, bl] = m.corners.to_image_points();
    for p in [tr, br, bl] {
        draw_diamond(
            &mut canvas,
            to_pixel(p),
            palette::CORNER,
            MARKER_SIZE,
            MARKER_THICKNESS,
        );
    }
    // Leftmost point doubles as the first pose correspondence.
    draw_diamond(
        &mut canvas,
        to_pixel(tl),
        palette::EXTREME,
        MARKER_SIZE,
        MARKER_THICKNESS,
    );
    RgbImage::from_rgb_buffer(canvas).unwrap_or_else(|_| frame.to_owned_image())
}

fn to_pixel(p: Point2<f64>) -> Point2<i32> {
    Point2::new(p.x.round() as i32, p.y.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use portvision_core::ImageError;

    #[test]
    fn invalid_params_are_rejected() {
        let params = PipelineParams {
            min_vertices: 9,
            ..PipelineParams::default()
        };
        assert!(TargetPipeline::new(params).is_err());
    }

    #[test]
    fn dark_frame_is_dropped_and_left_unannotated() {
        let pipeline = TargetPipeline::new(PipelineParams::default()).expect("pipeline");
        let frame = RgbImage::filled(64, 48, [10, 10, 10]).expect("frame");
        let result = pipeline.process(&frame.view());
        assert_eq!(
            result.outcome,
            FrameOutcome::Dropped(PipelineError::NoContours)
        );
        assert_eq!(result.annotated.as_ref(), Some(&frame));
    }

    #[test]
    fn malformed_frame_is_an_input_error() {
        let pipeline = TargetPipeline::new(PipelineParams::default()).expect("pipeline");
        let data = vec![0u8; 10];
        let view = RgbImageView {
            width: 4,
            height: 4,
            data: &data,
        };
        let result = pipeline.process(&view);
        assert!(matches!(
            result.outcome,
            FrameOutcome::Dropped(PipelineError::Image(
                ImageError::InvalidBufferLength { .. }
            ))
        ));
        assert!(result.annotated.is_none());
    }

    #[test]
    fn blob_without_target_shape_is_no_target() {
        let pipeline = TargetPipeline::new(PipelineParams::default()).expect("pipeline");
        let mut frame = RgbImage::filled(64, 48, [10, 10, 10]).expect("frame");
        for y in 10..30 {
            for x in 10..40 {
                frame.put_pixel(x, y, [100, 200, 230]);
            }
        }
        let err = pipeline.detect(&frame.view()).expect_err("rectangle");
        assert!(err.is_no_target(), "{err:?}");
    }
}
