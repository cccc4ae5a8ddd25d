//! Vision pipeline for the retroreflective FRC target.
//!
//! A frame goes through five fixed stages: HSV threshold, border tracing,
//! largest-contour selection, corner labelling and a four-point pose solve.
//! The pose is decomposed into X-Y-Z Euler angles and published together
//! with the target's distance.
//!
//! ## Quickstart
//!
//! ```no_run
//! use portvision::{PipelineParams, TableSink, MemoryStore, ResultSink, TargetPipeline};
//! use portvision::core::RgbImage;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = TargetPipeline::new(PipelineParams::default())?;
//! let frame = RgbImage::filled(640, 480, [0, 0, 0])?;
//! let mut sink = TableSink::new(MemoryStore::default());
//! if let Ok(m) = pipeline.detect(&frame.view()) {
//!     sink.publish(&m);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `portvision::core`: images, masks, contours, polygon measures, drawing.
//! - `portvision::target`: candidate selection and corner labelling.
//! - `portvision::pose`: camera model, target geometry, pose and angles.
//! - `portvision::detect` (feature `image`): helpers over `image::RgbImage`.

pub use portvision_core as core;
pub use portvision_pose as pose;
pub use portvision_target as target;

mod error;
mod measurement;
mod params;
mod pipeline;
mod sink;
pub mod stream;

#[cfg(feature = "image")]
pub mod detect;

pub use error::{DropCategory, PipelineError};
pub use measurement::{FrameOutcome, TargetMeasurement};
pub use params::{ConfigIoError, PipelineConfig, PipelineParams};
pub use pipeline::{FrameResult, TargetPipeline};
pub use sink::{
    KeyValueStore, LogSink, MemoryStore, ResultSink, TableSink, Value, VecSink,
    KEY_ANGLE_HORIZONTAL, KEY_ANGLE_OTHER, KEY_ANGLE_VERTICAL, KEY_DISTANCE, KEY_MOMENT,
    KEY_PLANE_DISTANCE,
};
pub use stream::{run_stream, FrameOutput, FrameSource, IterSource, StreamStats, VecOutput};
