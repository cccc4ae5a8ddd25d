//! Helpers for running the pipeline on `image` crate buffers and files.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::instrument;

use portvision_core::{RgbImage, RgbImageView};

use crate::stream::FrameSource;
use crate::{FrameResult, PipelineError, TargetMeasurement, TargetPipeline};

/// Borrow an `image::RgbImage` as the pipeline's view type.
pub fn rgb_view(img: &::image::RgbImage) -> RgbImageView<'_> {
    RgbImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Convert a pipeline image back for encoding.
pub fn to_image(img: &RgbImage) -> Option<::image::RgbImage> {
    ::image::RgbImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
}

/// Run the pipeline end-to-end on a decoded image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, pipeline), fields(width = img.width(), height = img.height()))
)]
pub fn detect_target_in_image(
    img: &::image::RgbImage,
    pipeline: &TargetPipeline,
) -> Result<TargetMeasurement, PipelineError> {
    pipeline.detect(&rgb_view(img))
}

/// Like [`detect_target_in_image`] but keeps the annotated frame.
pub fn process_image(img: &::image::RgbImage, pipeline: &TargetPipeline) -> FrameResult {
    pipeline.process(&rgb_view(img))
}

/// Decode any format the `image` crate understands into RGB.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<::image::RgbImage, ::image::ImageError> {
    Ok(::image::ImageReader::open(path)?.decode()?.to_rgb8())
}

#[derive(thiserror::Error, Debug)]
#[error("failed to read {path}: {source}")]
pub struct LoadError {
    pub path: PathBuf,
    #[source]
    pub source: ::image::ImageError,
}

/// Frame source over image files, in order.
#[derive(Clone, Debug, Default)]
pub struct ImageFileSource {
    paths: VecDeque<PathBuf>,
}

impl ImageFileSource {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl FrameSource for ImageFileSource {
    type Error = LoadError;

    fn next_frame(&mut self) -> Option<Result<RgbImage, LoadError>> {
        let path = self.paths.pop_front()?;
        let frame = load_rgb(&path).map(|img| {
            let (w, h) = img.dimensions();
            RgbImage {
                width: w as usize,
                height: h as usize,
                data: img.into_raw(),
            }
        });
        Some(frame.map_err(|source| LoadError { path, source }))
    }
}
