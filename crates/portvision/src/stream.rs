//! Frame loop: grab, process, publish, forward the annotated frame.

use std::fmt::Display;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use portvision_core::RgbImage;

use crate::{DropCategory, FrameOutcome, ResultSink, TargetPipeline};

/// Supplies frames until exhausted. A grab error skips one frame.
pub trait FrameSource {
    type Error: Display;

    fn next_frame(&mut self) -> Option<Result<RgbImage, Self::Error>>;
}

/// Receives annotated frames and grab errors, e.g. a dashboard stream.
pub trait FrameOutput {
    fn put_frame(&mut self, frame: &RgbImage);
    fn notify_error(&mut self, message: &str);
}

/// Adapts any iterator of grab results into a [`FrameSource`].
#[derive(Clone, Debug)]
pub struct IterSource<I>(pub I);

impl<I, E> FrameSource for IterSource<I>
where
    I: Iterator<Item = Result<RgbImage, E>>,
    E: Display,
{
    type Error = E;

    fn next_frame(&mut self) -> Option<Result<RgbImage, E>> {
        self.0.next()
    }
}

/// Counters for one [`run_stream`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    /// Frames handed to the pipeline.
    pub frames: usize,
    pub grab_errors: usize,
    pub detections: usize,
    pub dropped_invalid_input: usize,
    pub dropped_no_target: usize,
    pub dropped_solver_failure: usize,
    pub dropped_internal: usize,
}

impl StreamStats {
    pub fn dropped(&self) -> usize {
        self.dropped_invalid_input
            + self.dropped_no_target
            + self.dropped_solver_failure
            + self.dropped_internal
    }

    fn record(&mut self, outcome: &FrameOutcome) {
        match outcome {
            FrameOutcome::Detected(_) => self.detections += 1,
            FrameOutcome::Dropped(err) => match err.category() {
                DropCategory::InvalidInput => self.dropped_invalid_input += 1,
                DropCategory::NoTarget => self.dropped_no_target += 1,
                DropCategory::SolverFailure => self.dropped_solver_failure += 1,
                DropCategory::Internal => self.dropped_internal += 1,
            },
        }
    }
}

/// Frames between throughput log lines, about five seconds of camera feed.
const RATE_WINDOW: usize = 150;

/// Throughput over consecutive blocks of frames.
#[derive(Clone, Copy, Debug)]
struct RateMeter {
    window: usize,
    started: Instant,
    frames: usize,
    detections: usize,
}

/// One closed block of frames.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Rate {
    frames: usize,
    detections: usize,
    elapsed: Duration,
}

impl Rate {
    fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            f64::INFINITY
        }
    }
}

impl RateMeter {
    fn new(window: usize, now: Instant) -> Self {
        Self {
            window: window.max(1),
            started: now,
            frames: 0,
            detections: 0,
        }
    }

    /// Count one processed frame; returns the block once it is full.
    fn tick(&mut self, detected: bool, now: Instant) -> Option<Rate> {
        self.frames += 1;
        self.detections += usize::from(detected);
        if self.frames < self.window {
            return None;
        }
        let rate = Rate {
            frames: self.frames,
            detections: self.detections,
            elapsed: now.saturating_duration_since(self.started),
        };
        *self = Self::new(self.window, now);
        Some(rate)
    }
}

/// Process frames one at a time until `source` is exhausted.
///
/// Successful measurements go to `sink`; annotated frames and grab errors go
/// to `output` when one is given. No per-frame failure stops the loop.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
pub fn run_stream<S, R>(
    source: &mut S,
    pipeline: &TargetPipeline,
    sink: &mut R,
    mut output: Option<&mut dyn FrameOutput>,
) -> StreamStats
where
    S: FrameSource + ?Sized,
    R: ResultSink + ?Sized,
{
    let mut stats = StreamStats::default();
    let mut meter = RateMeter::new(RATE_WINDOW, Instant::now());
    while let Some(grab) = source.next_frame() {
        let frame = match grab {
            Ok(frame) => frame,
            Err(err) => {
                stats.grab_errors += 1;
                let message = err.to_string();
                log::warn!("frame grab failed: {message}");
                if let Some(out) = output.as_deref_mut() {
                    out.notify_error(&message);
                }
                continue;
            }
        };

        stats.frames += 1;
        let result = pipeline.process(&frame.view());
        stats.record(&result.outcome);
        if let Some(rate) = meter.tick(result.outcome.is_detected(), Instant::now()) {
            log::info!(
                "{:.1} fps over {} frames, target seen in {}",
                rate.fps(),
                rate.frames,
                rate.detections
            );
        }
        if let FrameOutcome::Detected(m) = &result.outcome {
            sink.publish(m);
        }
        if let Some(out) = output.as_deref_mut() {
            out.put_frame(result.annotated.as_ref().unwrap_or(&frame));
        }
    }
    log::info!(
        "stream finished: {} frames, {} detections, {} dropped, {} grab errors",
        stats.frames,
        stats.detections,
        stats.dropped(),
        stats.grab_errors
    );
    stats
}

/// Collects everything sent to it.
#[derive(Clone, Debug, Default)]
pub struct VecOutput {
    pub frames: Vec<RgbImage>,
    pub errors: Vec<String>,
}

impl FrameOutput for VecOutput {
    fn put_frame(&mut self, frame: &RgbImage) {
        self.frames.push(frame.clone());
    }

    fn notify_error(&mut self, message: &str) {
        self.errors.push(message.to_owned());
    }
}
