use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use portvision::core::{find_contours, hsv_threshold, ChainApprox, HsvThreshold, RgbImage};
use portvision::pose::{CameraModel, TargetGeometry};
use portvision::{PipelineParams, TargetPipeline};

#[path = "../tests/common/mod.rs"]
mod common;

fn robot_frame() -> RgbImage {
    common::render(
        &CameraModel::default(),
        &TargetGeometry::default(),
        &common::Placement::frontal(2.0),
        640,
        480,
    )
}

fn bench_stages(c: &mut Criterion) {
    let frame = robot_frame();
    let threshold = HsvThreshold::default();
    let mask = hsv_threshold(&frame.view(), &threshold).expect("mask");

    c.bench_function("hsv_threshold_640x480", |b| {
        b.iter(|| hsv_threshold(black_box(&frame.view()), &threshold))
    });
    c.bench_function("find_contours_640x480", |b| {
        b.iter(|| find_contours(black_box(&mask), false, ChainApprox::Simple))
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let frame = robot_frame();
    let pipeline = TargetPipeline::new(PipelineParams::default()).expect("pipeline");
    let quiet = TargetPipeline::new(PipelineParams {
        annotate: false,
        ..PipelineParams::default()
    })
    .expect("pipeline");

    c.bench_function("process_frame_annotated", |b| {
        b.iter(|| pipeline.process(black_box(&frame.view())))
    });
    c.bench_function("detect_frame", |b| {
        b.iter(|| quiet.detect(black_box(&frame.view())))
    });
}

criterion_group!(benches, bench_stages, bench_pipeline);
criterion_main!(benches);
