//! Run the target pipeline on one image and print the published values.
//!
//! ```text
//! cargo run -p portvision --example detect_image -- frame.png [config.json]
//! ```

use std::env;

use portvision::detect::{load_rgb, process_image, to_image};
use portvision::{MemoryStore, PipelineConfig, ResultSink, TableSink, TargetPipeline};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let image_path = args.next().ok_or("usage: detect_image <image> [config.json]")?;
    let config = match args.next() {
        Some(path) => PipelineConfig::load_json(path)?,
        None => PipelineConfig::default(),
    };

    let img = load_rgb(&image_path)?;
    let pipeline = TargetPipeline::new(config.pipeline)?;
    let result = process_image(&img, &pipeline);

    match result.outcome.measurement() {
        Some(m) => {
            let mut sink = TableSink::new(MemoryStore::default());
            sink.publish(m);
            for (key, value) in &sink.store().values {
                println!("{key:>18} = {value:?}");
            }
        }
        None => println!("no target: {:?}", result.outcome),
    }

    if let Some(dir) = config.annotated_dir {
        std::fs::create_dir_all(&dir)?;
        if let Some(img) = result.annotated.as_ref().and_then(to_image) {
            let out = dir.join("annotated.png");
            img.save(&out)?;
            println!("annotated frame written to {}", out.display());
        }
    }
    Ok(())
}
