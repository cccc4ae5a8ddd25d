//! portvision CLI: run the target pipeline on still images.

use std::path::{Path, PathBuf};

use clap::Parser;
use log::LevelFilter;
use serde::Serialize;

use portvision::detect::{load_rgb, process_image, to_image};
use portvision::{
    FrameOutcome, LogSink, PipelineConfig, ResultSink, TargetMeasurement, TargetPipeline,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "portvision")]
#[command(about = "Locate the retroreflective vision target in images and print its pose")]
#[command(version)]
struct Cli {
    /// Input images.
    #[arg(required_unless_present = "write_default_config")]
    images: Vec<PathBuf>,

    /// JSON pipeline configuration; missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save annotated frames here (overrides `annotated_dir` in the config).
    #[arg(long)]
    annotated_dir: Option<PathBuf>,

    /// Write the default configuration to this path and exit.
    #[arg(long)]
    write_default_config: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace. `PORTVISION_LOG`
    /// refines it per module.
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,

    /// Emit logs as JSON lines (requires the `tracing` feature).
    #[arg(long)]
    json_logs: bool,
}

/// One line of output per input image.
#[derive(Serialize)]
struct Report<'a> {
    image: &'a Path,
    detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    measurement: Option<&'a TargetMeasurement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    angles_deg: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Per-module filter overrides, e.g. `portvision_target=debug`.
const LOG_ENV: &str = "PORTVISION_LOG";

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) {
    use tracing_log::AsTrace;
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::builder()
        .with_default_directive(cli.log_level.as_trace().into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();
    // Closed spans report how long each pipeline stage took per frame.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let installed = if cli.json_logs {
        tracing::subscriber::set_global_default(builder.json().flatten_event(true).finish())
    } else {
        tracing::subscriber::set_global_default(builder.compact().finish())
    };
    if installed.is_ok() {
        let _ = tracing_log::LogTracer::builder()
            .with_max_level(cli.log_level)
            .init();
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) {
    use std::io::Write;

    if cli.json_logs {
        eprintln!("--json-logs needs the `tracing` feature; using plain logs");
    }
    let _ = env_logger::Builder::new()
        .filter_level(cli.log_level)
        .parse_env(env_logger::Env::new().filter(LOG_ENV))
        .format(|buf, record| {
            let target = record.target();
            let crate_name = target.split("::").next().unwrap_or(target);
            writeln!(
                buf,
                "[{} {:>5} {crate_name}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.args()
            )
        })
        .try_init();
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Some(path) = &cli.write_default_config {
        PipelineConfig::default().write_json(path)?;
        log::info!("wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load_json(path)?,
        None => PipelineConfig::default(),
    };
    if cli.annotated_dir.is_some() {
        config.annotated_dir = cli.annotated_dir.clone();
    }
    config.pipeline.annotate = config.annotated_dir.is_some();
    if let Some(dir) = &config.annotated_dir {
        std::fs::create_dir_all(dir)?;
    }

    let pipeline = TargetPipeline::new(config.pipeline.clone())?;
    let mut sink = LogSink;
    let mut failures = 0usize;

    for path in &cli.images {
        let img = match load_rgb(path) {
            Ok(img) => img,
            Err(err) => {
                log::error!("failed to read {}: {err}", path.display());
                failures += 1;
                continue;
            }
        };

        let result = process_image(&img, &pipeline);
        if let FrameOutcome::Detected(m) = &result.outcome {
            sink.publish(m);
        }
        let report = Report {
            image: path,
            detected: result.outcome.is_detected(),
            measurement: result.outcome.measurement(),
            angles_deg: result.outcome.measurement().map(|m| m.angles_deg()),
            reason: match &result.outcome {
                FrameOutcome::Dropped(err) => Some(err.to_string()),
                FrameOutcome::Detected(_) => None,
            },
        };
        println!("{}", serde_json::to_string(&report)?);

        if let (Some(dir), Some(annotated)) = (&config.annotated_dir, &result.annotated) {
            save_annotated(dir, path, annotated)?;
        }
    }

    if failures > 0 {
        return Err(format!("{failures} image(s) could not be read").into());
    }
    Ok(())
}

fn save_annotated(
    dir: &Path,
    source: &Path,
    annotated: &portvision::core::RgbImage,
) -> CliResult<()> {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_owned());
    let out = dir.join(format!("{stem}_annotated.png"));
    let img = to_image(annotated).ok_or("annotated frame has inconsistent dimensions")?;
    img.save(&out)?;
    log::info!("annotated frame written to {}", out.display());
    Ok(())
}
