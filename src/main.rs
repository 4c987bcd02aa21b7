//! Voltlab - headless device and energy-system simulator
//!
//! Runs any simulation variant against a virtual frame clock and writes the
//! recorded history as CSV.
//!
//! # Usage
//!
//! ```bash
//! voltlab --kind diode --source-voltage 5 --resistance 1000 --frames 120
//! voltlab --kind bjt --sweep 0:10:60 --frames 1200 --output bjt.csv
//! voltlab battery.json --frames 3600 --frame-ms 16.7 --time-scale 60
//! ```

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use voltlab_core::{
    error::{Result, VoltlabError},
    export, DeviceKind, SimulationConfig, SimulationEngine, SweepRange,
};

/// Device curve tracer and energy-storage simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file; omitted fields take the kind's defaults
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Device kind to simulate (diode, bjt, mosfet, multimeter, oscilloscope,
    /// function-generator, appliance-set, battery-pack)
    #[arg(short, long, conflicts_with = "config")]
    kind: Option<DeviceKind>,

    /// Source voltage (V)
    #[arg(long)]
    source_voltage: Option<f64>,

    /// Series resistance (Ω)
    #[arg(short, long)]
    resistance: Option<f64>,

    /// Sweep the excitation as from:to:steps
    #[arg(long, value_name = "FROM:TO:STEPS")]
    sweep: Option<SweepRange>,

    /// Minimum milliseconds between simulation ticks
    #[arg(long)]
    timestep_ms: Option<f64>,

    /// Simulated seconds per wall-clock second
    #[arg(long)]
    time_scale: Option<f64>,

    /// Number of frames to run
    #[arg(short, long, default_value_t = 600)]
    frames: usize,

    /// Virtual frame period in milliseconds
    #[arg(long, default_value_t = 16.0)]
    frame_ms: f64,

    /// Write CSV here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn build_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::for_kind(args.kind.unwrap_or_default()),
    };

    if let Some(v) = args.source_voltage {
        config = config.with_source_voltage(v);
    }
    if let Some(r) = args.resistance {
        config = config.with_series_resistance(r);
    }
    if let Some(range) = args.sweep {
        config = config.with_sweep(range.from, range.to, range.steps);
    }
    if let Some(ms) = args.timestep_ms {
        config = config.with_timestep_ms(ms);
    }
    if let Some(scale) = args.time_scale {
        config = config.with_time_scale(scale);
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if !(args.frame_ms.is_finite() && args.frame_ms > 0.0) {
        return Err(VoltlabError::invalid_config("frameMs", "must be a positive number"));
    }

    // Build and check the config
    let config = build_config(&args)?;

    // Drive the engine from a virtual clock
    let mut engine = SimulationEngine::for_config(&config);
    for frame in 0..args.frames {
        engine.tick(&config, frame as f64 * args.frame_ms);
    }

    info!(
        kind = %config.device_kind,
        frames = args.frames,
        samples = engine.history().len(),
        "run complete"
    );

    // Export
    match &args.output {
        Some(path) => export::write_csv(engine.history().iter(), path)?,
        None => {
            let csv = export::to_csv(engine.history().iter());
            io::stdout()
                .lock()
                .write_all(csv.as_bytes())
                .map_err(|e| VoltlabError::ExportWrite {
                    path: "<stdout>".to_string(),
                    source: e,
                })?;
        }
    }

    engine.dispose();
    Ok(())
}
