//! Command-line renderer: strike a membrane and write the result to disk.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use drumhead::config::{CircularConfig, MembraneConfig, RectangularConfig, SynthConfig};
use drumhead::error::MembraneError;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Shape {
    Rectangular,
    Circular,
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "drumhead")]
#[command(about = "Physical-modeling drum synthesizer (FDTD membrane)", long_about = None)]
struct Args {
    /// Output file path
    output: PathBuf,

    /// Membrane shape, used when no config file is given
    #[arg(long, value_enum, default_value = "rectangular")]
    shape: Shape,

    /// JSON render config; takes precedence over --shape
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Simulated duration override
    #[arg(long, value_name = "SECONDS")]
    duration: Option<f64>,

    /// Write raw little-endian f32 displacement instead of a WAV file
    #[arg(long)]
    raw: bool,
}

fn load_config(args: &Args) -> Result<SynthConfig, MembraneError> {
    let mut config = match &args.config {
        Some(path) => SynthConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => SynthConfig {
            membrane: match args.shape {
                Shape::Rectangular => MembraneConfig::Rectangular(RectangularConfig::default()),
                Shape::Circular => MembraneConfig::Circular(CircularConfig::default()),
            },
            ..Default::default()
        },
    };
    if let Some(seconds) = args.duration {
        config.membrane.set_duration(seconds);
    }
    Ok(config)
}

fn write_raw(path: &Path, config: &SynthConfig) -> Result<(), MembraneError> {
    let samples = drumhead::render_samples(&config.membrane)?;
    let bytes: Vec<u8> = samples
        .iter()
        .flat_map(|&s| (s as f32).to_le_bytes())
        .collect();
    std::fs::write(path, bytes)?;
    Ok(())
}

fn run(args: &Args) -> Result<(), MembraneError> {
    let config = load_config(args)?;
    log::info!(
        "rendering {} samples at {} Hz",
        config.membrane.num_samples(),
        config.membrane.sample_rate()
    );
    if args.raw {
        write_raw(&args.output, &config)?;
    } else {
        let wav = drumhead::render_wav(&config)?;
        std::fs::write(&args.output, wav)?;
    }
    log::info!("wrote {}", args.output.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
