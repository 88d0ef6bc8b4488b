// src/main.rs
//
// vehicle-compare: decide whether two images show the same vehicle.
//
// Exit codes: 0 when a verdict is produced (either way), 2 when a gate
// rejects the pair, 1 for I/O, decode and configuration failures.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use plate_swap_detection::{
    input, CaptureLabels, CompareError, ComparisonResult, EngineConfig, LightingType, Raster,
    VehicleComparisonService, VehicleView,
};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const EXIT_REJECTED: u8 = 2;
const EXIT_FAILED: u8 = 1;

/// Same-vehicle verification for license-plate-swap detection
#[derive(Parser, Debug)]
#[command(name = "vehicle-compare")]
#[command(about = "Compare two vehicle images for plate-swap fraud", long_about = None)]
#[command(version)]
struct Cli {
    /// First image file
    #[arg(long, conflicts_with = "image1_base64", required_unless_present = "image1_base64")]
    image1: Option<PathBuf>,

    /// Second image file
    #[arg(long, conflicts_with = "image2_base64", required_unless_present = "image2_base64")]
    image2: Option<PathBuf>,

    /// First image as base64 (bare or data URL)
    #[arg(long)]
    image1_base64: Option<String>,

    /// Second image as base64 (bare or data URL)
    #[arg(long)]
    image2_base64: Option<String>,

    /// Declared view of both images; skips view classification
    #[arg(long, value_enum, requires = "lighting")]
    view: Option<ViewArg>,

    /// Declared lighting of both images; skips lighting classification
    #[arg(long, value_enum, requires = "view")]
    lighting: Option<LightingArg>,

    /// YAML engine configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the JSON result to this path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the JSON result to stdout instead of the summary
    #[arg(long)]
    json: bool,

    /// Debug logging and detailed scores
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ViewArg {
    Front,
    Rear,
}

impl From<ViewArg> for VehicleView {
    fn from(v: ViewArg) -> Self {
        match v {
            ViewArg::Front => VehicleView::Front,
            ViewArg::Rear => VehicleView::Rear,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LightingArg {
    Daylight,
    Infrared,
}

impl From<LightingArg> for LightingType {
    fn from(l: LightingArg) -> Self {
        match l {
            LightingArg::Daylight => LightingType::Daylight,
            LightingArg::Infrared => LightingType::Infrared,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let rejected = e
                .downcast_ref::<CompareError>()
                .is_some_and(CompareError::is_rejection);
            ExitCode::from(if rejected { EXIT_REJECTED } else { EXIT_FAILED })
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    init_logging(cli.verbose, &config.logging.level);
    debug!("Configuration: {:?}", config);

    let first = load_image(cli.image1.as_ref(), cli.image1_base64.as_deref(), "image1")?;
    let second = load_image(cli.image2.as_ref(), cli.image2_base64.as_deref(), "image2")?;

    let service = VehicleComparisonService::new(config);
    let result = match (cli.view, cli.lighting) {
        (Some(view), Some(lighting)) => {
            let labels = CaptureLabels::new(view.into(), lighting.into());
            info!("Using declared labels: {} / {}", labels.view, labels.lighting);
            service.compare_declared(&first, labels, &second, labels)?
        }
        _ => service.compare(&first, &second)?,
    };

    if let Some(path) = &cli.output {
        let json = serde_json::to_string_pretty(&result)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write result to {}", path.display()))?;
        info!("💾 Result written to {}", path.display());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result, cli.verbose);
    }
    Ok(())
}

/// `RUST_LOG` wins; otherwise `--verbose` or the configured level.
fn init_logging(verbose: bool, level: &str) {
    let default = if verbose {
        "plate_swap_detection=debug".to_string()
    } else {
        format!("plate_swap_detection={}", level)
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_image(path: Option<&PathBuf>, base64: Option<&str>, name: &str) -> Result<Raster> {
    match (path, base64) {
        (Some(path), _) => input::load_path(path)
            .with_context(|| format!("Failed to load {} from {}", name, path.display())),
        (None, Some(payload)) => {
            input::load_base64(payload).with_context(|| format!("Failed to decode {}", name))
        }
        (None, None) => anyhow::bail!("No source given for {}", name),
    }
}

fn print_summary(result: &ComparisonResult, verbose: bool) {
    println!("========================================");
    println!(
        "Same vehicle:     {}",
        if result.is_same_vehicle { "YES" } else { "NO" }
    );
    println!("Similarity:       {:.3}", result.similarity_score);
    println!("Confidence:       {}", result.confidence_level.as_str());
    println!(
        "Processing time:  {} ms",
        result.processing_info.processing_time_ms
    );

    if verbose {
        let scores = &result.detailed_scores;
        println!("----------------------------------------");
        println!("Geometric:        {:.3}", scores.geometric_similarity);
        println!("Light pattern:    {:.3}", scores.light_pattern_similarity);
        println!("Bumper:           {:.3}", scores.bumper_similarity);
        if let Some(color) = scores.color_similarity {
            println!("Color:            {:.3}", color);
        }
        if let Some(thermal) = scores.thermal_similarity {
            println!("Thermal:          {:.3}", thermal);
        }
        let info = &result.processing_info;
        println!("----------------------------------------");
        println!("Image 1 quality:  {:.3}", info.image1_quality);
        println!("Image 2 quality:  {:.3}", info.image2_quality);
        println!("Alignment:        {:.3}", info.alignment_quality);
        println!("View consistent:  {}", info.view_consistency);
        println!("Light consistent: {}", info.lighting_consistency);
    }
    println!("========================================");
}
