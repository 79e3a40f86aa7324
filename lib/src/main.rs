//! Arc Welder CLI - Command-line interface for the arc-welder library
//!
//! Usage:
//!   arc-welder weld <points.json> -o <output.gcode> [options]
//!   arc-welder weld <points.json> --curve spline --resolution 0.02
//!   arc-welder weld <points.json> --config my_config.json
//!   arc-welder config [--preset strict]

use anyhow::{bail, Context, Result};
use arc_welder::{
    Arc, Curve, CurveKind, PrinterPoint, ShapeConfig, Spline, WeldStats, WeldedCommand, Welder,
};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Points processed between progress updates.
const PROGRESS_CHUNK: usize = 1024;

/// Replace runs of G1 moves with G2/G3 arcs or G5 splines
#[derive(Parser, Debug)]
#[command(name = "arc-welder")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Weld a stream of resolved points into curve commands
    Weld {
        /// Input file: JSON array of resolved points
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output G-code file (stdout if omitted)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Shape configuration file (JSON format); flags below override it
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Curve family: arc or spline
        #[arg(long, default_value = "arc")]
        curve: CurveKind,

        /// Maximum deviation from the original path in mm
        #[arg(long)]
        resolution: Option<f64>,

        /// Allowed relative length difference (0.05 = 5%)
        #[arg(long)]
        path_tolerance: Option<f64>,

        /// Maximum arc radius in mm
        #[arg(long)]
        max_radius: Option<f64>,

        /// Allow shapes that change Z
        #[arg(long)]
        allow_3d: bool,

        /// Maximum emitted command length (0 = unlimited)
        #[arg(long)]
        max_gcode_length: Option<usize>,

        /// Firmware arc segment length in mm (enables firmware compensation)
        #[arg(long)]
        mm_per_segment: Option<f64>,
    },

    /// Print a shape configuration as JSON
    Config {
        /// Preset: default, strict, or relaxed
        #[arg(long, default_value = "default")]
        preset: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Weld {
            input,
            output,
            config,
            curve,
            resolution,
            path_tolerance,
            max_radius,
            allow_3d,
            max_gcode_length,
            mm_per_segment,
        } => {
            let mut shape_config = match config {
                Some(path) => {
                    info!("Loading shape config from: {}", path.display());
                    ShapeConfig::from_json_file(&path)
                        .with_context(|| format!("Failed to load config {}", path.display()))?
                }
                None => ShapeConfig::default(),
            };
            if let Some(resolution) = resolution {
                shape_config.resolution_mm = resolution;
            }
            if let Some(percent) = path_tolerance {
                shape_config.path_tolerance_percent = percent;
            }
            if let Some(radius) = max_radius {
                shape_config.max_radius_mm = radius;
            }
            if let Some(length) = max_gcode_length {
                shape_config.max_gcode_length = length;
            }
            if let Some(mm) = mm_per_segment {
                shape_config.mm_per_segment = mm;
            }
            shape_config.allow_3d |= allow_3d;

            cmd_weld(input, output, shape_config, curve)
        }
        Commands::Config { preset } => cmd_config(&preset),
    }
}

fn cmd_weld(
    input: PathBuf,
    output: Option<PathBuf>,
    config: ShapeConfig,
    curve: CurveKind,
) -> Result<()> {
    info!("Loading points: {}", input.display());
    let text = fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let points: Vec<PrinterPoint> =
        serde_json::from_str(&text).context("Failed to parse point stream")?;
    if points.is_empty() {
        warn!("Input contains no points");
    }

    info!("Welding {} points into {}s", points.len(), curve);
    info!("  {}", config);

    let progress = ProgressBar::new(points.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );
    progress.set_message("Welding...");

    let (commands, stats) = match curve {
        CurveKind::Arc => weld_stream::<Arc>(&points, config, &progress),
        CurveKind::Spline => weld_stream::<Spline>(&points, config, &progress),
    };
    progress.finish_with_message("Done!");

    match output {
        Some(path) => {
            let file = fs::File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_commands(BufWriter::new(file), &commands)
                .context("Failed to write G-code file")?;
            info!("Output: {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            write_commands(stdout.lock(), &commands).context("Failed to write G-code")?;
        }
    }

    report(&stats);
    Ok(())
}

fn weld_stream<C: Curve>(
    points: &[PrinterPoint],
    config: ShapeConfig,
    progress: &ProgressBar,
) -> (Vec<WeldedCommand>, WeldStats) {
    let mut welder = Welder::<C>::new(config);
    let mut commands = Vec::with_capacity(points.len());

    for (chunk_index, chunk) in points.chunks(PROGRESS_CHUNK).enumerate() {
        for point in chunk {
            welder.process(*point);
        }
        commands.extend(welder.take_output());
        progress.set_position(((chunk_index + 1) * PROGRESS_CHUNK).min(points.len()) as u64);
    }

    let (rest, stats) = welder.finish();
    commands.extend(rest);
    (commands, stats)
}

fn write_commands<W: Write>(mut writer: W, commands: &[WeldedCommand]) -> io::Result<()> {
    for command in commands {
        writeln!(writer, "{}", command.gcode())?;
    }
    writer.flush()
}

fn report(stats: &WeldStats) {
    info!("Welding complete:");
    info!("  Moves in: {}", stats.input_moves);
    info!(
        "  Curves: {} (replacing {} moves)",
        stats.curve_count, stats.points_replaced
    );
    info!("  Lines: {}", stats.line_count);
    info!("  Compression: {:.2}x", stats.compression_ratio);
    if stats.gcode_length_exceptions > 0 {
        info!(
            "  Rejected for command length: {}",
            stats.gcode_length_exceptions
        );
    }
    if stats.firmware_compensations > 0 {
        info!(
            "  Rejected for firmware compensation: {}",
            stats.firmware_compensations
        );
    }
}

fn cmd_config(preset: &str) -> Result<()> {
    let config = match preset.to_ascii_lowercase().as_str() {
        "default" => ShapeConfig::default(),
        "strict" => ShapeConfig::strict(),
        "relaxed" => ShapeConfig::relaxed(),
        other => bail!("Unknown preset '{}' (expected default, strict, or relaxed)", other),
    };
    let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
    println!("{}", json);
    Ok(())
}
