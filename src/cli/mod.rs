//! Command-line interface for the scan pipeline.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::processors::session;

#[derive(Parser)]
#[command(name = "bridgescan-pipeline")]
#[command(about = "Laser-scan point cloud post-processing pipeline", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a session's leg files into one deterministic text artifact
    Merge {
        /// Directory containing the session's leg files
        session_dir: PathBuf,
        /// Output directory for the merged artifact
        output_dir: PathBuf,
        /// Also write one row file per component id
        #[arg(long)]
        export_components: bool,
    },

    /// Convert a merged scan file into a normalized .npy tensor
    Convert {
        /// Input point table (whitespace-delimited text)
        input: PathBuf,
        /// Output directory for the .npy artifact
        output_dir: PathBuf,
        /// Number of points in the output tensor
        #[arg(short = 'k', long)]
        target_points: Option<usize>,
        /// Replace non-spatial channels with three zero channels
        #[arg(long)]
        color_padding: bool,
        /// Seed for the sampling RNG
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Merge and convert every session directory under a root
    Batch {
        /// Directory containing one subdirectory per scan session
        sessions_root: PathBuf,
        /// Output directory (merged/ and npy/ are created inside)
        output_dir: PathBuf,
        /// Number of points in every output tensor
        #[arg(short = 'k', long)]
        target_points: Option<usize>,
        /// Replace non-spatial channels with three zero channels
        #[arg(long)]
        color_padding: bool,
        /// Seed for the sampling RNG
        #[arg(long)]
        seed: Option<u64>,
        /// Also write one row file per component id
        #[arg(long)]
        export_components: bool,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.len() > 39 {
            format!("{}...", &value[..36])
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::Merge {
            session_dir,
            output_dir,
            export_components,
        } => {
            cmd_merge(&session_dir, &output_dir, export_components, config);
        }
        Commands::Convert {
            input,
            output_dir,
            target_points,
            color_padding,
            seed,
        } => {
            cmd_convert(&input, &output_dir, target_points, color_padding, seed, config);
        }
        Commands::Batch {
            sessions_root,
            output_dir,
            target_points,
            color_padding,
            seed,
            export_components,
        } => {
            cmd_batch(
                &sessions_root,
                &output_dir,
                target_points,
                color_padding,
                seed,
                export_components,
                config,
            );
        }
    }
}

fn apply_sampling_overrides(
    config: &mut PipelineConfig,
    target_points: Option<usize>,
    color_padding: bool,
    seed: Option<u64>,
) {
    if let Some(k) = target_points {
        config.sampling.target_points = k;
    }
    if let Some(s) = seed {
        config.sampling.seed = Some(s);
    }
    if color_padding {
        config.formats.color_padding = true;
    }
}

fn cmd_merge(
    session_dir: &PathBuf,
    output_dir: &PathBuf,
    export_components: bool,
    mut config: PipelineConfig,
) {
    let start = Instant::now();

    if export_components {
        config.merge.export_components = true;
    }

    println!("Merging session legs...");
    println!("Session directory: {}", session_dir.display());
    println!("Output directory: {}", output_dir.display());

    let spinner = create_spinner("Reading and merging leg files...");

    match session::merge_session(session_dir, output_dir, &config) {
        Ok((merged_path, scan)) => {
            spinner.finish_and_clear();

            let components: Vec<String> = scan
                .component_counts()
                .iter()
                .map(|(id, n)| format!("{}={}", id, n))
                .collect();

            print_summary(
                "Merge Complete",
                &[
                    ("Session", session_dir.display().to_string()),
                    ("Merged file", merged_path.display().to_string()),
                    ("Rows", scan.rows.len().to_string()),
                    ("Components", components.join(", ")),
                    (
                        "Component export",
                        config.merge.export_components.to_string(),
                    ),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Merge failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_convert(
    input: &PathBuf,
    output_dir: &PathBuf,
    target_points: Option<usize>,
    color_padding: bool,
    seed: Option<u64>,
    mut config: PipelineConfig,
) {
    let start = Instant::now();

    apply_sampling_overrides(&mut config, target_points, color_padding, seed);

    println!("Converting scan to tensor...");
    println!("Input: {}", input.display());
    println!("Output directory: {}", output_dir.display());
    println!("Target points: {}", config.sampling.target_points);

    let spinner = create_spinner("Resampling and normalizing point cloud...");

    match session::convert_scan_file(input, output_dir, &config) {
        Ok(outcome) => {
            spinner.finish_and_clear();

            print_summary(
                "Conversion Complete",
                &[
                    ("Input file", input.display().to_string()),
                    ("Output file", outcome.tensor_path.display().to_string()),
                    (
                        "Shape",
                        format!("({}, {})", outcome.tensor_shape.0, outcome.tensor_shape.1),
                    ),
                    ("Color padding", config.formats.color_padding.to_string()),
                    (
                        "Seed",
                        config
                            .sampling
                            .seed
                            .map_or("entropy".to_string(), |s| s.to_string()),
                    ),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Conversion failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_batch(
    sessions_root: &PathBuf,
    output_dir: &PathBuf,
    target_points: Option<usize>,
    color_padding: bool,
    seed: Option<u64>,
    export_components: bool,
    mut config: PipelineConfig,
) {
    let start = Instant::now();

    apply_sampling_overrides(&mut config, target_points, color_padding, seed);
    if export_components {
        config.merge.export_components = true;
    }

    println!("Processing scan sessions in batch mode...");
    println!("Sessions root: {}", sessions_root.display());
    println!("Output directory: {}", output_dir.display());
    println!("Target points: {}", config.sampling.target_points);

    let spinner = create_spinner("Merging and converting sessions...");

    match session::process_batch(sessions_root, output_dir, &config) {
        Ok(outcomes) => {
            spinner.finish_and_clear();

            let total_rows: usize = outcomes.iter().map(|o| o.merged_rows).sum();
            let sessions: Vec<String> = outcomes.iter().map(|o| o.session.clone()).collect();

            print_summary(
                "Batch Complete",
                &[
                    ("Sessions root", sessions_root.display().to_string()),
                    ("Output directory", output_dir.display().to_string()),
                    ("Sessions processed", outcomes.len().to_string()),
                    ("Total merged rows", total_rows.to_string()),
                    ("Sessions", sessions.join(", ")),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Batch processing failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
