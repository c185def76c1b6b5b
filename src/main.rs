//! carvision command-line interface
//!
//! Three subcommands cover the workflow: `train` the car classifier,
//! `remove-bg` to matte raw PNG shots, and `resize` to normalize JPEG crops.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use carvision::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use carvision::jobs::{JobReport, RemoveBackgroundJob, ResizeJob};
use carvision::model::MattingRemover;
use carvision::training::TrainingDriver;
use carvision::utils::logging::{init_logging, LogConfig};
use carvision::TrainConfig;

#[derive(Parser)]
#[command(name = "carvision")]
#[command(about = "Car image workflow: classifier training and batch image jobs")]
#[command(version)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the car classifier
    Train {
        /// Load the full configuration from a JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Training data directory (one subdirectory per class)
        #[arg(long)]
        train_dir: Option<PathBuf>,

        /// Test data directory for the final evaluation
        #[arg(long)]
        test_dir: Option<PathBuf>,

        /// Number of training epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Batch size
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Input resolution (square images)
        #[arg(long)]
        image_size: Option<usize>,

        /// Fraction of training samples held out for validation
        #[arg(long)]
        validation_rate: Option<f64>,

        /// Pretrained feature-extractor weights to warm-start from
        #[arg(long)]
        extractor_weights: Option<PathBuf>,

        /// Directory for the checkpoint and charts
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Remove the background from every PNG in a directory
    RemoveBg {
        /// Directory of PNG images
        input_dir: PathBuf,

        /// Matting network weights; untrained weights are used when omitted
        #[arg(short, long)]
        weights: Option<PathBuf>,
    },

    /// Resize every JPEG in a directory to a fixed resolution
    Resize {
        /// Directory of JPEG images
        input_dir: PathBuf,

        /// Output width
        #[arg(long, default_value_t = 256)]
        width: u32,

        /// Output height
        #[arg(long, default_value_t = 256)]
        height: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    init_logging(&log_config).map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Commands::Train {
            config,
            train_dir,
            test_dir,
            epochs,
            batch_size,
            image_size,
            validation_rate,
            extractor_weights,
            output,
            seed,
        } => {
            let mut train_config = match config {
                Some(path) => TrainConfig::load(&path)?,
                None => TrainConfig::default(),
            };

            if let Some(dir) = train_dir {
                train_config.train_dir = dir;
            }
            if let Some(dir) = test_dir {
                train_config.test_dir = dir;
            }
            if let Some(n) = epochs {
                train_config.epochs = n;
            }
            if let Some(n) = batch_size {
                train_config.batch_size = n;
            }
            if let Some(n) = image_size {
                train_config.image_size = n;
            }
            if let Some(r) = validation_rate {
                train_config.validation_rate = r;
            }
            if let Some(weights) = extractor_weights {
                train_config.extractor_weights = Some(weights);
            }
            if let Some(dir) = output {
                train_config.checkpoint_path = dir.join("model");
                train_config.chart_dir = dir.join("charts");
            }
            if let Some(s) = seed {
                train_config.seed = s;
            }

            run_train(train_config)
        }

        Commands::RemoveBg { input_dir, weights } => {
            println!(
                "{} ({})",
                "Removing backgrounds...".cyan().bold(),
                backend_name()
            );

            let remover = MattingRemover::<DefaultBackend>::from_checkpoint(
                weights.as_deref(),
                default_device(),
            )?;

            let job = RemoveBackgroundJob::new(&input_dir);
            let report = job.run(&remover)?;

            println!("  Output directory: {:?}", job.output_dir()?);
            print_report(&report);
            Ok(())
        }

        Commands::Resize {
            input_dir,
            width,
            height,
        } => {
            println!(
                "{} to {}x{}",
                "Resizing images...".cyan().bold(),
                width,
                height
            );

            let report = ResizeJob::with_size(&input_dir, width, height).run()?;
            print_report(&report);
            Ok(())
        }
    }
}

fn run_train(config: TrainConfig) -> Result<()> {
    println!("{}", "Training car classifier".green().bold());
    println!("  Backend:    {}", backend_name());
    println!("  Data:       {:?}", config.train_dir);
    println!("  Image size: {}", config.image_size);
    println!("  Batch size: {}", config.batch_size);
    println!("  Epochs:     {}", config.epochs);
    println!();

    let driver = TrainingDriver::<TrainingBackend>::new(config, default_device());
    let outcome = driver.run()?;

    println!();
    println!("{}", "Training complete".green().bold());
    println!(
        "  Best validation accuracy: {:.2}%",
        outcome.best_val_accuracy * 100.0
    );
    println!("  Checkpoint: {:?}", outcome.checkpoint_path);

    if let Some(test) = outcome.test {
        println!(
            "  Test: {:.2}% accuracy, {:.2}% top-2 ({} samples)",
            test.accuracy * 100.0,
            test.top2_accuracy * 100.0,
            test.samples
        );
    }

    Ok(())
}

fn print_report(report: &JobReport) {
    println!(
        "  {} {} processed, {} skipped",
        "Done:".green(),
        report.processed,
        report.skipped.len()
    );

    for (path, reason) in &report.skipped {
        println!("  {} {:?}: {}", "skipped".yellow(), path, reason);
    }
}
