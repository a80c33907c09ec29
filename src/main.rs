mod audio;
mod batch;
mod cli;
mod config;
mod export;
mod lights;
mod simulate;
mod spectrum;
mod thresholds;
mod tracks;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use batch::AnalyzeOptions;
use cli::{Cli, Command, DEFAULT_BUCKETS};
use config::Config;
use simulate::Output;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Command::Analyze(mut args) => {
            // Config values apply only when the CLI is at its default
            if args.buckets == DEFAULT_BUCKETS {
                args.buckets = config.analysis.bucket_count;
            }
            if args.buckets == 0 {
                anyhow::bail!("Bucket count must be at least 1");
            }

            let tracks = tracks::collect_tracks(&args.targets, &config.analysis.extensions);
            if tracks.is_empty() {
                anyhow::bail!("No tracks found (extensions: {:?})", config.analysis.extensions);
            }

            let cancel = Arc::new(AtomicBool::new(false));
            {
                let cancel = cancel.clone();
                ctrlc::set_handler(move || {
                    if batch::request_cancel(&cancel) {
                        log::error!("Interrupted twice, exiting now");
                        std::process::exit(130);
                    }
                    log::warn!("Interrupted, stopping after the current chunk (Ctrl-C again to force)...");
                })
                .context("Failed to install Ctrl-C handler")?;
            }

            let opts = AnalyzeOptions {
                metadata_only: args.metadata_only,
                total_buckets: args.buckets,
                min_freq: config.analysis.min_freq,
            };
            log::info!(
                "Analysing {} track(s): {} buckets, min frequency {} Hz{}",
                tracks.len(),
                opts.total_buckets,
                opts.min_freq,
                if opts.metadata_only { " (metadata only)" } else { "" }
            );

            let summary = batch::run_batch(&tracks, &opts, args.jobs, &cancel)?;
            log::info!(
                "Done: {} analysed, {} metadata only, {} failed",
                summary.analyzed,
                summary.metadata_only,
                summary.failed
            );
            if summary.cancelled {
                anyhow::bail!("Aborted.");
            }
        }
        Command::InsertThresholds(args) => {
            let summary = thresholds::insert_thresholds(&args.music_dir, &args.thresholds_dir)?;
            log::info!(
                "Thresholds: {} updated, {} without a threshold file, {} failed",
                summary.updated,
                summary.skipped,
                summary.failed
            );
        }
        Command::Simulate(args) => {
            let output = if args.commands {
                Output::Commands
            } else {
                Output::Board
            };
            simulate::simulate_track(&args.track, &config.lights, output, !args.fast)?;
        }
    }

    Ok(())
}
