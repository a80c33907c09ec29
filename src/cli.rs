use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_BUCKETS: usize = 32;

#[derive(Parser, Debug)]
#[command(name = "spectrolight", about = "Calibrated per-band loudness for music-driven light shows")]
pub struct Cli {
    /// Config file (defaults to ./spectrolight.toml or the per-user config)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyse tracks and write <track>.csv and <track>.json next to each one
    Analyze(AnalyzeArgs),
    /// Replace metadata thresholds with values from per-track threshold files
    InsertThresholds(InsertThresholdsArgs),
    /// Replay an analysed track against its thresholds on a terminal light board
    Simulate(SimulateArgs),
}

#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// Audio files or directories to search recursively
    #[arg(required = true)]
    pub targets: Vec<PathBuf>,

    /// Only write tag metadata, skip spectral analysis
    #[arg(short, long)]
    pub metadata_only: bool,

    /// Total frequency buckets, split evenly across channels
    #[arg(short, long, default_value_t = DEFAULT_BUCKETS)]
    pub buckets: usize,

    /// Tracks analysed in parallel (0 = one per CPU)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,
}

#[derive(clap::Args, Debug)]
pub struct InsertThresholdsArgs {
    /// Directory searched recursively for track metadata (*.json)
    pub music_dir: PathBuf,

    /// Directory holding one threshold file per track, named after the track
    pub thresholds_dir: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct SimulateArgs {
    /// Analysed track (its .csv and .json are read)
    pub track: PathBuf,

    /// Don't pace playback in real time
    #[arg(long)]
    pub fast: bool,

    /// Print the raw controller commands instead of the light board
    #[arg(long)]
    pub commands: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_analyze() {
        let cli = Cli::parse_from(["spectrolight", "analyze", "-m", "-j", "4", "a.mp3", "music"]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert!(args.metadata_only);
        assert_eq!(args.jobs, 4);
        assert_eq!(args.buckets, DEFAULT_BUCKETS);
        assert_eq!(args.targets.len(), 2);
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["spectrolight", "simulate", "song.mp3", "--fast", "-c", "x.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Command::Simulate(SimulateArgs { fast: true, .. })));
    }
}
