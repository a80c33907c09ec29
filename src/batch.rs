use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::audio::decode::DecodedStream;
use crate::export::metadata::TrackMetadata;
use crate::export::series::CsvSeriesWriter;
use crate::export::{metadata_path, series_path};
use crate::spectrum::pipeline::{analyze_track, TrackCalibration};
use crate::spectrum::SpectrumError;

#[derive(Clone, Copy, Debug)]
pub struct AnalyzeOptions {
    pub metadata_only: bool,
    pub total_buckets: usize,
    pub min_freq: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackOutcome {
    Analyzed,
    MetadataOnly,
    /// Spectral analysis failed; tag metadata was still written.
    TagsOnly,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub analyzed: usize,
    pub metadata_only: usize,
    pub failed: usize,
    pub cancelled: bool,
}

pub fn is_cancelled(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<SpectrumError>(),
        Some(SpectrumError::Cancelled)
    )
}

/// Raises the cancel flag. Returns true if it was already raised, meaning the
/// user asked twice and wants out now.
pub fn request_cancel(cancel: &AtomicBool) -> bool {
    cancel.swap(true, Ordering::SeqCst)
}

/// Decodes one track, writes its time series and metadata.
pub fn process_track(path: &Path, opts: &AnalyzeOptions, cancel: &AtomicBool) -> Result<TrackOutcome> {
    let mut stream = DecodedStream::open(path)?;
    let meta = TrackMetadata::from_tags(stream.tags().clone());
    let meta_path = metadata_path(path);

    if opts.metadata_only {
        meta.save(&meta_path)?;
        return Ok(TrackOutcome::MetadataOnly);
    }

    match write_series(&mut stream, path, opts, cancel) {
        Ok(calibration) => {
            log::info!(
                "{}: {} rows, {:.2} ms per row",
                path.display(),
                calibration.rows,
                calibration.ms_per_line
            );
            meta.with_calibration(&calibration).save(&meta_path)?;
            Ok(TrackOutcome::Analyzed)
        }
        Err(err) if is_cancelled(&err) => Err(err),
        Err(err) => {
            log::error!("Spectral analysis failed for {}: {:#}", path.display(), err);
            meta.save(&meta_path)?;
            Ok(TrackOutcome::TagsOnly)
        }
    }
}

fn write_series(
    stream: &mut DecodedStream,
    path: &Path,
    opts: &AnalyzeOptions,
    cancel: &AtomicBool,
) -> Result<TrackCalibration> {
    let mut writer = CsvSeriesWriter::create(&series_path(path))?;
    let calibration = analyze_track(stream, &mut writer, opts.total_buckets, opts.min_freq, cancel)?;
    writer.commit()?;
    Ok(calibration)
}

/// Processes every track, `jobs` at a time. A failing track is logged and
/// the rest continue; cancellation stops tracks that haven't started.
pub fn run_batch(
    tracks: &[PathBuf],
    opts: &AnalyzeOptions,
    jobs: usize,
    cancel: &AtomicBool,
) -> Result<BatchSummary> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let pb = ProgressBar::new(tracks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tracks ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let results: Vec<Result<TrackOutcome>> = pool.install(|| {
        tracks
            .par_iter()
            .map(|path| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(SpectrumError::Cancelled.into());
                }
                log::info!("Processing {}...", path.display());
                let result = process_track(path, opts, cancel);
                pb.inc(1);
                result
            })
            .collect()
    });

    pb.finish_and_clear();

    let mut summary = BatchSummary::default();
    for (path, result) in tracks.iter().zip(results) {
        match result {
            Ok(TrackOutcome::Analyzed) => summary.analyzed += 1,
            Ok(TrackOutcome::MetadataOnly) => summary.metadata_only += 1,
            Ok(TrackOutcome::TagsOnly) => summary.failed += 1,
            Err(err) if is_cancelled(&err) => summary.cancelled = true,
            Err(err) => {
                log::error!("{}: {:#}", path.display(), err);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}
