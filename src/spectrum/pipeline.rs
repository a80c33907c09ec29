use anyhow::Result;
use rustfft::FftPlanner;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::assembler::{deinterleave, ChunkAssembler};
use super::labels::{channel_labels, column_labels};
use super::power::PowerEstimator;
use super::threshold::{AmplitudeHistory, CalibrationPolicy};
use super::topology::{BucketTopology, TopologyParams};
use super::SpectrumError;

/// Interleaved 16-bit little-endian PCM, delivered in fragments of any size.
pub trait PcmSource {
    fn sample_rate(&self) -> u32;
    fn channel_count(&self) -> usize;
    /// Next fragment, or `None` once the stream is exhausted.
    fn next_fragment(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Receives the time series as it is produced.
pub trait SpectrumSink {
    fn begin(&mut self, labels: &[String]) -> Result<()>;
    fn write_row(&mut self, row: &[f64]) -> Result<()>;
}

/// End-of-track calibration handed to the exporter.
#[derive(Clone, Debug)]
pub struct TrackCalibration {
    pub ms_per_line: f64,
    /// Channel-major, bucket-ascending; same order as the time-series columns.
    pub thresholds: Vec<f64>,
    pub rows: usize,
    pub dropped_bytes: usize,
}

/// Buckets per channel when `total` is split across `channels`.
pub fn buckets_per_channel(total: usize, channels: usize) -> usize {
    (total / channels.max(1)).max(1)
}

pub fn analyze_track<S, K>(
    source: &mut S,
    sink: &mut K,
    total_buckets: usize,
    min_freq: f64,
    cancel: &AtomicBool,
) -> Result<TrackCalibration>
where
    S: PcmSource + ?Sized,
    K: SpectrumSink + ?Sized,
{
    let channels = source.channel_count();
    if channels == 0 {
        return Err(SpectrumError::NoChannels.into());
    }
    let params = TopologyParams {
        min_freq,
        bucket_count: buckets_per_channel(total_buckets, channels),
    };
    let topology = Arc::new(BucketTopology::build(source.sample_rate(), params)?);

    let mut planner = FftPlanner::new();
    let mut estimators: Vec<PowerEstimator> = (0..channels)
        .map(|_| PowerEstimator::new(topology.clone(), &mut planner))
        .collect();
    let mut histories: Vec<AmplitudeHistory> = (0..channels)
        .map(|_| AmplitudeHistory::new(params.bucket_count))
        .collect();

    let labels = column_labels(&channel_labels(channels), &topology.center_frequencies());
    sink.begin(&labels)?;

    let mut assembler = ChunkAssembler::new(topology.samples_per_fft, channels);
    log::debug!(
        "{} Hz, {} channel(s): {} buckets per channel, {} bytes per chunk",
        topology.sample_rate,
        channels,
        params.bucket_count,
        assembler.bytes_per_chunk()
    );
    let mut row = Vec::with_capacity(labels.len());
    let mut rows = 0;

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(SpectrumError::Cancelled.into());
        }
        let Some(fragment) = source.next_fragment()? else {
            break;
        };
        assembler.push(&fragment);

        while let Some(chunk) = assembler.next_chunk() {
            let per_channel = deinterleave(chunk, channels);
            row.clear();
            for ((samples, estimator), history) in per_channel
                .iter()
                .zip(estimators.iter_mut())
                .zip(histories.iter_mut())
            {
                let amplitudes = estimator.estimate(samples);
                history.record(&amplitudes);
                row.extend_from_slice(&amplitudes);
            }
            sink.write_row(&row)?;
            rows += 1;
        }
    }

    let dropped_bytes = assembler.finish();
    log::debug!("{} trailing bytes shorter than one window dropped", dropped_bytes);

    let leftover_chunks: usize = estimators.iter().map(PowerEstimator::leftover_chunks).sum();
    if leftover_chunks > 0 {
        log::warn!(
            "{} channel-chunks had power values outside every bucket",
            leftover_chunks
        );
    }

    let channel_names = channel_labels(channels);
    let mut thresholds = Vec::with_capacity(labels.len());
    for (name, history) in channel_names.iter().zip(histories) {
        let calibrated = history.thresholds();
        let degenerate = calibrated
            .iter()
            .filter(|t| t.policy != CalibrationPolicy::Trimmed)
            .count();
        if degenerate > 0 {
            log::warn!(
                "{}: {} of {} bucket thresholds calibrated from fewer than 10 chunks ({} chunks seen)",
                name,
                degenerate,
                calibrated.len(),
                rows
            );
        }
        thresholds.extend(calibrated.iter().map(|t| t.value));
    }

    Ok(TrackCalibration {
        ms_per_line: topology.ms_per_chunk(),
        thresholds,
        rows,
        dropped_bytes,
    })
}
