use super::SpectrumError;

/// Lowest frequency the analysis must be able to resolve, in Hz.
pub const DEFAULT_MIN_FREQ: f64 = 20.0;

/// Step used to nudge the top exponent past floating-point truncation.
const EXPONENT_NUDGE: f64 = 1e-8;

/// Inputs to the topology builder. Passed explicitly so two tracks with
/// different settings never share state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TopologyParams {
    pub min_freq: f64,
    pub bucket_count: usize,
}

#[cfg(test)]
impl TopologyParams {
    pub fn new(bucket_count: usize) -> Self {
        Self {
            min_freq: DEFAULT_MIN_FREQ,
            bucket_count,
        }
    }
}

/// Log-spaced partition of the FFT output for one (sample rate, bucket count) pair.
#[derive(Clone, Debug)]
pub struct BucketTopology {
    pub sample_rate: u32,
    pub min_freq: f64,
    pub max_freq: f64,
    /// Usable FFT outputs after the DC bin.
    pub real_fft_outputs: usize,
    pub samples_per_fft: usize,
    /// Ascending upper bound of each bucket, in Hz.
    pub upper_bounds: Vec<f64>,
    /// Number of consecutive FFT bins folded into each bucket.
    pub freq_counts: Vec<usize>,
    /// Bins at the top edge that matched no bucket.
    pub dropped_bins: usize,
    min_exponent: f64,
    exponent_step: f64,
}

impl BucketTopology {
    pub fn build(sample_rate: u32, params: TopologyParams) -> Result<Self, SpectrumError> {
        let TopologyParams {
            min_freq,
            bucket_count,
        } = params;

        if sample_rate == 0 {
            return Err(SpectrumError::InvalidSampleRate(sample_rate));
        }
        if bucket_count == 0 {
            return Err(SpectrumError::InvalidBucketCount(bucket_count));
        }
        let max_freq = sample_rate as f64 / 2.0;
        if !(min_freq > 0.0) || min_freq >= max_freq {
            return Err(SpectrumError::MinFreqOutOfRange {
                min_freq,
                sample_rate,
            });
        }

        // Smallest window that still resolves min_freq.
        let real_fft_outputs = (sample_rate as f64 / (2.0 * min_freq)).ceil() as usize;
        let samples_per_fft = 2 * real_fft_outputs;

        let min_exponent = min_freq.log2();
        let mut max_exponent = max_freq.log2();
        while max_exponent.exp2() < max_freq {
            max_exponent += EXPONENT_NUDGE;
        }

        let exponent_step = (max_exponent - min_exponent) / bucket_count as f64;
        let upper_bounds: Vec<f64> = (1..=bucket_count)
            .map(|n| (min_exponent + exponent_step * n as f64).exp2())
            .collect();

        let mut freq_counts = vec![0usize; bucket_count];
        let mut dropped_bins = 0;
        for bin in 1..=real_fft_outputs {
            let freq = bin_frequency(bin, sample_rate, samples_per_fft);
            match first_bucket_above(&upper_bounds, freq) {
                Some(bucket) => freq_counts[bucket] += 1,
                None => {
                    log::warn!(
                        "Frequency {:.3} Hz (bin {}) didn't match any bucket, dropping it",
                        freq,
                        bin
                    );
                    dropped_bins += 1;
                }
            }
        }

        let empty = freq_counts.iter().filter(|&&c| c == 0).count();
        if empty > 0 {
            log::warn!(
                "{} of {} buckets are narrower than the {:.2} Hz bin spacing and will stay silent",
                empty,
                bucket_count,
                sample_rate as f64 / samples_per_fft as f64
            );
        }

        let topology = Self {
            sample_rate,
            min_freq,
            max_freq,
            real_fft_outputs,
            samples_per_fft,
            upper_bounds,
            freq_counts,
            dropped_bins,
            min_exponent,
            exponent_step,
        };

        log::debug!(
            "Topology {}Hz x {} buckets: window={} samples, bins={}/{} assigned",
            sample_rate,
            bucket_count,
            samples_per_fft,
            topology.assigned_bins(),
            real_fft_outputs
        );

        Ok(topology)
    }

    pub fn bucket_count(&self) -> usize {
        self.upper_bounds.len()
    }

    /// Bins that were assigned to some bucket.
    pub fn assigned_bins(&self) -> usize {
        self.freq_counts.iter().sum()
    }

    /// Bucket that owns `freq`, using the same rule as bin assignment.
    #[cfg(test)]
    pub fn bucket_for_frequency(&self, freq: f64) -> Option<usize> {
        first_bucket_above(&self.upper_bounds, freq)
    }

    /// Geometric center of each bucket, used for column labels.
    pub fn center_frequencies(&self) -> Vec<f64> {
        (1..=self.bucket_count())
            .map(|n| (self.min_exponent + self.exponent_step * (n as f64 - 0.5)).exp2())
            .collect()
    }

    /// Playback time covered by one analysed chunk.
    pub fn ms_per_chunk(&self) -> f64 {
        self.samples_per_fft as f64 * 1000.0 / self.sample_rate as f64
    }
}

pub fn bin_frequency(bin: usize, sample_rate: u32, samples_per_fft: usize) -> f64 {
    bin as f64 * sample_rate as f64 / samples_per_fft as f64
}

fn first_bucket_above(upper_bounds: &[f64], freq: f64) -> Option<usize> {
    let idx = upper_bounds.partition_point(|&upper| upper <= freq.abs());
    (idx < upper_bounds.len()).then_some(idx)
}
