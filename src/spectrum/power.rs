use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::topology::BucketTopology;
use super::SILENCE_DB;

/// Per-bin log power, floored so silent bins stay finite.
pub fn power_db(bin: Complex<f64>) -> f64 {
    (10.0 * bin.norm_sqr().log10()).max(SILENCE_DB)
}

/// Runs one channel's FFT and folds the log power into buckets.
pub struct PowerEstimator {
    topology: Arc<BucketTopology>,
    fft: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
    power: Vec<f64>,
    leftover_chunks: usize,
}

impl PowerEstimator {
    pub fn new(topology: Arc<BucketTopology>, planner: &mut FftPlanner<f64>) -> Self {
        let n = topology.samples_per_fft;
        let fft = planner.plan_fft_forward(n);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            buffer: vec![Complex::new(0.0, 0.0); n],
            power: Vec::with_capacity(topology.real_fft_outputs),
            topology,
            fft,
            scratch,
            leftover_chunks: 0,
        }
    }

    /// Bucket amplitudes (mean dB power) for one channel of one chunk.
    pub fn estimate(&mut self, samples: &[f64]) -> Vec<f64> {
        let n = self.topology.samples_per_fft;
        debug_assert_eq!(samples.len(), n);

        for (slot, &s) in self.buffer.iter_mut().zip(samples) {
            *slot = Complex::new(s, 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        // Skip DC; keep bins 1..=N/2.
        self.power.clear();
        self.power.extend(
            self.buffer[1..=self.topology.real_fft_outputs]
                .iter()
                .map(|&bin| power_db(bin)),
        );

        let mut amplitudes = Vec::with_capacity(self.topology.bucket_count());
        let mut last = 0;
        for &count in &self.topology.freq_counts {
            let amplitude = if count == 0 {
                SILENCE_DB
            } else {
                self.power[last..last + count].iter().sum::<f64>() / count as f64
            };
            amplitudes.push(amplitude);
            last += count;
        }

        let leftover = self.power.len() - last;
        if leftover > 0 {
            self.leftover_chunks += 1;
            if self.leftover_chunks == 1 {
                log::warn!(
                    "{} frequencies left after sorting {} frequencies into {} buckets",
                    leftover,
                    self.power.len(),
                    self.topology.bucket_count()
                );
            } else {
                log::debug!("{} leftover frequencies ignored", leftover);
            }
        }

        amplitudes
    }

    /// Chunks that had power values no bucket could take.
    pub fn leftover_chunks(&self) -> usize {
        self.leftover_chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::topology::{bin_frequency, TopologyParams};

    fn estimator(rate: u32, buckets: usize) -> PowerEstimator {
        let topo = BucketTopology::build(rate, TopologyParams::new(buckets)).unwrap();
        PowerEstimator::new(Arc::new(topo), &mut FftPlanner::new())
    }

    fn sine(freq: f64, rate: u32, len: usize, amplitude: f64) -> Vec<f64> {
        (0..len)
            .map(|i| {
                amplitude * (2.0 * std::f64::consts::PI * freq * i as f64 / rate as f64).sin()
            })
            .collect()
    }

    #[test]
    fn silence_is_finite_and_floored() {
        let mut est = estimator(44_100, 16);
        let silence = vec![0.0; est.topology.samples_per_fft];
        let amps = est.estimate(&silence);
        assert_eq!(amps.len(), 16);
        for &a in &amps {
            assert!(a.is_finite());
            assert_eq!(a, SILENCE_DB);
        }
        assert_eq!(est.estimate(&silence), amps);
    }

    #[test]
    fn power_db_of_zero_is_floor() {
        assert_eq!(power_db(Complex::new(0.0, 0.0)), SILENCE_DB);
        assert!((power_db(Complex::new(10.0, 0.0)) - 20.0).abs() < 1e-12);
        assert!((power_db(Complex::new(3.0, 4.0)) - 20.0 * 5f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn sine_peaks_in_owning_bucket() {
        let rate = 8_000;
        let mut est = estimator(rate, 8);
        let n = est.topology.samples_per_fft;
        // Exact bin frequencies: low, mid and high end of the spectrum.
        for bin in [3usize, 25, 150] {
            let freq = bin_frequency(bin, rate, n);
            let amps = est.estimate(&sine(freq, rate, n, 10_000.0));
            let peak = amps
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap();
            let expected = est.topology.bucket_for_frequency(freq).unwrap();
            assert_eq!(peak, expected, "freq={} amps={:?}", freq, amps);
        }
    }

    #[test]
    fn sine_peaks_differ_across_spectrum() {
        let rate = 8_000;
        let topo = BucketTopology::build(rate, TopologyParams::new(8)).unwrap();
        let n = topo.samples_per_fft;
        let buckets: Vec<usize> = [3usize, 25, 150]
            .iter()
            .map(|&bin| topo.bucket_for_frequency(bin_frequency(bin, rate, n)).unwrap())
            .collect();
        assert!(buckets[0] < buckets[1] && buckets[1] < buckets[2]);
    }

    #[test]
    fn nyquist_leftover_stays_out_of_every_bucket() {
        let mut est = estimator(8_000, 4);
        let topo = est.topology.clone();
        assert_eq!(topo.dropped_bins, 1);
        assert_eq!(topo.assigned_bins() + 1, topo.real_fft_outputs);

        // Alternating samples put all the energy in the Nyquist bin.
        let nyquist: Vec<f64> = (0..topo.samples_per_fft)
            .map(|i| if i % 2 == 0 { 10_000.0 } else { -10_000.0 })
            .collect();
        assert_eq!(est.leftover_chunks(), 0);
        let amps = est.estimate(&nyquist);
        assert_eq!(est.leftover_chunks(), 1);
        assert_eq!(amps, vec![SILENCE_DB; 4]);

        est.estimate(&nyquist);
        assert_eq!(est.leftover_chunks(), 2);
    }

    #[test]
    fn bucket_means_cover_assigned_bins_only() {
        let mut est = estimator(44_100, 32);
        let n = est.topology.samples_per_fft;
        let noise: Vec<f64> = (0..n).map(|i| ((i * 7919) % 2000) as f64 - 1000.0).collect();
        let amps = est.estimate(&noise);
        assert_eq!(amps.len(), 32);
        for (&a, &count) in amps.iter().zip(&est.topology.freq_counts) {
            assert!(a.is_finite());
            if count == 0 {
                assert_eq!(a, SILENCE_DB);
            }
        }
    }
}
