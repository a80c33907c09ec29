use super::SILENCE_DB;

/// Histories shorter than this are not trimmed.
pub const MIN_TRIMMED_HISTORY: usize = 10;

/// Which calibration rule produced a threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationPolicy {
    /// Bottom tenth discarded, median of the rest.
    Trimmed,
    /// Fewer than `MIN_TRIMMED_HISTORY` values: median of everything.
    Untrimmed,
    /// No values at all: the silence floor.
    Empty,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Threshold {
    pub value: f64,
    pub policy: CalibrationPolicy,
}

/// Median of the loudest ~90% of a bucket's history.
pub fn calibrate(history: &[f64]) -> Threshold {
    if history.is_empty() {
        return Threshold {
            value: SILENCE_DB,
            policy: CalibrationPolicy::Empty,
        };
    }

    let mut sorted = history.to_vec();
    sorted.sort_by(f64::total_cmp);

    let trim = sorted.len() / 10;
    let remaining = &sorted[trim..];
    Threshold {
        value: remaining[remaining.len() / 2],
        policy: if sorted.len() < MIN_TRIMMED_HISTORY {
            CalibrationPolicy::Untrimmed
        } else {
            CalibrationPolicy::Trimmed
        },
    }
}

/// Accumulates every chunk's bucket amplitudes for one channel.
#[derive(Debug)]
pub struct AmplitudeHistory {
    buckets: Vec<Vec<f64>>,
}

impl AmplitudeHistory {
    pub fn new(bucket_count: usize) -> Self {
        Self {
            buckets: vec![Vec::new(); bucket_count],
        }
    }

    pub fn record(&mut self, amplitudes: &[f64]) {
        debug_assert_eq!(amplitudes.len(), self.buckets.len());
        for (history, &amplitude) in self.buckets.iter_mut().zip(amplitudes) {
            history.push(amplitude);
        }
    }

    /// Consumes the history and calibrates one threshold per bucket.
    pub fn thresholds(self) -> Vec<Threshold> {
        self.buckets.iter().map(|h| calibrate(h)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundred_values_trim_ten_and_take_median() {
        let history: Vec<f64> = (0..100).map(|v| v as f64).collect();
        let t = calibrate(&history);
        // remaining = 10..=99, index 45 -> 55
        assert_eq!(t.value, 55.0);
        assert_eq!(t.policy, CalibrationPolicy::Trimmed);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let ascending: Vec<f64> = (0..100).map(|v| v as f64 * 0.5 - 20.0).collect();
        let mut descending = ascending.clone();
        descending.reverse();
        let mut shuffled = ascending.clone();
        // Deterministic permutation: 37 is coprime with 100.
        for i in 0..shuffled.len() {
            shuffled.swap(i, (i * 37 + 11) % 100);
        }
        let expected = calibrate(&ascending);
        assert_eq!(calibrate(&descending), expected);
        assert_eq!(calibrate(&shuffled), expected);
    }

    #[test]
    fn short_history_skips_trimming() {
        let t = calibrate(&[5.0, 1.0, 3.0]);
        assert_eq!(t.value, 3.0);
        assert_eq!(t.policy, CalibrationPolicy::Untrimmed);

        let t = calibrate(&[7.0]);
        assert_eq!(t.value, 7.0);
        assert_eq!(t.policy, CalibrationPolicy::Untrimmed);
    }

    #[test]
    fn ten_values_trim_one() {
        let history: Vec<f64> = (0..10).map(|v| v as f64).collect();
        let t = calibrate(&history);
        // remaining = 1..=9, index 4 -> 5
        assert_eq!(t.value, 5.0);
        assert_eq!(t.policy, CalibrationPolicy::Trimmed);
    }

    #[test]
    fn empty_history_falls_back_to_silence() {
        let t = calibrate(&[]);
        assert_eq!(t.value, SILENCE_DB);
        assert_eq!(t.policy, CalibrationPolicy::Empty);
    }

    #[test]
    fn history_records_per_bucket() {
        let mut history = AmplitudeHistory::new(2);
        for i in 0..20 {
            history.record(&[i as f64, -(i as f64)]);
        }
        assert_eq!(history.buckets[0].len(), 20);
        let thresholds = history.thresholds();
        // [0..20) -> trim 2 -> 2..=19, index 9 -> 11
        assert_eq!(thresholds[0].value, 11.0);
        // [-19..=0] -> trim 2 -> -17..=0, index 9 -> -8
        assert_eq!(thresholds[1].value, -8.0);
    }
}
