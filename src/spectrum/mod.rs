pub mod assembler;
pub mod labels;
pub mod pipeline;
pub mod power;
pub mod threshold;
pub mod topology;

use thiserror::Error;

/// Amplitude reported for silence and for buckets that own no bins (dB).
pub const SILENCE_DB: f64 = -100.0;

/// 16-bit PCM, little-endian.
pub const BYTES_PER_SAMPLE: usize = 2;

#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(u32),
    #[error("bucket count must be at least 1, got {0}")]
    InvalidBucketCount(usize),
    #[error("channel count must be at least 1")]
    NoChannels,
    #[error("minimum frequency {min_freq} Hz is outside (0, Nyquist) for {sample_rate} Hz audio")]
    MinFreqOutOfRange { min_freq: f64, sample_rate: u32 },
    #[error("decoder produced {found} channels, track declares {expected}")]
    ChannelMismatch { expected: usize, found: usize },
    #[error("analysis cancelled")]
    Cancelled,
}
