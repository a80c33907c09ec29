use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::tags::{read_tags, TrackTags};
use crate::spectrum::pipeline::PcmSource;
use crate::spectrum::SpectrumError;

/// Streams one audio file as interleaved i16 LE fragments, one per decoded packet.
pub struct DecodedStream {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    tags: TrackTags,
}

impl DecodedStream {
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let mut probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .with_context(|| format!("Failed to probe audio format: {}", path.display()))?;

        let track = probed
            .format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .with_context(|| format!("No audio tracks found in {}", path.display()))?;

        let track_id = track.id;
        let channels = track.codec_params.channels.map_or(1, |c| c.count());
        let sample_rate = track
            .codec_params
            .sample_rate
            .with_context(|| format!("Unknown sample rate in {}", path.display()))?;
        let n_frames = track.codec_params.n_frames;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .with_context(|| format!("Failed to create audio decoder for {}", path.display()))?;

        let mut tags = read_tags(&mut probed);
        tags.duration = n_frames.map(|frames| frames as f64 / sample_rate as f64);

        log::debug!(
            "Opened {}: {}Hz, {} channel(s), {:?} frames",
            path.display(),
            sample_rate,
            channels,
            n_frames
        );

        Ok(Self {
            format: probed.format,
            decoder,
            track_id,
            sample_rate,
            channels,
            tags,
        })
    }

    pub fn tags(&self) -> &TrackTags {
        &self.tags
    }
}

impl PcmSource for DecodedStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn next_fragment(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(symphonia::core::errors::Error::DecodeError(err)) => {
                    log::debug!("Skipping undecodable packet: {}", err);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            if spec.channels.count() != self.channels {
                return Err(SpectrumError::ChannelMismatch {
                    expected: self.channels,
                    found: spec.channels.count(),
                }
                .into());
            }

            let mut sample_buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);

            let samples = sample_buf.samples();
            if samples.is_empty() {
                continue;
            }
            let bytes = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
            return Ok(Some(bytes));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    use crate::spectrum::pipeline::analyze_track;
    use crate::spectrum::pipeline::tests::VecSink;

    fn write_wav(path: &Path, rate: u32, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let t = i as f64 / rate as f64;
            let s = (12_000.0 * (2.0 * std::f64::consts::PI * 440.0 * t).sin()) as i16;
            for _ in 0..channels {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn streams_every_sample_of_a_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 8_000, 2, 5_000);

        let mut stream = DecodedStream::open(&path).unwrap();
        assert_eq!(stream.sample_rate(), 8_000);
        assert_eq!(stream.channel_count(), 2);
        let duration = stream.tags().duration.unwrap();
        assert!((duration - 0.625).abs() < 1e-9);

        let mut total = 0;
        while let Some(fragment) = stream.next_fragment().unwrap() {
            assert_eq!(fragment.len() % 4, 0);
            total += fragment.len();
        }
        assert_eq!(total, 5_000 * 2 * 2);
    }

    #[test]
    fn decoded_wav_drives_the_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        // 12 full 400-sample windows plus a partial one.
        write_wav(&path, 8_000, 1, 400 * 12 + 150);

        let mut stream = DecodedStream::open(&path).unwrap();
        let mut sink = VecSink::default();
        let cal = analyze_track(&mut stream, &mut sink, 8, 20.0, &AtomicBool::new(false)).unwrap();
        assert_eq!(cal.rows, 12);
        assert_eq!(cal.dropped_bytes, 300);
        assert_eq!(cal.thresholds.len(), 8);
        assert_eq!(sink.labels[0].split(' ').next(), Some("Channel"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = DecodedStream::open(Path::new("/nonexistent/track.mp3"))
            .err()
            .unwrap();
        assert!(format!("{:#}", err).contains("/nonexistent/track.mp3"));
    }
}
