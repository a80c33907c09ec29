use super::BYTES_PER_SAMPLE;

/// Re-chunks arbitrarily sized decoder fragments into fixed, window-aligned chunks.
#[derive(Debug)]
pub struct ChunkAssembler {
    buffer: Vec<u8>,
    position: usize,
    bytes_per_chunk: usize,
}

impl ChunkAssembler {
    pub fn new(samples_per_fft: usize, channel_count: usize) -> Self {
        let bytes_per_chunk = samples_per_fft * channel_count * BYTES_PER_SAMPLE;
        Self {
            buffer: Vec::with_capacity(bytes_per_chunk * 2),
            position: 0,
            bytes_per_chunk,
        }
    }

    pub fn bytes_per_chunk(&self) -> usize {
        self.bytes_per_chunk
    }

    pub fn push(&mut self, fragment: &[u8]) {
        // Reclaim consumed bytes before growing.
        if self.position > 0 {
            self.buffer.drain(..self.position);
            self.position = 0;
        }
        self.buffer.extend_from_slice(fragment);
    }

    /// Next full chunk, if one is buffered.
    pub fn next_chunk(&mut self) -> Option<&[u8]> {
        if self.buffered() < self.bytes_per_chunk {
            return None;
        }
        let start = self.position;
        self.position += self.bytes_per_chunk;
        Some(&self.buffer[start..self.position])
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// Ends the stream. Returns how many trailing bytes were dropped unanalysed.
    pub fn finish(self) -> usize {
        self.buffered()
    }
}

/// Splits one interleaved i16 LE chunk into per-channel sample sequences.
pub fn deinterleave(chunk: &[u8], channel_count: usize) -> Vec<Vec<f64>> {
    let frames = chunk.len() / (BYTES_PER_SAMPLE * channel_count);
    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for (i, bytes) in chunk.chunks_exact(BYTES_PER_SAMPLE).enumerate() {
        let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
        channels[i % channel_count].push(sample as f64);
    }
    channels
}
