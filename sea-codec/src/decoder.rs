//! File-level decoding: parse the container header, then walk the chunk
//! grid until the declared frame count (or end of input for streams).

use crate::byteio::Reader;
use crate::chunk::{ChunkDecoder, is_end_marker};
use crate::error::SeaError;
use crate::header::FileHeader;
use crate::lms::LMS_STATE_BYTES;

/// A fully decoded SEA file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: u8,
    /// Per-channel frame count actually decoded.
    pub frames: u32,
    /// Interleaved samples; frame `k` occupies `samples[k*ch..(k+1)*ch]`.
    pub samples: Vec<i16>,
    /// Raw metadata blob, newline-separated `key=value` pairs.
    pub metadata: String,
}

/// Decode a complete SEA file. Fail-fast: the first malformed chunk aborts
/// with its error. Use [`SeaDecoder`] to keep the samples decoded before a
/// failure.
pub fn decode(bytes: &[u8]) -> Result<DecodedAudio, SeaError> {
    let mut decoder = SeaDecoder::new(bytes)?;
    let mut samples = Vec::new();
    while let Some(chunk) = decoder.next_chunk() {
        samples.extend_from_slice(&chunk?);
    }
    let header = decoder.header();
    let frames = (samples.len() / header.channels as usize) as u32;
    Ok(DecodedAudio {
        sample_rate: header.sample_rate,
        channels: header.channels,
        frames,
        samples,
        metadata: header.metadata.clone(),
    })
}

/// Incremental decoder over a byte slice; yields one chunk of PCM at a
/// time so callers keep everything decoded before an error.
pub struct SeaDecoder<'a> {
    data: &'a [u8],
    header: FileHeader,
    chunks: ChunkDecoder,
    /// `None` while streaming (`total_frames = 0`).
    frames_remaining: Option<u64>,
    failed: bool,
}

impl<'a> SeaDecoder<'a> {
    /// Parse and validate the container header; chunks decode lazily in
    /// [`SeaDecoder::next_chunk`].
    pub fn new(bytes: &'a [u8]) -> Result<Self, SeaError> {
        let mut reader = Reader::new(bytes);
        let header = FileHeader::read_from(&mut reader)?;
        if (header.chunk_size as usize) < 4 + LMS_STATE_BYTES * header.channels as usize {
            return Err(SeaError::ParamOutOfRange(
                "chunk_size too small for declared contents",
            ));
        }
        tracing::debug!(
            "sea header: {} channels, {} Hz, {} frames per {} byte chunk, total {}",
            header.channels,
            header.sample_rate,
            header.frames_per_chunk,
            header.chunk_size,
            header.total_frames
        );
        let chunks = ChunkDecoder::new(header.channels);
        let frames_remaining = (header.total_frames != 0).then_some(header.total_frames as u64);
        Ok(Self {
            data: reader.rest(),
            header,
            chunks,
            frames_remaining,
            failed: false,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Decode the next chunk's PCM. `None` marks a clean end of stream; an
    /// error ends decoding and later calls return `None`.
    pub fn next_chunk(&mut self) -> Option<Result<Vec<i16>, SeaError>> {
        if self.failed || self.frames_remaining == Some(0) {
            return None;
        }
        if self.data.is_empty() {
            return match self.frames_remaining {
                // streaming mode ends at EOF
                None => None,
                Some(_) => {
                    self.failed = true;
                    Some(Err(SeaError::Truncated))
                }
            };
        }

        let chunk_size = self.header.chunk_size as usize;
        if self.data.len() < chunk_size {
            self.failed = true;
            return Some(Err(SeaError::Truncated));
        }
        let bytes = &self.data[..chunk_size];
        if self.frames_remaining.is_none() && is_end_marker(bytes) {
            self.data = &[];
            return None;
        }

        let frames = match self.frames_remaining {
            Some(remaining) => remaining.min(self.header.frames_per_chunk as u64) as usize,
            None => self.header.frames_per_chunk as usize,
        };
        let mut samples = Vec::new();
        match self.chunks.decode_chunk(bytes, frames, &mut samples) {
            Ok(()) => {
                self.data = &self.data[chunk_size..];
                if let Some(remaining) = &mut self.frames_remaining {
                    *remaining -= frames as u64;
                }
                Some(Ok(samples))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
