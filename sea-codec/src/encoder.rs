//! File-level encoding: container header followed by a stream of
//! fixed-size chunks.

use crate::chunk::ChunkEncoder;
use crate::error::SeaError;
use crate::header::{FileHeader, normalize_metadata};
use crate::params::EncodeParams;

/// Encode a complete interleaved PCM stream into a SEA file.
///
/// `samples` must hold a whole number of frames (`len % channels == 0`).
/// The header records the exact frame count; the final chunk encodes the
/// remainder and is zero padded to `chunk_size` like every other chunk.
pub fn encode(
    samples: &[i16],
    sample_rate: u32,
    channels: u8,
    params: EncodeParams,
    metadata: &str,
) -> Result<Vec<u8>, SeaError> {
    if channels == 0 {
        return Err(SeaError::ParamOutOfRange("channels must be non-zero"));
    }
    if samples.len() % channels as usize != 0 {
        return Err(SeaError::ParamOutOfRange(
            "sample count is not a whole number of frames",
        ));
    }
    let frames = samples.len() / channels as usize;
    if frames > u32::MAX as usize {
        return Err(SeaError::ParamOutOfRange("too many frames for one file"));
    }

    let mut chunks = ChunkEncoder::new(channels, params)?;
    let header = FileHeader {
        channels,
        chunk_size: chunks.chunk_size() as u16,
        frames_per_chunk: params.frames_per_chunk,
        sample_rate,
        total_frames: frames as u32,
        metadata: normalize_metadata(metadata)?,
    };

    let mut out = Vec::new();
    header.write_to(&mut out);
    let chunk_samples = params.frames_per_chunk as usize * channels as usize;
    for chunk in samples.chunks(chunk_samples) {
        out.extend_from_slice(&chunks.encode_chunk(chunk)?);
    }

    tracing::debug!(
        "encoded {} frames x {} channels into {} bytes",
        frames,
        channels,
        out.len()
    );
    Ok(out)
}

/// Incremental encoder for live streams.
///
/// The emitted header declares `total_frames = 0`, so decoders read until
/// end of input. Every chunk is full; [`SeaEncoder::finish`] pads the
/// buffered tail with silence to fill the last chunk.
pub struct SeaEncoder {
    header: FileHeader,
    chunks: ChunkEncoder,
    pending: Vec<i16>,
    header_written: bool,
}

impl SeaEncoder {
    pub fn new(
        sample_rate: u32,
        channels: u8,
        params: EncodeParams,
        metadata: &str,
    ) -> Result<Self, SeaError> {
        if channels == 0 {
            return Err(SeaError::ParamOutOfRange("channels must be non-zero"));
        }
        let chunks = ChunkEncoder::new(channels, params)?;
        let header = FileHeader {
            channels,
            chunk_size: chunks.chunk_size() as u16,
            frames_per_chunk: params.frames_per_chunk,
            sample_rate,
            total_frames: 0,
            metadata: normalize_metadata(metadata)?,
        };
        Ok(Self {
            header,
            chunks,
            pending: Vec::new(),
            header_written: false,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Buffer samples and return whatever became encodable: the container
    /// header on the first call, then one chunk per `frames_per_chunk`
    /// buffered frames.
    pub fn push(&mut self, samples: &[i16]) -> Result<Vec<u8>, SeaError> {
        let mut out = Vec::new();
        if !self.header_written {
            self.header.write_to(&mut out);
            self.header_written = true;
        }
        self.pending.extend_from_slice(samples);

        let chunk_samples =
            self.header.frames_per_chunk as usize * self.header.channels as usize;
        while self.pending.len() >= chunk_samples {
            let rest = self.pending.split_off(chunk_samples);
            let chunk = std::mem::replace(&mut self.pending, rest);
            out.extend_from_slice(&self.chunks.encode_chunk(&chunk)?);
        }
        Ok(out)
    }

    /// Flush the buffered tail, padded with silence to a whole chunk.
    pub fn finish(mut self) -> Result<Vec<u8>, SeaError> {
        let mut out = Vec::new();
        if !self.header_written {
            self.header.write_to(&mut out);
        }
        if !self.pending.is_empty() {
            let chunk_samples =
                self.header.frames_per_chunk as usize * self.header.channels as usize;
            self.pending.resize(chunk_samples, 0);
            out.extend_from_slice(&self.chunks.encode_chunk(&self.pending)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EncodeMode;

    fn tone(frames: usize) -> Vec<i16> {
        (0..frames)
            .map(|i| ((i as f32 * 0.02).sin() * 9000.0) as i16)
            .collect()
    }

    #[test]
    fn test_encode_rejects_bad_arguments() {
        let params = EncodeParams::default();
        assert_eq!(
            encode(&[0; 10], 44100, 0, params, ""),
            Err(SeaError::ParamOutOfRange("channels must be non-zero"))
        );
        assert_eq!(
            encode(&[0; 11], 44100, 2, params, ""),
            Err(SeaError::ParamOutOfRange(
                "sample count is not a whole number of frames"
            ))
        );

        let mut bad = EncodeParams::default();
        bad.residual_bits = 0;
        assert!(encode(&[0; 10], 44100, 1, bad, "").is_err());
    }

    #[test]
    fn test_encode_rejects_bad_metadata() {
        let params = EncodeParams::default();
        assert!(encode(&[0; 8], 8000, 1, params, "not a pair").is_err());
    }

    #[test]
    fn test_encode_is_deterministic() {
        let samples = tone(4000);
        let params = EncodeParams::default();
        let a = encode(&samples, 44100, 1, params, "k=v").unwrap();
        let b = encode(&samples, 44100, 1, params, "k=v").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_file_layout_is_header_plus_whole_chunks() {
        let params = EncodeParams {
            frames_per_chunk: 256,
            ..EncodeParams::default()
        };
        let samples = tone(1000); // 4 chunks, the last one short
        let encoded = encode(&samples, 44100, 1, params, "").unwrap();

        let chunk_size = u16::from_le_bytes([encoded[6], encoded[7]]) as usize;
        assert_eq!((encoded.len() - 22) % chunk_size, 0);
        assert_eq!((encoded.len() - 22) / chunk_size, 4);
    }

    #[test]
    fn test_streaming_chunks_match_one_shot() {
        let params = EncodeParams::default();
        let frames = params.frames_per_chunk as usize * 2;
        let samples = tone(frames);

        let one_shot = encode(&samples, 44100, 1, params, "").unwrap();

        let mut streaming = SeaEncoder::new(44100, 1, params, "").unwrap();
        let mut streamed = Vec::new();
        for piece in samples.chunks(777) {
            streamed.extend_from_slice(&streaming.push(piece).unwrap());
        }
        streamed.extend_from_slice(&streaming.finish().unwrap());

        // headers differ (total_frames 0 vs exact), chunk bytes must not
        assert_eq!(one_shot[22..], streamed[22..]);
    }

    #[test]
    fn test_vbr_encode_smoke() {
        let params = EncodeParams {
            mode: EncodeMode::Vbr,
            vbr_target_bps: 5.0,
            ..EncodeParams::default()
        };
        let samples = tone(12000);
        let encoded = encode(&samples, 44100, 1, params, "").unwrap();
        assert!(encoded.len() > 22);
    }
}
