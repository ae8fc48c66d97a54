//! Chunk-level codec: a fixed-size chunk carries its own predictor
//! snapshot, packed scale factors, optional VBR length codes and packed
//! residuals, zero padded to the chunk size.

use crate::bitio::{BitPacker, BitUnpacker, unpack};
use crate::byteio::{Reader, Writer};
use crate::dqt::{DequantTable, DqtCache};
use crate::error::SeaError;
use crate::lms::{LMS_STATE_BYTES, LmsState, clamp_i16};
use crate::params::{EncodeMode, EncodeParams};
use crate::rate::{RateControl, select_cbr, select_vbr};

pub(crate) const TYPE_CBR: u8 = 0x01;
pub(crate) const TYPE_VBR: u8 = 0x02;
pub(crate) const RESERVED: u8 = 0x5A;

/// Width of one slot's VBR length code.
const VBR_LENGTH_BITS: u32 = 2;

fn scale_factor_bytes(items: usize, scale_factor_bits: u8) -> usize {
    (items * scale_factor_bits as usize).div_ceil(8)
}

fn vbr_length_bytes(items: usize) -> usize {
    (items * VBR_LENGTH_BITS as usize).div_ceil(8)
}

/// A chunk whose 4-byte header is all zero ends a stream that declared
/// `total_frames = 0`.
pub(crate) fn is_end_marker(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[..4] == [0, 0, 0, 0]
}

/// Encodes consecutive chunks of one stream; predictor state and the VBR
/// rate controller persist across calls.
pub(crate) struct ChunkEncoder {
    channels: usize,
    params: EncodeParams,
    chunk_size: usize,
    /// Candidate residual widths, ascending; a single entry in CBR mode.
    widths: Vec<u8>,
    tables: Vec<DequantTable>,
    rate: Option<RateControl>,
    lms: Vec<LmsState>,
    slot_targets: Vec<i16>,
}

impl ChunkEncoder {
    pub fn new(channels: u8, params: EncodeParams) -> Result<Self, SeaError> {
        params.validate()?;
        if channels == 0 {
            return Err(SeaError::ParamOutOfRange("channels must be non-zero"));
        }
        let ch = channels as usize;
        let fpc = params.frames_per_chunk as usize;
        let slots = fpc.div_ceil(params.scale_factor_frames as usize);
        let items = slots * ch;
        let fixed = 4 + LMS_STATE_BYTES * ch;
        let sf_bytes = scale_factor_bytes(items, params.scale_factor_bits);

        let (chunk_size, widths, rate) = match params.mode {
            EncodeMode::Cbr => {
                let residual_bytes = (fpc * ch * params.residual_bits as usize).div_ceil(8);
                let chunk_size = fixed + sf_bytes + residual_bytes;
                (chunk_size, vec![params.residual_bits], None)
            }
            EncodeMode::Vbr => {
                let widths: Vec<u8> = (params.residual_bits.saturating_sub(1)
                    ..=params.residual_bits + 2)
                    .filter(|&width| width >= 1 && width <= 8)
                    .collect();
                let chunk_size =
                    (params.vbr_target_bps * (fpc * ch) as f32 / 8.0).round() as usize;
                let min_residual_bytes = (fpc * ch * widths[0] as usize).div_ceil(8);
                let floor = fixed + sf_bytes + vbr_length_bytes(items) + min_residual_bytes;
                if chunk_size < floor {
                    return Err(SeaError::ParamOutOfRange(
                        "vbr_target_bps too low for the base residual width",
                    ));
                }
                let budget = ((chunk_size - fixed - sf_bytes - vbr_length_bytes(items)) * 8) as f64;
                let rate = RateControl::new(budget / (fpc * ch) as f64);
                (chunk_size, widths, Some(rate))
            }
        };
        if chunk_size > u16::MAX as usize {
            return Err(SeaError::EncodeOverflow);
        }

        let tables = widths
            .iter()
            .map(|&width| DequantTable::new(params.scale_factor_bits, width))
            .collect();
        Ok(Self {
            channels: ch,
            params,
            chunk_size,
            widths,
            tables,
            rate,
            lms: vec![LmsState::new(); ch],
            slot_targets: Vec::with_capacity(params.scale_factor_frames as usize),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Encode up to `frames_per_chunk` frames of interleaved samples into
    /// one chunk of exactly `chunk_size` bytes.
    pub fn encode_chunk(&mut self, samples: &[i16]) -> Result<Vec<u8>, SeaError> {
        let ch = self.channels;
        debug_assert_eq!(samples.len() % ch, 0);
        let frames = samples.len() / ch;
        debug_assert!(frames >= 1 && frames <= self.params.frames_per_chunk as usize);

        let sf_frames = self.params.scale_factor_frames as usize;
        let sf_bits = self.params.scale_factor_bits;
        let base_bits = self.params.residual_bits;
        let slots = frames.div_ceil(sf_frames);
        let items = slots * ch;

        let mut out = Vec::with_capacity(self.chunk_size);
        let mut writer = Writer::new(&mut out);
        writer.write_u8(match self.params.mode {
            EncodeMode::Cbr => TYPE_CBR,
            EncodeMode::Vbr => TYPE_VBR,
        });
        writer.write_u8((sf_bits << 4) | base_bits);
        writer.write_u8(self.params.scale_factor_frames);
        writer.write_u8(RESERVED);
        for state in self.lms.iter_mut() {
            // snapshot through the wire narrowing so the decoder restores
            // exactly the state the encoder keeps using
            *state = state.narrowed();
            state.write_to(&mut writer);
        }

        let mut sf_packer = BitPacker::new();
        let mut length_packer = BitPacker::new();
        let mut residual_packer = BitPacker::new();

        let budget_bits = if self.rate.is_some() {
            let sections =
                4 + LMS_STATE_BYTES * ch + scale_factor_bytes(items, sf_bits) + vbr_length_bytes(items);
            ((self.chunk_size - sections) * 8) as u64
        } else {
            0
        };
        if let Some(rate) = &mut self.rate {
            rate.begin_chunk();
        }

        let total_payload = (frames * ch) as u64;
        let mut coded = 0u64;
        for slot in 0..slots {
            let slot_start = slot * sf_frames;
            let slot_end = (slot_start + sf_frames).min(frames);
            for channel in 0..ch {
                self.slot_targets.clear();
                self.slot_targets
                    .extend((slot_start..slot_end).map(|frame| samples[frame * ch + channel]));
                let slot_samples = self.slot_targets.len() as u64;

                let selection = match &mut self.rate {
                    None => select_cbr(&self.lms[channel], &self.tables[0], &self.slot_targets),
                    Some(rate) => {
                        let remaining = total_payload - coded - slot_samples;
                        let selection = select_vbr(
                            &self.lms[channel],
                            &self.widths,
                            &self.tables,
                            &self.slot_targets,
                            rate,
                            budget_bits,
                            remaining,
                        )
                        .ok_or(SeaError::EncodeOverflow)?;
                        rate.commit(selection.width, slot_samples);
                        length_packer
                            .write((selection.width + 1 - base_bits) as u32, VBR_LENGTH_BITS);
                        selection
                    }
                };

                sf_packer.write(selection.scale_factor as u32, sf_bits as u32);
                for &code in &selection.codes {
                    residual_packer.write(code as u32, selection.width as u32);
                }
                self.lms[channel] = selection.state;
                coded += slot_samples;
            }
        }

        out.extend_from_slice(&sf_packer.finish());
        if self.params.mode == EncodeMode::Vbr {
            out.extend_from_slice(&length_packer.finish());
        }
        out.extend_from_slice(&residual_packer.finish());
        if out.len() > self.chunk_size {
            return Err(SeaError::EncodeOverflow);
        }
        out.resize(self.chunk_size, 0);

        tracing::trace!(
            "encoded {} frames into {} byte chunk ({} scale factor slots)",
            frames,
            self.chunk_size,
            slots
        );
        Ok(out)
    }
}

/// Decodes consecutive chunks of one stream, restoring predictor state
/// from each chunk header.
pub(crate) struct ChunkDecoder {
    channels: usize,
    cache: DqtCache,
    lms: Vec<LmsState>,
}

impl ChunkDecoder {
    pub fn new(channels: u8) -> Self {
        Self {
            channels: channels as usize,
            cache: DqtCache::new(),
            lms: vec![LmsState::new(); channels as usize],
        }
    }

    /// Decode one chunk into `frames` interleaved frames appended to `out`.
    pub fn decode_chunk(
        &mut self,
        bytes: &[u8],
        frames: usize,
        out: &mut Vec<i16>,
    ) -> Result<(), SeaError> {
        let ch = self.channels;
        let mut reader = Reader::new(bytes);

        let chunk_type = reader.read_u8()?;
        let sf_res = reader.read_u8()?;
        let sf_frames = reader.read_u8()? as usize;
        let reserved = reader.read_u8()?;
        if reserved != RESERVED {
            return Err(SeaError::BadReserved(reserved));
        }
        if chunk_type != TYPE_CBR && chunk_type != TYPE_VBR {
            return Err(SeaError::BadChunkType(chunk_type));
        }
        let scale_factor_bits = sf_res >> 4;
        let residual_bits = sf_res & 0x0F;
        if scale_factor_bits == 0 {
            return Err(SeaError::ParamOutOfRange("scale_factor_bits must be non-zero"));
        }
        if residual_bits == 0 || residual_bits > 8 {
            return Err(SeaError::ParamOutOfRange("residual_bits must be in 1..=8"));
        }
        if sf_frames == 0 {
            return Err(SeaError::ParamOutOfRange("sf_frames must be non-zero"));
        }

        for state in &mut self.lms {
            *state = LmsState::read_from(&mut reader)?;
        }

        let slots = frames.div_ceil(sf_frames);
        let items = slots * ch;
        let sf_section = reader.read_slice(scale_factor_bytes(items, scale_factor_bits))?;
        let scale_factors = unpack(sf_section, scale_factor_bits as u32, items)?;

        let lengths = if chunk_type == TYPE_VBR {
            let section = reader.read_slice(vbr_length_bytes(items))?;
            Some(unpack(section, VBR_LENGTH_BITS, items)?)
        } else {
            None
        };

        let mut residuals = BitUnpacker::new(reader.rest());
        let start = out.len();
        out.resize(start + frames * ch, 0);

        let mut item = 0usize;
        for slot in 0..slots {
            let slot_start = slot * sf_frames;
            let slot_end = (slot_start + sf_frames).min(frames);
            for channel in 0..ch {
                let scale_factor = scale_factors[item] as usize;
                let width = match &lengths {
                    None => residual_bits as u32,
                    Some(codes) => {
                        let width = residual_bits as i32 + codes[item] as i32 - 1;
                        if width < 1 || width > 8 {
                            return Err(SeaError::ParamOutOfRange(
                                "vbr residual width out of range",
                            ));
                        }
                        width as u32
                    }
                };
                let table = self.cache.get(scale_factor_bits, width as u8);
                let state = &mut self.lms[channel];
                for frame in slot_start..slot_end {
                    let code = residuals.read(width)? as u8;
                    let predicted = state.predict();
                    let dequantized = table.dequantize(scale_factor, code);
                    let reconstructed = clamp_i16(predicted + dequantized);
                    out[start + frame * ch + channel] = reconstructed as i16;
                    state.update(reconstructed, dequantized);
                }
                item += 1;
            }
        }

        tracing::trace!("decoded {} byte chunk into {} frames", bytes.len(), frames);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cbr_params() -> EncodeParams {
        EncodeParams {
            frames_per_chunk: 64,
            scale_factor_frames: 8,
            ..EncodeParams::with_quality(3)
        }
    }

    fn ramp(frames: usize, channels: usize) -> Vec<i16> {
        (0..frames * channels)
            .map(|i| ((i * 233) % 12000) as i16 - 6000)
            .collect()
    }

    #[test]
    fn test_cbr_chunk_round_trip() {
        let mut encoder = ChunkEncoder::new(2, cbr_params()).unwrap();
        let samples = ramp(64, 2);
        let chunk = encoder.encode_chunk(&samples).unwrap();
        assert_eq!(chunk.len(), encoder.chunk_size());

        let mut decoder = ChunkDecoder::new(2);
        let mut decoded = Vec::new();
        decoder.decode_chunk(&chunk, 64, &mut decoded).unwrap();
        assert_eq!(decoded.len(), samples.len());

        // lossy, but every sample should land near its target at rb=3
        for (index, (&want, &got)) in samples.iter().zip(&decoded).enumerate() {
            assert!(
                (want as i32 - got as i32).abs() < 4000,
                "sample {} diverged: {} vs {}",
                index,
                want,
                got
            );
        }
    }

    #[test]
    fn test_chunk_state_carries_across_chunks() {
        let mut encoder = ChunkEncoder::new(1, cbr_params()).unwrap();
        let first = encoder.encode_chunk(&ramp(64, 1)).unwrap();
        let second = encoder.encode_chunk(&ramp(64, 1)).unwrap();

        // the second chunk's header must snapshot the state left by the
        // first chunk, not the zero state
        let lms_bytes = &second[4..4 + LMS_STATE_BYTES];
        assert_ne!(lms_bytes, &[0u8; LMS_STATE_BYTES]);

        let mut decoder = ChunkDecoder::new(1);
        let mut a = Vec::new();
        decoder.decode_chunk(&first, 64, &mut a).unwrap();
        let mut b = Vec::new();
        decoder.decode_chunk(&second, 64, &mut b).unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(b.len(), 64);
    }

    #[test]
    fn test_short_final_chunk() {
        let mut encoder = ChunkEncoder::new(1, cbr_params()).unwrap();
        // 19 frames: two full slots of 8 and a partial slot of 3
        let samples = ramp(19, 1);
        let chunk = encoder.encode_chunk(&samples).unwrap();
        assert_eq!(chunk.len(), encoder.chunk_size());

        let mut decoder = ChunkDecoder::new(1);
        let mut decoded = Vec::new();
        decoder.decode_chunk(&chunk, 19, &mut decoded).unwrap();
        assert_eq!(decoded.len(), 19);
    }

    #[test]
    fn test_bad_reserved_byte() {
        let mut encoder = ChunkEncoder::new(1, cbr_params()).unwrap();
        let mut chunk = encoder.encode_chunk(&ramp(64, 1)).unwrap();
        chunk[3] = 0x00;

        let mut decoder = ChunkDecoder::new(1);
        assert_eq!(
            decoder.decode_chunk(&chunk, 64, &mut Vec::new()),
            Err(SeaError::BadReserved(0x00))
        );
    }

    #[test]
    fn test_bad_chunk_type() {
        let mut encoder = ChunkEncoder::new(1, cbr_params()).unwrap();
        let mut chunk = encoder.encode_chunk(&ramp(64, 1)).unwrap();
        chunk[0] = 0x03;

        let mut decoder = ChunkDecoder::new(1);
        assert_eq!(
            decoder.decode_chunk(&chunk, 64, &mut Vec::new()),
            Err(SeaError::BadChunkType(0x03))
        );
    }

    #[test]
    fn test_truncated_residuals() {
        let mut encoder = ChunkEncoder::new(1, cbr_params()).unwrap();
        let chunk = encoder.encode_chunk(&ramp(64, 1)).unwrap();

        let mut decoder = ChunkDecoder::new(1);
        // drop the padding and part of the residual section
        let cut = &chunk[..chunk.len() - 20];
        assert_eq!(
            decoder.decode_chunk(cut, 64, &mut Vec::new()),
            Err(SeaError::Truncated)
        );
    }

    #[test]
    fn test_vbr_width_out_of_range() {
        // hand-built VBR chunk: rb=8 with length code 3 declares width 10
        let mut bytes = vec![TYPE_VBR, (1 << 4) | 8, 20, RESERVED];
        bytes.extend_from_slice(&[0u8; LMS_STATE_BYTES]);
        bytes.push(0x00); // one packed scale factor, width 1
        bytes.push(0b1100_0000); // one length code: 3
        bytes.extend_from_slice(&[0u8; 32]);

        let mut decoder = ChunkDecoder::new(1);
        assert_eq!(
            decoder.decode_chunk(&bytes, 20, &mut Vec::new()),
            Err(SeaError::ParamOutOfRange("vbr residual width out of range"))
        );
    }

    #[test]
    fn test_vbr_chunk_round_trip() {
        let params = EncodeParams {
            mode: EncodeMode::Vbr,
            residual_bits: 4,
            scale_factor_bits: 4,
            frames_per_chunk: 64,
            scale_factor_frames: 8,
            vbr_target_bps: 8.0,
        };
        let mut encoder = ChunkEncoder::new(1, params).unwrap();
        let samples = ramp(64, 1);
        let chunk = encoder.encode_chunk(&samples).unwrap();
        assert_eq!(chunk.len(), encoder.chunk_size());
        assert_eq!(chunk[0], TYPE_VBR);

        let mut decoder = ChunkDecoder::new(1);
        let mut decoded = Vec::new();
        decoder.decode_chunk(&chunk, 64, &mut decoded).unwrap();
        assert_eq!(decoded.len(), 64);
        for (index, (&want, &got)) in samples.iter().zip(&decoded).enumerate() {
            assert!(
                (want as i32 - got as i32).abs() < 4000,
                "sample {} diverged: {} vs {}",
                index,
                want,
                got
            );
        }
    }

    #[test]
    fn test_cbr_sizes_are_exact() {
        // 64 frames, rb=3, sb=4, 8 slots: 4 + 16 + 4 + 24 bytes
        let encoder = ChunkEncoder::new(1, cbr_params()).unwrap();
        assert_eq!(encoder.chunk_size(), 4 + 16 + 4 + 24);
    }

    #[test]
    fn test_vbr_target_too_low_is_rejected() {
        let params = EncodeParams {
            mode: EncodeMode::Vbr,
            residual_bits: 4,
            scale_factor_bits: 4,
            frames_per_chunk: 5120,
            scale_factor_frames: 20,
            vbr_target_bps: 1.0,
        };
        assert!(matches!(
            ChunkEncoder::new(1, params),
            Err(SeaError::ParamOutOfRange(_))
        ));
    }

    #[test]
    fn test_end_marker_detection() {
        assert!(is_end_marker(&[0, 0, 0, 0, 9, 9]));
        assert!(!is_end_marker(&[TYPE_CBR, 0, 0, 0]));
        assert!(!is_end_marker(&[0, 0, 0]));
    }
}
