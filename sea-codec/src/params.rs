use serde::{Deserialize, Serialize};

use crate::error::SeaError;

/// Residual coding mode for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncodeMode {
    /// Constant residual width within every chunk.
    Cbr,
    /// Per-slot residual widths steered towards a target bitrate.
    Vbr,
}

/// Parameters for configuring the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodeParams {
    /// Residual coding mode
    pub mode: EncodeMode,
    /// Residual width in bits (1-8); in VBR mode this is the base width
    pub residual_bits: u8,
    /// Scale factor index width in bits (1-15)
    pub scale_factor_bits: u8,
    /// Frames encoded per chunk
    pub frames_per_chunk: u16,
    /// Frames covered by one scale factor per channel
    pub scale_factor_frames: u8,
    /// Target bits per PCM sample, including framing overhead (VBR only)
    pub vbr_target_bps: f32,
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self::with_quality(4)
    }
}

impl EncodeParams {
    /// Create CBR parameters for a quality tier (1 = smallest, 8 = best).
    ///
    /// The tier picks the residual width directly and widens the scale
    /// factor index alongside it. Out-of-range tiers are clamped.
    pub fn with_quality(quality: u8) -> Self {
        let quality = quality.clamp(1, 8);
        let scale_factor_bits = match quality {
            1..=4 => 4,
            5..=6 => 5,
            _ => 6,
        };
        Self {
            mode: EncodeMode::Cbr,
            residual_bits: quality,
            scale_factor_bits,
            frames_per_chunk: 5120,
            scale_factor_frames: 20,
            vbr_target_bps: 0.0,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), SeaError> {
        if self.residual_bits < 1 || self.residual_bits > 8 {
            return Err(SeaError::ParamOutOfRange("residual_bits must be in 1..=8"));
        }
        if self.scale_factor_bits < 1 || self.scale_factor_bits > 15 {
            return Err(SeaError::ParamOutOfRange(
                "scale_factor_bits must be in 1..=15",
            ));
        }
        if self.frames_per_chunk == 0 {
            return Err(SeaError::ParamOutOfRange(
                "frames_per_chunk must be non-zero",
            ));
        }
        if self.scale_factor_frames == 0 {
            return Err(SeaError::ParamOutOfRange(
                "scale_factor_frames must be non-zero",
            ));
        }
        if self.mode == EncodeMode::Vbr
            && !(self.vbr_target_bps.is_finite() && self.vbr_target_bps > 0.0)
        {
            return Err(SeaError::ParamOutOfRange("vbr_target_bps must be positive"));
        }
        Ok(())
    }
}
