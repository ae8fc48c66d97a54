//! Dequantization tables shared by the encoder and decoder.
//!
//! A table maps `(scale factor index, residual code)` to a signed residual.
//! Both sides derive it from `(scale_factor_bits, residual_bits)` alone, so
//! the bitstream never carries it. Construction is 32-bit float throughout
//! and must reproduce the golden vectors below bit for bit; the final
//! rounding step is round half away from zero (`f32::round`).

use std::collections::HashMap;

/// Exponent numerators per residual width, indexed by `residual_bits - 1`.
const IDEAL_POW: [f32; 8] = [12.0, 11.65, 11.20, 10.58, 9.64, 8.75, 7.66, 6.63];

/// Dequantization table for one `(scale_factor_bits, residual_bits)` pair.
///
/// Row `s` holds the residual levels for scale factor index `s`,
/// interleaved as `[+v0, -v0, +v1, -v1, ..]`: code `2q` is positive, code
/// `2q + 1` is its negation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DequantTable {
    scale_factor_bits: u8,
    residual_bits: u8,
    scale_factors: Vec<i32>,
    levels: Vec<i32>,
}

impl DequantTable {
    pub fn new(scale_factor_bits: u8, residual_bits: u8) -> Self {
        debug_assert!(scale_factor_bits >= 1 && scale_factor_bits <= 15);
        debug_assert!(residual_bits >= 1 && residual_bits <= 8);

        let rows = 1usize << scale_factor_bits;
        let half = 1usize << (residual_bits - 1);

        let power_factor = IDEAL_POW[residual_bits as usize - 1] / scale_factor_bits as f32;
        let scale_factors: Vec<i32> = (0..rows)
            .map(|i| ((i + 1) as f32).powf(power_factor) as i32)
            .collect();

        let mut base = vec![0.0f32; half];
        match residual_bits {
            1 => base[0] = 2.0,
            2 => {
                base[0] = 1.115;
                base[1] = 4.0;
            }
            _ => {
                let end = ((1u32 << residual_bits) - 1) as f32;
                let step = ((end - 0.75) / (half - 1) as f32).floor();
                base[0] = 0.75;
                for i in 1..half - 1 {
                    base[i] = 0.5 + i as f32 * step;
                }
                base[half - 1] = end;
            }
        }

        let mut levels = Vec::with_capacity(rows << residual_bits);
        for &factor in &scale_factors {
            for &b in &base {
                let value = (factor as f32 * b).round() as i32;
                levels.push(value);
                levels.push(-value);
            }
        }

        Self {
            scale_factor_bits,
            residual_bits,
            scale_factors,
            levels,
        }
    }

    pub fn scale_factor_bits(&self) -> u8 {
        self.scale_factor_bits
    }

    pub fn residual_bits(&self) -> u8 {
        self.residual_bits
    }

    /// Number of scale factor rows (`2^scale_factor_bits`).
    pub fn rows(&self) -> usize {
        1usize << self.scale_factor_bits
    }

    /// Residual codes per row (`2^residual_bits`).
    pub fn codes(&self) -> usize {
        1usize << self.residual_bits
    }

    pub fn scale_factor(&self, index: usize) -> i32 {
        self.scale_factors[index]
    }

    /// The interleaved residual levels for one scale factor index.
    pub fn row(&self, index: usize) -> &[i32] {
        let codes = self.codes();
        &self.levels[index * codes..(index + 1) * codes]
    }

    /// Signed residual for a `(scale factor, code)` pair.
    pub fn dequantize(&self, scale_factor: usize, code: u8) -> i32 {
        self.row(scale_factor)[code as usize]
    }

    /// The code whose level is nearest to `residual`, ties to the smaller
    /// code. Equivalent to a linear argmin over the row; the positive
    /// levels increase strictly, so a binary search over the half-row
    /// suffices.
    pub fn quantize(&self, scale_factor: usize, residual: i32) -> u8 {
        if residual == 0 {
            return 0;
        }
        let row = self.row(scale_factor);
        let half = self.codes() / 2;
        let magnitude = residual.abs();

        // first q with level >= magnitude
        let mut lo = 0usize;
        let mut hi = half;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if row[2 * mid] < magnitude {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let q = if lo == 0 {
            0
        } else if lo == half {
            half - 1
        } else if magnitude - row[2 * (lo - 1)] <= row[2 * lo] - magnitude {
            lo - 1
        } else {
            lo
        };
        (2 * q + usize::from(residual < 0)) as u8
    }
}

/// Memoises [`DequantTable`]s by `(scale_factor_bits, residual_bits)`.
///
/// Owned by each decoder instance; there is no process-wide table state.
#[derive(Debug, Default)]
pub(crate) struct DqtCache {
    tables: HashMap<(u8, u8), DequantTable>,
}

impl DqtCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, scale_factor_bits: u8, residual_bits: u8) -> &DequantTable {
        self.tables
            .entry((scale_factor_bits, residual_bits))
            .or_insert_with(|| DequantTable::new(scale_factor_bits, residual_bits))
    }
}
