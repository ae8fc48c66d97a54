//! Rate selection: per scale-factor slot, pick the best scale factor (CBR)
//! or the best (scale factor, residual width) pair (VBR) by trial
//! quantization against a scratch copy of the channel's predictor state.
//!
//! The search is exhaustive and the tie-breaking is fixed (smaller width
//! code, then smaller scale factor, then smaller residual code inside
//! [`DequantTable::quantize`]), so identical input always yields identical
//! bytes.

use crate::dqt::DequantTable;
use crate::lms::{LmsState, clamp_i16};

/// Winning candidate for one `(slot, channel)` pair.
#[derive(Debug, Clone)]
pub(crate) struct Selection {
    pub scale_factor: u16,
    /// Residual width in bits; always the base width in CBR mode.
    pub width: u8,
    /// One residual code per frame in the slot.
    pub codes: Vec<u8>,
    /// Predictor state after the slot, to carry into the next one.
    pub state: LmsState,
    /// Sum of squared reconstruction errors across the slot.
    pub error: u64,
}

/// Run one candidate across the slot: quantize every frame, accumulate the
/// squared reconstruction error, and return the end state.
fn trial_slot(
    state: &LmsState,
    table: &DequantTable,
    scale_factor: usize,
    targets: &[i16],
    codes: &mut Vec<u8>,
) -> (u64, LmsState) {
    let mut lms = state.clone();
    let mut error = 0u64;
    for &target in targets {
        let target = target as i32;
        let predicted = lms.predict();
        let code = table.quantize(scale_factor, target - predicted);
        let dequantized = table.dequantize(scale_factor, code);
        let reconstructed = clamp_i16(predicted + dequantized);
        let diff = (reconstructed - target) as i64;
        error += (diff * diff) as u64;
        codes.push(code);
        lms.update(reconstructed, dequantized);
    }
    (error, lms)
}

/// Exhaustive scale-factor search at a fixed residual width. Ties keep the
/// smaller scale factor index.
pub(crate) fn select_cbr(state: &LmsState, table: &DequantTable, targets: &[i16]) -> Selection {
    let mut codes = Vec::with_capacity(targets.len());
    let (error, end_state) = trial_slot(state, table, 0, targets, &mut codes);
    let mut best = Selection {
        scale_factor: 0,
        width: table.residual_bits(),
        codes: codes.clone(),
        state: end_state,
        error,
    };
    for scale_factor in 1..table.rows() {
        codes.clear();
        let (error, end_state) = trial_slot(state, table, scale_factor, targets, &mut codes);
        if error < best.error {
            best = Selection {
                scale_factor: scale_factor as u16,
                width: table.residual_bits(),
                codes: codes.clone(),
                state: end_state,
                error,
            };
        }
    }
    best
}

/// Lagrangian rate controller for VBR width selection. Cost is
/// `error + lambda * bits`; lambda adapts after every slot against the
/// per-sample bit budget, so the stream settles around the target.
#[derive(Debug)]
pub(crate) struct RateControl {
    lambda: f64,
    target_width: f64,
    spent_bits: u64,
    coded_samples: u64,
}

impl RateControl {
    pub fn new(target_width: f64) -> Self {
        Self {
            lambda: 1.0,
            target_width,
            spent_bits: 0,
            coded_samples: 0,
        }
    }

    /// Reset the per-chunk spend counters; lambda carries across chunks.
    pub fn begin_chunk(&mut self) {
        self.spent_bits = 0;
        self.coded_samples = 0;
    }

    pub fn spent_bits(&self) -> u64 {
        self.spent_bits
    }

    pub fn commit(&mut self, width: u8, samples: u64) {
        self.spent_bits += width as u64 * samples;
        self.coded_samples += samples;
        if self.spent_bits as f64 > self.target_width * self.coded_samples as f64 {
            self.lambda = (self.lambda * 1.05).min(1e12);
        } else {
            self.lambda = (self.lambda / 1.05).max(1e-9);
        }
    }
}

/// Search (width x scale factor) for the cheapest candidate that still lets
/// every remaining slot in the chunk fit at the minimum width. `widths` and
/// `tables` run in ascending width order; `None` means not even the
/// narrowest width fits the budget.
pub(crate) fn select_vbr(
    state: &LmsState,
    widths: &[u8],
    tables: &[DequantTable],
    targets: &[i16],
    rate: &RateControl,
    budget_bits: u64,
    remaining_samples: u64,
) -> Option<Selection> {
    let slot_samples = targets.len() as u64;
    let min_width = widths[0] as u64;
    let mut best: Option<(f64, Selection)> = None;
    let mut codes = Vec::with_capacity(targets.len());

    for (&width, table) in widths.iter().zip(tables) {
        let bits = width as u64 * slot_samples;
        if rate.spent_bits() + bits + min_width * remaining_samples > budget_bits {
            continue;
        }
        for scale_factor in 0..table.rows() {
            codes.clear();
            let (error, end_state) = trial_slot(state, table, scale_factor, targets, &mut codes);
            let cost = error as f64 + rate.lambda * bits as f64;
            if best.as_ref().is_none_or(|(lowest, _)| cost < *lowest) {
                best = Some((
                    cost,
                    Selection {
                        scale_factor: scale_factor as u16,
                        width,
                        codes: codes.clone(),
                        state: end_state,
                        error,
                    },
                ));
            }
        }
    }
    best.map(|(_, selection)| selection)
}
