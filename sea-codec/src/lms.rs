//! Four-tap sign-sign LMS predictor, one state per channel.
//!
//! The state crosses the wire in every chunk header, so encoder and decoder
//! must step it identically: `predict` uses an arithmetic right shift of the
//! signed dot product, `update` moves each weight by the dequantized
//! residual scaled down by 16, against the sign of the history entry.

use crate::byteio::{Reader, Writer};
use crate::error::SeaError;

/// Serialized size of one channel's state in a chunk header.
pub const LMS_STATE_BYTES: usize = 16;

/// Predictor state: four reconstructed samples of history (newest last) and
/// four weights. Entries are i16 on the wire; arithmetic uses wider
/// intermediates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LmsState {
    history: [i32; 4],
    weights: [i32; 4],
}

impl LmsState {
    /// Fresh streams start from the all-zero state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Predicted next sample: `(sum of weights[i] * history[i]) >> 13`.
    pub fn predict(&self) -> i32 {
        let mut prediction = 0i64;
        for i in 0..4 {
            prediction += self.weights[i] as i64 * self.history[i] as i64;
        }
        (prediction >> 13) as i32
    }

    /// Fold one reconstructed sample into the state. `reconstructed` must
    /// already be clamped to the sample range; both sides agree on that.
    pub fn update(&mut self, reconstructed: i32, dequantized: i32) {
        let delta = dequantized >> 4;
        for i in 0..4 {
            self.weights[i] += if self.history[i] < 0 { -delta } else { delta };
        }
        self.history[0] = self.history[1];
        self.history[1] = self.history[2];
        self.history[2] = self.history[3];
        self.history[3] = reconstructed;
    }

    /// The state as the wire sees it, every entry narrowed to i16. The
    /// encoder snapshots through this before each chunk so that both sides
    /// keep evolving from bit-identical state.
    pub(crate) fn narrowed(&self) -> Self {
        let mut state = self.clone();
        for value in state.history.iter_mut().chain(state.weights.iter_mut()) {
            *value = *value as i16 as i32;
        }
        state
    }

    /// Serialize as eight little-endian i16 values: history, then weights.
    pub(crate) fn write_to(&self, writer: &mut Writer<'_>) {
        for &value in self.history.iter().chain(self.weights.iter()) {
            writer.write_i16(value as i16);
        }
    }

    /// Restore a snapshot from a chunk header.
    pub(crate) fn read_from(reader: &mut Reader<'_>) -> Result<Self, SeaError> {
        let mut state = Self::default();
        for i in 0..4 {
            state.history[i] = reader.read_i16()? as i32;
        }
        for i in 0..4 {
            state.weights[i] = reader.read_i16()? as i32;
        }
        Ok(state)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(history: [i32; 4], weights: [i32; 4]) -> Self {
        Self { history, weights }
    }

    #[cfg(test)]
    pub(crate) fn parts(&self) -> ([i32; 4], [i32; 4]) {
        (self.history, self.weights)
    }
}

/// Clamp a reconstructed value to the 16-bit sample range.
pub(crate) fn clamp_i16(value: i32) -> i32 {
    value.clamp(-32768, 32767)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_golden() {
        let state = LmsState::from_parts([100, -200, 300, 400], [1000, -2000, 3000, 4000]);
        // (100000 + 400000 + 900000 + 1600000) >> 13
        assert_eq!(state.predict(), 366);
    }

    #[test]
    fn test_predict_zero_state() {
        assert_eq!(LmsState::new().predict(), 0);
    }

    #[test]
    fn test_update_golden_positive_delta() {
        let mut state = LmsState::from_parts([100, -200, 300, 400], [1000, -2000, 3000, 4000]);
        state.update(500, 37);
        let (history, weights) = state.parts();
        assert_eq!(history, [-200, 300, 400, 500]);
        assert_eq!(weights, [1002, -2002, 3002, 4002]);
    }

    #[test]
    fn test_update_golden_negative_delta() {
        // -37 >> 4 must be -3 (arithmetic shift), not -2
        let mut state = LmsState::from_parts([10, -10, 0, 5], [0, 0, 0, 0]);
        state.update(7, -37);
        let (history, weights) = state.parts();
        assert_eq!(history, [-10, 0, 5, 7]);
        assert_eq!(weights, [-3, 3, -3, -3]);
    }

    #[test]
    fn test_zero_is_a_fixed_point() {
        let mut state = LmsState::new();
        for _ in 0..100 {
            assert_eq!(state.predict(), 0);
            state.update(0, 0);
        }
        assert_eq!(state, LmsState::new());
    }

    #[test]
    fn test_wire_round_trip() {
        let state = LmsState::from_parts([1, -2, 32767, -32768], [13, -7, 900, -900]);
        let mut bytes = Vec::new();
        state.write_to(&mut Writer::new(&mut bytes));
        assert_eq!(bytes.len(), LMS_STATE_BYTES);

        let restored = LmsState::read_from(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_narrowed_matches_wire() {
        let state = LmsState::from_parts([0, 0, 0, 0], [40000, -40000, 10, -10]);
        let mut bytes = Vec::new();
        state.write_to(&mut Writer::new(&mut bytes));
        let restored = LmsState::read_from(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(restored, state.narrowed());
    }

    #[test]
    fn test_predict_survives_hostile_state() {
        // arbitrary i16 state from a chunk header must stay defined
        let state = LmsState::from_parts(
            [32767, 32767, 32767, 32767],
            [32767, 32767, 32767, 32767],
        );
        assert_eq!(state.predict(), (4i64 * 32767 * 32767 >> 13) as i32);
    }
}
