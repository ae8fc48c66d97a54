//! SEA (Simple Embedded Audio) codec implementation
//!
//! A low-complexity, lossy, time-domain audio codec for 16-bit PCM. Each
//! channel runs a four-tap sign-sign LMS predictor; prediction residuals
//! are quantized against per-block scale factors and bit-packed into
//! fixed-size chunks, so files seek in constant time. Bitrate is tunable
//! from roughly 1.2 to 8.5 bits per sample via the residual width (CBR) or
//! a target bitrate (VBR).
//!
//! # File layout
//!
//! ```text
//! header (22 bytes + metadata):
//!   "SEAC" magic, version, channels, chunk_size, frames_per_chunk,
//!   sample_rate, total_frames, metadata_size, metadata (key=value lines)
//!
//! chunk (chunk_size bytes, repeats):
//!   type (CBR/VBR), scale factor + residual widths, scale factor stride,
//!   0x5A reserved byte, per-channel LMS state (16 bytes each),
//!   packed scale factors, VBR length codes (VBR only), packed residuals,
//!   zero padding
//! ```
//!
//! All integers are little-endian; bit-packed sections are MSB-first. The
//! predictor state stored in each chunk header is the state *entering*
//! that chunk, which is what makes chunks independently decodable.
//!
//! # Usage
//!
//! ```
//! use sea_codec::{EncodeParams, decode, encode};
//!
//! let samples: Vec<i16> = (0..4410)
//!     .map(|i| ((i as f32 * 0.05).sin() * 8000.0) as i16)
//!     .collect();
//!
//! let encoded = encode(&samples, 44100, 1, EncodeParams::default(), "title=demo").unwrap();
//! let decoded = decode(&encoded).unwrap();
//!
//! assert_eq!(decoded.samples.len(), samples.len());
//! assert_eq!(decoded.metadata, "title=demo");
//! assert!(encoded.len() < samples.len() * 2);
//! ```

pub mod bitio;
mod byteio;
mod chunk;
mod decoder;
pub mod dqt;
mod encoder;
mod error;
mod header;
pub mod lms;
mod params;
mod rate;

pub use decoder::{DecodedAudio, SeaDecoder, decode};
pub use encoder::{SeaEncoder, encode};
pub use error::SeaError;
pub use header::{FileHeader, MAGIC, VERSION, metadata_pairs};
pub use params::{EncodeMode, EncodeParams};
