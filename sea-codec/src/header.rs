//! File-level container header and metadata handling.

use crate::byteio::{Reader, Writer};
use crate::error::SeaError;

/// File magic, ASCII `"SEAC"`.
pub const MAGIC: [u8; 4] = *b"SEAC";

/// Container format version this crate reads and writes.
pub const VERSION: u8 = 1;

/// Parsed file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub channels: u8,
    /// Fixed byte length of every chunk in the file.
    pub chunk_size: u16,
    /// Frames encoded per chunk; the last chunk may carry fewer.
    pub frames_per_chunk: u16,
    pub sample_rate: u32,
    /// Per-channel frame count; zero marks a stream that runs until EOF.
    pub total_frames: u32,
    /// Newline-separated `key=value` pairs, keys lowercased on the wire.
    pub metadata: String,
}

impl FileHeader {
    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        let mut writer = Writer::new(out);
        writer.write_slice(&MAGIC);
        writer.write_u8(VERSION);
        writer.write_u8(self.channels);
        writer.write_u16(self.chunk_size);
        writer.write_u16(self.frames_per_chunk);
        writer.write_u32(self.sample_rate);
        writer.write_u32(self.total_frames);
        writer.write_u32(self.metadata.len() as u32);
        writer.write_slice(self.metadata.as_bytes());
    }

    pub(crate) fn read_from(reader: &mut Reader<'_>) -> Result<Self, SeaError> {
        let magic: [u8; 4] = reader.read_array()?;
        if magic != MAGIC {
            return Err(SeaError::BadMagic);
        }
        let version = reader.read_u8()?;
        if version != VERSION {
            return Err(SeaError::UnsupportedVersion(version));
        }
        let channels = reader.read_u8()?;
        if channels == 0 {
            return Err(SeaError::ParamOutOfRange("channels must be non-zero"));
        }
        let chunk_size = reader.read_u16()?;
        let frames_per_chunk = reader.read_u16()?;
        if frames_per_chunk == 0 {
            return Err(SeaError::ParamOutOfRange(
                "frames_per_chunk must be non-zero",
            ));
        }
        let sample_rate = reader.read_u32()?;
        let total_frames = reader.read_u32()?;
        let metadata_size = reader.read_u32()?;
        let blob = reader.read_slice(metadata_size as usize)?;
        let metadata = String::from_utf8(blob.to_vec()).map_err(|_| SeaError::BadMetadata)?;
        Ok(Self {
            channels,
            chunk_size,
            frames_per_chunk,
            sample_rate,
            total_frames,
            metadata,
        })
    }
}

/// Validate metadata and lowercase its keys. Keys are case insensitive on
/// the wire and may not contain `=`; neither keys nor values may contain a
/// newline (the pair separator).
pub(crate) fn normalize_metadata(metadata: &str) -> Result<String, SeaError> {
    if metadata.is_empty() {
        return Ok(String::new());
    }
    let mut lines = Vec::new();
    for line in metadata.split('\n') {
        let Some((key, value)) = line.split_once('=') else {
            return Err(SeaError::ParamOutOfRange("metadata line without '='"));
        };
        if key.is_empty() {
            return Err(SeaError::ParamOutOfRange("metadata key is empty"));
        }
        lines.push(format!("{}={}", key.to_lowercase(), value));
    }
    Ok(lines.join("\n"))
}

/// Iterate a metadata blob as `(key, value)` pairs. Keys are lowercased so
/// lookups are case insensitive; values pass through untouched.
pub fn metadata_pairs(metadata: &str) -> impl Iterator<Item = (String, &str)> {
    metadata
        .split('\n')
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.to_lowercase(), value))
}
