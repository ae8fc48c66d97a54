use thiserror::Error;

/// Errors raised while encoding or decoding a SEA stream.
///
/// Decoding is fail-fast: the first malformed chunk stops the decoder and
/// surfaces one of these. The core never panics on hostile input and never
/// writes to a log sink of its own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeaError {
    /// The first four bytes are not `"SEAC"`.
    #[error("bad magic, expected \"SEAC\"")]
    BadMagic,
    /// The header declares a container version this crate does not speak.
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),
    /// A chunk's reserved byte is not `0x5A`.
    #[error("bad chunk reserved byte {0:#04x}, expected 0x5a")]
    BadReserved(u8),
    /// A chunk's type byte is neither CBR (`0x01`) nor VBR (`0x02`).
    #[error("bad chunk type {0:#04x}")]
    BadChunkType(u8),
    /// Input ended before an expected field completed.
    #[error("unexpected end of data")]
    Truncated,
    /// The metadata blob is not valid UTF-8.
    #[error("metadata is not valid UTF-8")]
    BadMetadata,
    /// A header field or encoder parameter is outside its legal range.
    #[error("parameter out of range: {0}")]
    ParamOutOfRange(&'static str),
    /// The encoder cannot fit the chosen parameters within one chunk.
    #[error("encoded chunk does not fit the chunk size")]
    EncodeOverflow,
}
