use thiserror::Error;

/// Errors reported by the encoder, the decoder and the stages behind them.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum Jp2Error {
    #[error("Invalid dimensions {width}x{height}: width and height must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid channel count {0}: expected 1 (grayscale) or 3 (RGB)")]
    InvalidChannelCount(u8),
    #[error("Sample buffer holds {actual} bytes, expected {expected}")]
    SampleBufferSize { expected: usize, actual: usize },
    #[error("Invalid visual quality {0}: must lie within [0, 100]")]
    InvalidQuality(f32),
    #[error("Invalid encoder parameter: {0}")]
    InvalidParameter(&'static str),
    #[error("Corrupt stream: {0}")]
    CorruptStream(#[from] StreamFault),
}

/// The specific defect found while unpacking a codestream.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFault {
    #[error("start of codestream marker not found")]
    MissingSignature,
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),
    #[error("marker start byte not found at offset {0}")]
    MarkerStartByteNotFound(usize),
    #[error("unknown marker 0xFF{0:02X}")]
    UnknownMarker(u8),
    #[error("unexpected marker 0xFF{found:02X}, expected 0xFF{expected:02X}")]
    UnexpectedMarker { expected: u8, found: u8 },
    #[error("needed {needed} bytes at offset {offset}, only {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("segment length {0} is inconsistent with its contents")]
    InvalidSegmentLength(u16),
    #[error("declared dimensions {width}x{height} are not positive")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("declared tile size {width}x{height} is not usable")]
    InvalidTileSize { width: u32, height: u32 },
    #[error("unsupported channel count {0}")]
    InvalidChannelCount(u8),
    #[error("unknown wavelet kernel {0}")]
    UnknownKernel(u8),
    #[error("unknown component transform {0}")]
    UnknownComponentTransform(u8),
    #[error("component transform {0} does not apply to this image")]
    MismatchedComponentTransform(u8),
    #[error("decomposition level count {0} exceeds the supported maximum")]
    InvalidLevels(u8),
    #[error("comment is not valid UTF-8")]
    InvalidComment,
    #[error("quantization plan holds {found} step sizes, expected {expected}")]
    StepCountMismatch { expected: usize, found: usize },
    #[error("quantization step {index} is not a positive finite number")]
    InvalidStepSize { index: usize },
    #[error("tile {found} found where tile {expected} was expected")]
    TileOutOfOrder { expected: u32, found: u32 },
    #[error("tile {index} declares {declared} bytes but its payloads span {actual}")]
    TileLengthMismatch {
        index: u32,
        declared: usize,
        actual: usize,
    },
    #[error("payload of {declared} bytes exceeds the {remaining} bytes remaining")]
    PayloadOverrun { declared: usize, remaining: usize },
    #[error("{0} trailing bytes after end of codestream")]
    TrailingData(usize),
}

impl Jp2Error {
    /// True when the error describes malformed input rather than a bad argument.
    pub fn is_corrupt_stream(&self) -> bool {
        matches!(self, Self::CorruptStream(_))
    }
}
