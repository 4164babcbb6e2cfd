use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::StreamFault;

/// Second byte of the two-byte markers that delimit codestream segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum MarkerCode {
    /// SOC: Marks the start of a codestream.
    StartOfCodestream = 0x4F,

    /// SIZ: Image dimensions, channel count and tile size.
    ImageAndTileSize = 0x51,

    /// COD: Decomposition levels, wavelet kernel and component transform.
    CodingStyle = 0x52,

    /// QCD: The quantization plan.
    QuantizationPlan = 0x5C,

    /// COM: Free-form comment.
    Comment = 0x64,

    /// SOT: Marks the start of a tile.
    StartOfTile = 0x90,

    /// EOC: Marks the end of the codestream.
    EndOfCodestream = 0xD9,
}

impl MarkerCode {
    pub fn from_byte(value: u8) -> Result<Self, StreamFault> {
        Self::try_from(value).map_err(|_| StreamFault::UnknownMarker(value))
    }
}

pub const MARKER_START_BYTE: u8 = 0xFF;
