pub const FORMAT_VERSION: u8 = 1;

pub const SAMPLE_BIT_DEPTH: u32 = 8;
// Samples are level shifted by 2^(depth - 1) before any transform.
pub const LEVEL_SHIFT: i32 = 1 << (SAMPLE_BIT_DEPTH - 1);
pub const MAXIMUM_SAMPLE_VALUE: i32 = (1 << SAMPLE_BIT_DEPTH) - 1;

pub const MINIMUM_QUALITY: f32 = 0.0;
pub const MAXIMUM_QUALITY: f32 = 100.0;
pub const DEFAULT_VISUAL_QUALITY: f32 = 85.0;

pub const DEFAULT_DECOMPOSITION_LEVELS: u8 = 5;
pub const MAXIMUM_DECOMPOSITION_LEVELS: u8 = 16;

pub const DEFAULT_TILE_SIZE: u32 = 512;
// Upper bound on the samples of one tile plane. Tiles are coded one at a time,
// so this caps the coefficient memory held beyond the image itself.
pub const MAXIMUM_TILE_AREA: u64 = 1 << 24;

// The size in bytes of the segment length field.
pub const SEGMENT_LENGTH_SIZE: usize = 2;

// The maximum size of the data bytes that fit in a segment.
pub const SEGMENT_MAX_DATA_SIZE: usize = u16::MAX as usize - SEGMENT_LENGTH_SIZE;

// Fixed segment lengths (including the length field itself).
pub const SIZ_SEGMENT_LENGTH: u16 = 20;
pub const COD_SEGMENT_LENGTH: u16 = 5;
pub const SOT_SEGMENT_LENGTH: u16 = 10;

// Longest comment the encoder accepts, in bytes.
pub const MAXIMUM_COMMENT_LENGTH: usize = 65_000;
