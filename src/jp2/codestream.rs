//! Entropy coder framing: writes quantized tiles into the codestream and
//! reads them back, one tile at a time.
//!
//! ```text
//! SOC
//! SIZ  version, width, height, channels, tile width, tile height
//! COD  levels, kernel, component transform
//! QCD  step count, steps
//! COM  optional UTF-8 comment
//! SOT  tile index, body length    (one per tile, row-major)
//!      per channel, per sub-band: u32 length + MQ payload
//! EOC
//! ```
//!
//! Every length is checked against the bytes that remain and the stream has to
//! end exactly at EOC, so truncation anywhere is detected.

use tracing::trace;

use super::coefficient_coder::{decode_subband, encode_subband};
use super::color::ComponentTransform;
use super::dwt::WaveletKernel;
use super::quantization::QuantizationPlan;
use super::subband::{QuantizedBlock, decomposition_levels};
use super::tile::{TileGrid, TileRect};
use crate::constants::{
    COD_SEGMENT_LENGTH, FORMAT_VERSION, MAXIMUM_DECOMPOSITION_LEVELS, MAXIMUM_TILE_AREA,
    SEGMENT_LENGTH_SIZE, SEGMENT_MAX_DATA_SIZE, SIZ_SEGMENT_LENGTH,
    SOT_SEGMENT_LENGTH,
};
use crate::error::{Jp2Error, StreamFault};
use crate::marker_code::MarkerCode;
use crate::raster::PixelFormat;
use crate::stream_reader::StreamReader;
use crate::stream_writer::StreamWriter;

/// Smallest number of bytes any tile occupies: its SOT marker and segment.
/// With the first SOT marker already read, EOC makes up for the missing two.
const MINIMUM_TILE_SIZE: usize = 2 + SOT_SEGMENT_LENGTH as usize;

/// Everything the main header says about the image.
#[derive(Debug, Clone, PartialEq)]
pub struct CodestreamHeader {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub tile_width: u32,
    pub tile_height: u32,
    pub kernel: WaveletKernel,
    pub component_transform: ComponentTransform,
    pub plan: QuantizationPlan,
    pub comment: Option<String>,
}

impl CodestreamHeader {
    /// Requested decomposition levels; small tiles may use fewer.
    pub fn levels(&self) -> u8 {
        self.plan.levels()
    }

    pub fn tile_grid(&self) -> TileGrid {
        TileGrid::new(self.width, self.height, self.tile_width, self.tile_height)
    }

    /// Decomposition levels actually applied to `tile`.
    pub fn tile_levels(&self, tile: &TileRect) -> u8 {
        decomposition_levels(tile.width as usize, tile.height as usize, self.levels())
    }
}

/// One tile read back from a codestream.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTile {
    pub rect: TileRect,
    /// Size of the tile body in bytes, as declared by its SOT segment.
    pub body_length: usize,
    /// One block per channel.
    pub blocks: Vec<QuantizedBlock>,
}

/// Writes a codestream one tile at a time, so the encoder only ever holds
/// the quantized coefficients of the tile it is working on.
pub struct CodestreamWriter {
    writer: StreamWriter,
    next_index: u32,
}

impl CodestreamWriter {
    /// Starts a codestream with the main header (SOC through COM).
    pub fn new(header: &CodestreamHeader) -> Result<Self, Jp2Error> {
        let comment = header.comment.as_deref().unwrap_or_default();
        if comment.len() > SEGMENT_MAX_DATA_SIZE {
            return Err(Jp2Error::InvalidParameter("comment exceeds the segment size"));
        }

        let mut writer = StreamWriter::new();
        writer.write_marker(MarkerCode::StartOfCodestream);
        writer.write_segment(MarkerCode::ImageAndTileSize, |w| {
            w.write_byte(FORMAT_VERSION);
            w.write_u32(header.width);
            w.write_u32(header.height);
            w.write_byte(header.format.into());
            w.write_u32(header.tile_width);
            w.write_u32(header.tile_height);
        });
        writer.write_segment(MarkerCode::CodingStyle, |w| {
            w.write_byte(header.levels());
            w.write_byte(header.kernel.into());
            w.write_byte(header.component_transform.into());
        });
        writer.write_segment(MarkerCode::QuantizationPlan, |w| {
            let steps = header.plan.steps();
            w.write_byte(steps.len() as u8);
            for &step in steps {
                w.write_f32(step);
            }
        });
        if let Some(comment) = &header.comment {
            writer.write_segment(MarkerCode::Comment, |w| w.write_bytes(comment.as_bytes()));
        }
        Ok(Self {
            writer,
            next_index: 0,
        })
    }

    /// Appends the next tile in row-major order, one block per channel.
    pub fn write_tile(&mut self, blocks: &[QuantizedBlock]) -> Result<(), Jp2Error> {
        let index = self.next_index;
        let writer = &mut self.writer;
        writer.write_segment(MarkerCode::StartOfTile, |w| {
            w.write_u32(index);
            w.write_u32(0);
        });
        let psot_position = writer.len() - 4;
        let body_start = writer.len();
        for block in blocks {
            for band in &block.subbands {
                let payload = encode_subband(&band.coefficients, band.width);
                let length = u32::try_from(payload.len())
                    .map_err(|_| Jp2Error::InvalidParameter("sub-band payload exceeds 4 GiB"))?;
                writer.write_u32(length);
                writer.write_bytes(&payload);
            }
        }
        let body_length = u32::try_from(writer.len() - body_start)
            .map_err(|_| Jp2Error::InvalidParameter("tile body exceeds 4 GiB"))?;
        writer.patch_u32(psot_position, body_length);
        trace!(tile = index, bytes = body_length, "packed tile");
        self.next_index += 1;
        Ok(())
    }

    /// Writes EOC and returns the codestream.
    pub fn finish(mut self) -> Vec<u8> {
        self.writer.write_marker(MarkerCode::EndOfCodestream);
        self.writer.into_inner()
    }
}

/// Reads a codestream one tile at a time.
///
/// The main header is parsed and validated up front. Tiles come back in
/// row-major order from [`Self::next_tile`]; once the last one is returned
/// the reader checks that EOC ends the buffer.
pub struct CodestreamReader<'a> {
    reader: StreamReader<'a>,
    header: CodestreamHeader,
    grid: TileGrid,
    next_tile: u64,
    // Marker read after the previous segment, checked by the next call.
    marker: MarkerCode,
    finished: bool,
}

impl<'a> CodestreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Result<Self, Jp2Error> {
        let mut reader = StreamReader::new(source);
        let (header, marker) = read_main_header(&mut reader)?;
        let grid = header.tile_grid();

        // Refuse to go on with a tile grid the buffer cannot possibly hold.
        let needed = grid.tile_count().saturating_mul(MINIMUM_TILE_SIZE as u64);
        if needed > reader.remaining() as u64 {
            return Err(StreamFault::Truncated {
                offset: reader.position(),
                needed: usize::try_from(needed).unwrap_or(usize::MAX),
                remaining: reader.remaining(),
            }
            .into());
        }

        Ok(Self {
            reader,
            header,
            grid,
            next_tile: 0,
            marker,
            finished: false,
        })
    }

    pub fn header(&self) -> &CodestreamHeader {
        &self.header
    }

    /// Parses the next tile, or returns `None` after the last one once the
    /// end of the codestream has been verified.
    pub fn next_tile(&mut self) -> Result<Option<DecodedTile>, Jp2Error> {
        if self.next_tile == self.grid.tile_count() {
            if !self.finished {
                if self.marker != MarkerCode::EndOfCodestream {
                    return Err(StreamFault::UnexpectedMarker {
                        expected: MarkerCode::EndOfCodestream.into(),
                        found: self.marker.into(),
                    }
                    .into());
                }
                if !self.reader.is_at_end() {
                    return Err(StreamFault::TrailingData(self.reader.remaining()).into());
                }
                self.finished = true;
            }
            return Ok(None);
        }

        if self.marker != MarkerCode::StartOfTile {
            return Err(StreamFault::UnexpectedMarker {
                expected: MarkerCode::StartOfTile.into(),
                found: self.marker.into(),
            }
            .into());
        }
        let columns = u64::from(self.grid.columns());
        let rect = self.grid.tile(
            (self.next_tile % columns) as u32,
            (self.next_tile / columns) as u32,
        );
        let tile = read_tile(&mut self.reader, &self.header, rect)?;
        self.marker = self.reader.read_marker()?;
        self.next_tile += 1;
        Ok(Some(tile))
    }
}

/// Writes a whole codestream from every tile's blocks at once.
pub fn pack(header: &CodestreamHeader, tiles: &[Vec<QuantizedBlock>]) -> Result<Vec<u8>, Jp2Error> {
    let mut writer = CodestreamWriter::new(header)?;
    for blocks in tiles {
        writer.write_tile(blocks)?;
    }
    Ok(writer.finish())
}

/// Reads a whole codestream, holding every tile's coefficients at once.
/// The decoder uses [`CodestreamReader`] instead.
pub fn unpack(source: &[u8]) -> Result<(CodestreamHeader, Vec<DecodedTile>), Jp2Error> {
    let mut reader = CodestreamReader::new(source)?;
    let mut tiles = Vec::new();
    while let Some(tile) = reader.next_tile()? {
        tiles.push(tile);
    }
    Ok((reader.header().clone(), tiles))
}

/// Parses and validates the main header only.
pub fn read_header(source: &[u8]) -> Result<CodestreamHeader, Jp2Error> {
    let mut reader = StreamReader::new(source);
    let (header, marker) = read_main_header(&mut reader)?;
    if marker != MarkerCode::StartOfTile {
        return Err(StreamFault::UnexpectedMarker {
            expected: MarkerCode::StartOfTile.into(),
            found: marker.into(),
        }
        .into());
    }
    Ok(header)
}

/// Reads SOC through QCD (and COM when present). Returns the header and the
/// marker that follows it.
fn read_main_header(reader: &mut StreamReader<'_>) -> Result<(CodestreamHeader, MarkerCode), StreamFault> {
    if reader.read_marker() != Ok(MarkerCode::StartOfCodestream) {
        return Err(StreamFault::MissingSignature);
    }

    reader.expect_marker(MarkerCode::ImageAndTileSize)?;
    expect_segment_length(reader, SIZ_SEGMENT_LENGTH)?;
    let version = reader.read_u8()?;
    if version != FORMAT_VERSION {
        return Err(StreamFault::UnsupportedVersion(version));
    }
    let width = reader.read_u32()?;
    let height = reader.read_u32()?;
    if width == 0 || height == 0 {
        return Err(StreamFault::InvalidDimensions { width, height });
    }
    let channels = reader.read_u8()?;
    let format =
        PixelFormat::try_from(channels).map_err(|_| StreamFault::InvalidChannelCount(channels))?;
    let tile_width = reader.read_u32()?;
    let tile_height = reader.read_u32()?;
    if tile_width == 0
        || tile_height == 0
        || u64::from(tile_width) * u64::from(tile_height) > MAXIMUM_TILE_AREA
    {
        return Err(StreamFault::InvalidTileSize {
            width: tile_width,
            height: tile_height,
        });
    }

    reader.expect_marker(MarkerCode::CodingStyle)?;
    expect_segment_length(reader, COD_SEGMENT_LENGTH)?;
    let levels = reader.read_u8()?;
    if levels > MAXIMUM_DECOMPOSITION_LEVELS {
        return Err(StreamFault::InvalidLevels(levels));
    }
    let kernel_code = reader.read_u8()?;
    let kernel =
        WaveletKernel::try_from(kernel_code).map_err(|_| StreamFault::UnknownKernel(kernel_code))?;
    let mct_code = reader.read_u8()?;
    let component_transform = ComponentTransform::try_from(mct_code)
        .map_err(|_| StreamFault::UnknownComponentTransform(mct_code))?;
    if component_transform != ComponentTransform::for_image(kernel, format) {
        return Err(StreamFault::MismatchedComponentTransform(mct_code));
    }

    reader.expect_marker(MarkerCode::QuantizationPlan)?;
    let body = reader.read_segment_length()?;
    let count = reader.read_u8()? as usize;
    if body != 1 + 4 * count {
        return Err(StreamFault::InvalidSegmentLength(
            (body + SEGMENT_LENGTH_SIZE) as u16,
        ));
    }
    let steps = (0..count)
        .map(|_| reader.read_f32())
        .collect::<Result<Vec<_>, _>>()?;
    let plan = QuantizationPlan::from_steps(levels, steps)?;

    let mut marker = reader.read_marker()?;
    let mut comment = None;
    if marker == MarkerCode::Comment {
        let body = reader.read_segment_length()?;
        let bytes = reader.read_bytes(body)?;
        let text = std::str::from_utf8(bytes).map_err(|_| StreamFault::InvalidComment)?;
        comment = Some(text.to_owned());
        marker = reader.read_marker()?;
    }

    let header = CodestreamHeader {
        width,
        height,
        format,
        tile_width,
        tile_height,
        kernel,
        component_transform,
        plan,
        comment,
    };
    Ok((header, marker))
}

fn expect_segment_length(reader: &mut StreamReader<'_>, expected: u16) -> Result<(), StreamFault> {
    let body = reader.read_segment_length()?;
    if body + SEGMENT_LENGTH_SIZE != expected as usize {
        return Err(StreamFault::InvalidSegmentLength(
            (body + SEGMENT_LENGTH_SIZE) as u16,
        ));
    }
    Ok(())
}

/// Reads one SOT segment (its marker already consumed) and the tile body.
fn read_tile(
    reader: &mut StreamReader<'_>,
    header: &CodestreamHeader,
    rect: TileRect,
) -> Result<DecodedTile, StreamFault> {
    expect_segment_length(reader, SOT_SEGMENT_LENGTH)?;
    let index = reader.read_u32()?;
    if index != rect.index {
        return Err(StreamFault::TileOutOfOrder {
            expected: rect.index,
            found: index,
        });
    }
    let declared = reader.read_u32()? as usize;
    if declared > reader.remaining() {
        return Err(StreamFault::PayloadOverrun {
            declared,
            remaining: reader.remaining(),
        });
    }
    let mut body = StreamReader::new(reader.read_bytes(declared)?);

    let levels = header.tile_levels(&rect);
    let (width, height) = (rect.width as usize, rect.height as usize);
    let mut blocks = Vec::with_capacity(header.format.channels());
    for _ in 0..header.format.channels() {
        let mut block = QuantizedBlock::zeroed(width, height, levels);
        for band in &mut block.subbands {
            let length = body.read_u32()? as usize;
            if length > body.remaining() {
                return Err(StreamFault::PayloadOverrun {
                    declared: length,
                    remaining: body.remaining(),
                });
            }
            let payload = body.read_bytes(length)?;
            band.coefficients = decode_subband(payload, band.width, band.coefficients.len());
        }
        blocks.push(block);
    }

    if !body.is_at_end() {
        return Err(StreamFault::TileLengthMismatch {
            index,
            declared,
            actual: body.position(),
        });
    }
    trace!(tile = index, bytes = declared, levels, "unpacked tile");
    Ok(DecodedTile {
        rect,
        body_length: declared,
        blocks,
    })
}
