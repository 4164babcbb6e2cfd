//! Decoder façade: Entropy coder -> inverse Quantizer -> inverse Transform.

use tracing::{debug, trace};

use super::codestream::{self, CodestreamHeader, CodestreamReader};
use super::quantization;
use super::transform::TransformStage;
use crate::error::Jp2Error;
use crate::raster::RasterImage;

pub struct Jp2Decoder<'a> {
    source: &'a [u8],
}

impl<'a> Jp2Decoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self { source }
    }

    /// Parses and validates the main header without decoding any tile.
    pub fn read_header(&self) -> Result<CodestreamHeader, Jp2Error> {
        codestream::read_header(self.source)
    }

    /// Decode the codestream into a raster.
    ///
    /// Tiles are parsed and reconstructed one at a time, so apart from the
    /// output only a single tile's coefficients are held in memory.
    pub fn decode(&self) -> Result<RasterImage, Jp2Error> {
        let mut stream = CodestreamReader::new(self.source)?;
        let header = stream.header().clone();
        debug!(
            width = header.width,
            height = header.height,
            channels = header.format.channels(),
            kernel = ?header.kernel,
            tiles = header.tile_grid().tile_count(),
            "decoding"
        );

        let stage = TransformStage::with_component_transform(
            header.kernel,
            header.levels(),
            header.component_transform,
        );
        let mut image = RasterImage::filled(header.width, header.height, header.format, 0)?;
        while let Some(tile) = stream.next_tile()? {
            trace!(tile = tile.rect.index, bytes = tile.body_length, "reconstructing tile");
            let rect = tile.rect;
            let blocks = tile
                .blocks
                .into_iter()
                .map(|block| quantization::invert(&header.plan, &block))
                .collect::<Result<Vec<_>, _>>()?;
            let pixels = stage.inverse(&blocks, header.format)?;
            image.paste(&pixels, rect.x, rect.y)?;
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamFault;
    use crate::jp2::Jp2Encoder;
    use crate::raster::PixelFormat;

    #[test]
    fn test_lossless_round_trip() {
        let samples: Vec<u8> = (0..30 * 20 * 3).map(|i| (i * 13 % 251) as u8).collect();
        let image = RasterImage::new(30, 20, PixelFormat::Rgb8, samples).unwrap();
        let bytes = Jp2Encoder::new(&image)
            .set_visual_quality(100.0)
            .set_tile_size(16, 8)
            .encode()
            .unwrap();
        assert_eq!(Jp2Decoder::new(&bytes).decode().unwrap(), image);
    }

    #[test]
    fn test_header_carries_comment() {
        let image = RasterImage::filled(3, 3, PixelFormat::Gray8, 77).unwrap();
        let bytes = Jp2Encoder::new(&image).set_comment("photo").encode().unwrap();
        let header = Jp2Decoder::new(&bytes).read_header().unwrap();
        assert_eq!(header.comment.as_deref(), Some("photo"));
        assert_eq!(header.format, PixelFormat::Gray8);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(
            Jp2Decoder::new(&[]).decode(),
            Err(Jp2Error::CorruptStream(StreamFault::MissingSignature))
        );
    }
}
