//! Encoder façade: Transform -> Quantizer -> Entropy coder, tile by tile.

use tracing::{debug, trace};

use super::codestream::{CodestreamHeader, CodestreamWriter};
use super::dwt::WaveletKernel;
use super::quantization::{self, plan_for};
use super::transform::TransformStage;
use crate::constants::{
    DEFAULT_DECOMPOSITION_LEVELS, DEFAULT_TILE_SIZE, DEFAULT_VISUAL_QUALITY,
    MAXIMUM_COMMENT_LENGTH, MAXIMUM_DECOMPOSITION_LEVELS, MAXIMUM_QUALITY, MAXIMUM_TILE_AREA,
    MINIMUM_QUALITY,
};
use crate::error::Jp2Error;
use crate::raster::RasterImage;

/// Encoding parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderOptions {
    /// 0 (smallest) to 100 (finest; lossless with the 5/3 kernel).
    pub visual_quality: f32,
    pub decomposition_levels: u8,
    pub kernel: WaveletKernel,
    pub tile_width: u32,
    pub tile_height: u32,
    pub comment: Option<String>,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            visual_quality: DEFAULT_VISUAL_QUALITY,
            decomposition_levels: DEFAULT_DECOMPOSITION_LEVELS,
            kernel: WaveletKernel::default(),
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            comment: None,
        }
    }
}

impl EncoderOptions {
    pub fn validate(&self) -> Result<(), Jp2Error> {
        if !(MINIMUM_QUALITY..=MAXIMUM_QUALITY).contains(&self.visual_quality) {
            return Err(Jp2Error::InvalidQuality(self.visual_quality));
        }
        if self.decomposition_levels > MAXIMUM_DECOMPOSITION_LEVELS {
            return Err(Jp2Error::InvalidParameter("decomposition levels exceed 16"));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(Jp2Error::InvalidParameter("tile size must be non-zero"));
        }
        if u64::from(self.tile_width) * u64::from(self.tile_height) > MAXIMUM_TILE_AREA {
            return Err(Jp2Error::InvalidParameter("tile area exceeds 2^24 samples"));
        }
        if self
            .comment
            .as_ref()
            .is_some_and(|c| c.len() > MAXIMUM_COMMENT_LENGTH)
        {
            return Err(Jp2Error::InvalidParameter("comment exceeds 65000 bytes"));
        }
        Ok(())
    }
}

pub struct Jp2Encoder<'a> {
    image: &'a RasterImage,
    options: EncoderOptions,
}

impl<'a> Jp2Encoder<'a> {
    pub fn new(image: &'a RasterImage) -> Self {
        Self::with_options(image, EncoderOptions::default())
    }

    pub fn with_options(image: &'a RasterImage, options: EncoderOptions) -> Self {
        Self { image, options }
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// Set the visual quality (0-100). Checked by [`Self::encode`].
    pub fn set_visual_quality(mut self, quality: f32) -> Self {
        self.options.visual_quality = quality;
        self
    }

    pub fn set_decomposition_levels(mut self, levels: u8) -> Self {
        self.options.decomposition_levels = levels;
        self
    }

    pub fn set_kernel(mut self, kernel: WaveletKernel) -> Self {
        self.options.kernel = kernel;
        self
    }

    pub fn set_tile_size(mut self, width: u32, height: u32) -> Self {
        self.options.tile_width = width;
        self.options.tile_height = height;
        self
    }

    pub fn set_comment(mut self, comment: impl Into<String>) -> Self {
        self.options.comment = Some(comment.into());
        self
    }

    /// Encode the image into a codestream.
    pub fn encode(&self) -> Result<Vec<u8>, Jp2Error> {
        let options = &self.options;
        options.validate()?;
        let image = self.image;
        if image.width() == 0 || image.height() == 0 {
            return Err(Jp2Error::InvalidDimensions {
                width: image.width(),
                height: image.height(),
            });
        }

        let plan = plan_for(options.visual_quality, options.decomposition_levels, options.kernel)?;
        let stage = TransformStage::new(options.kernel, options.decomposition_levels, image.format());
        let header = CodestreamHeader {
            width: image.width(),
            height: image.height(),
            format: image.format(),
            tile_width: options.tile_width,
            tile_height: options.tile_height,
            kernel: options.kernel,
            component_transform: stage.component_transform(),
            plan,
            comment: options.comment.clone(),
        };
        let grid = header.tile_grid();
        debug!(
            width = header.width,
            height = header.height,
            channels = image.channels(),
            quality = options.visual_quality,
            kernel = ?options.kernel,
            tiles = grid.tile_count(),
            "encoding"
        );

        let mut writer = CodestreamWriter::new(&header)?;
        for rect in grid.tiles() {
            trace!(tile = rect.index, x = rect.x, y = rect.y, w = rect.width, h = rect.height, "transforming tile");
            let tile = image.crop(rect.x, rect.y, rect.width, rect.height)?;
            let blocks = stage
                .forward(&tile)?
                .iter()
                .map(|block| quantization::apply(&header.plan, block))
                .collect::<Result<Vec<_>, _>>()?;
            writer.write_tile(&blocks)?;
        }

        let bytes = writer.finish();
        debug!(bytes = bytes.len(), "encoded");
        Ok(bytes)
    }
}
