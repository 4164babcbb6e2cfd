//! Transform stage: level shift, component transform and wavelet
//! decomposition of a tile into one coefficient block per channel.

use tracing::trace;

use super::color::{self, ComponentTransform};
use super::dwt::{self, Dwt53, FloatLifting, WaveletKernel};
use super::subband::{CoefficientBlock, decomposition_levels};
use crate::constants::{LEVEL_SHIFT, MAXIMUM_SAMPLE_VALUE};
use crate::error::Jp2Error;
use crate::raster::{PixelFormat, RasterImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformStage {
    kernel: WaveletKernel,
    levels: u8,
    component_transform: ComponentTransform,
}

impl TransformStage {
    /// A stage decomposing up to `levels` times with `kernel`, applying the
    /// component transform that matches `format`.
    pub fn new(kernel: WaveletKernel, levels: u8, format: PixelFormat) -> Self {
        Self {
            kernel,
            levels,
            component_transform: ComponentTransform::for_image(kernel, format),
        }
    }

    /// A stage with an explicit component transform, as recorded in a header.
    pub fn with_component_transform(
        kernel: WaveletKernel,
        levels: u8,
        component_transform: ComponentTransform,
    ) -> Self {
        Self {
            kernel,
            levels,
            component_transform,
        }
    }

    pub fn component_transform(&self) -> ComponentTransform {
        self.component_transform
    }

    /// Decomposes every channel of `image` into sub-bands.
    pub fn forward(&self, image: &RasterImage) -> Result<Vec<CoefficientBlock>, Jp2Error> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        if width == 0 || height == 0 {
            return Err(Jp2Error::InvalidDimensions {
                width: image.width(),
                height: image.height(),
            });
        }
        let levels = decomposition_levels(width, height, self.levels);
        trace!(width, height, levels, kernel = ?self.kernel, "forward transform");

        let planes = split_planes(image);
        let blocks = match self.kernel {
            WaveletKernel::Reversible53 => {
                let mut planes = planes;
                if self.component_transform == ComponentTransform::Reversible {
                    color::forward_rct(&mut planes);
                }
                planes
                    .into_iter()
                    .map(|mut plane| {
                        dwt::forward_2d(&Dwt53, &mut plane, width, height, levels);
                        let plane: Vec<f32> = plane.into_iter().map(|v| v as f32).collect();
                        CoefficientBlock::from_plane(&plane, width, height, levels)
                    })
                    .collect()
            }
            WaveletKernel::Irreversible97 => {
                let mut planes: Vec<Vec<f32>> = planes
                    .into_iter()
                    .map(|plane| plane.into_iter().map(|v| v as f32).collect())
                    .collect();
                if self.component_transform == ComponentTransform::Irreversible {
                    color::forward_ict(&mut planes);
                }
                planes
                    .into_iter()
                    .map(|mut plane| {
                        dwt::forward_2d(&FloatLifting::CDF_97, &mut plane, width, height, levels);
                        CoefficientBlock::from_plane(&plane, width, height, levels)
                    })
                    .collect()
            }
        };
        Ok(blocks)
    }

    /// Rebuilds a raster of `format` from one coefficient block per channel.
    pub fn inverse(
        &self,
        blocks: &[CoefficientBlock],
        format: PixelFormat,
    ) -> Result<RasterImage, Jp2Error> {
        let first = blocks.first().ok_or(Jp2Error::InvalidChannelCount(0))?;
        if blocks.len() != format.channels() {
            return Err(Jp2Error::InvalidChannelCount(blocks.len() as u8));
        }
        let (width, height, levels) = (first.width, first.height, first.levels);
        let dims_error = Jp2Error::InvalidDimensions {
            width: width as u32,
            height: height as u32,
        };
        if width == 0
            || height == 0
            || blocks
                .iter()
                .any(|b| b.width != width || b.height != height || b.levels != levels)
        {
            return Err(dims_error);
        }
        trace!(width, height, levels, kernel = ?self.kernel, "inverse transform");

        let planes: Vec<Vec<i32>> = match self.kernel {
            WaveletKernel::Reversible53 => {
                let mut planes: Vec<Vec<i32>> = blocks
                    .iter()
                    .map(|block| {
                        let mut plane: Vec<i32> =
                            block.to_plane().into_iter().map(|v| v.round() as i32).collect();
                        dwt::inverse_2d(&Dwt53, &mut plane, width, height, levels);
                        plane
                    })
                    .collect();
                if self.component_transform == ComponentTransform::Reversible {
                    color::inverse_rct(&mut planes);
                }
                planes
            }
            WaveletKernel::Irreversible97 => {
                let mut planes: Vec<Vec<f32>> = blocks
                    .iter()
                    .map(|block| {
                        let mut plane = block.to_plane();
                        dwt::inverse_2d(&FloatLifting::CDF_97, &mut plane, width, height, levels);
                        plane
                    })
                    .collect();
                if self.component_transform == ComponentTransform::Irreversible {
                    color::inverse_ict(&mut planes);
                }
                planes
                    .into_iter()
                    .map(|plane| plane.into_iter().map(|v| v.round() as i32).collect())
                    .collect()
            }
        };

        RasterImage::new(width as u32, height as u32, format, merge_planes(&planes))
    }
}

/// De-interleaves samples into level-shifted planes, one per channel.
fn split_planes(image: &RasterImage) -> Vec<Vec<i32>> {
    let channels = image.channels();
    (0..channels)
        .map(|c| {
            image
                .samples()
                .iter()
                .skip(c)
                .step_by(channels)
                .map(|&s| s as i32 - LEVEL_SHIFT)
                .collect()
        })
        .collect()
}

/// Undoes the level shift, clamps and interleaves the planes again.
fn merge_planes(planes: &[Vec<i32>]) -> Vec<u8> {
    let pixels = planes.first().map_or(0, Vec::len);
    let mut samples = Vec::with_capacity(pixels * planes.len());
    for i in 0..pixels {
        for plane in planes {
            samples.push((plane[i].saturating_add(LEVEL_SHIFT)).clamp(0, MAXIMUM_SAMPLE_VALUE) as u8);
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(width: u32, height: u32, format: PixelFormat) -> RasterImage {
        let count = (width * height) as usize * format.channels();
        let samples = (0..count).map(|i| ((i * 97 + i / 7) % 256) as u8).collect();
        RasterImage::new(width, height, format, samples).unwrap()
    }

    #[test]
    fn test_reversible_stage_is_lossless() {
        for format in [PixelFormat::Gray8, PixelFormat::Rgb8] {
            let image = test_image(23, 17, format);
            let stage = TransformStage::new(WaveletKernel::Reversible53, 5, format);
            let blocks = stage.forward(&image).unwrap();
            assert_eq!(blocks.len(), format.channels());
            assert_eq!(blocks[0].levels, 4);
            let restored = stage.inverse(&blocks, format).unwrap();
            assert_eq!(restored, image);
        }
    }

    #[test]
    fn test_irreversible_stage_round_trip() {
        let image = test_image(20, 12, PixelFormat::Rgb8);
        let stage = TransformStage::new(WaveletKernel::Irreversible97, 3, PixelFormat::Rgb8);
        assert_eq!(stage.component_transform(), ComponentTransform::Irreversible);
        let blocks = stage.forward(&image).unwrap();
        let restored = stage.inverse(&blocks, PixelFormat::Rgb8).unwrap();
        for (a, b) in restored.samples().iter().zip(image.samples()) {
            assert!((*a as i32 - *b as i32).abs() <= 1);
        }
    }

    #[test]
    fn test_single_pixel() {
        let image = RasterImage::new(1, 1, PixelFormat::Gray8, vec![200]).unwrap();
        let stage = TransformStage::new(WaveletKernel::Reversible53, 5, PixelFormat::Gray8);
        let blocks = stage.forward(&image).unwrap();
        assert_eq!(blocks[0].levels, 0);
        assert_eq!(blocks[0].subbands.len(), 1);
        assert_eq!(blocks[0].subbands[0].coefficients, vec![72.0]);
        assert_eq!(stage.inverse(&blocks, PixelFormat::Gray8).unwrap(), image);
    }

    #[test]
    fn test_inverse_rejects_mismatched_blocks() {
        let stage = TransformStage::new(WaveletKernel::Reversible53, 2, PixelFormat::Gray8);
        assert_eq!(
            stage.inverse(&[], PixelFormat::Gray8),
            Err(Jp2Error::InvalidChannelCount(0))
        );
        let empty = CoefficientBlock::<f32>::zeroed(0, 4, 0);
        assert_eq!(
            stage.inverse(&[empty], PixelFormat::Gray8),
            Err(Jp2Error::InvalidDimensions {
                width: 0,
                height: 4
            })
        );
    }
}
