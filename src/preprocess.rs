//! Raster preparation ahead of encoding: downscaling and grayscale conversion.
//!
//! The codec never calls into this module.

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

use crate::error::Jp2Error;
use crate::raster::{PixelFormat, RasterImage};

/// Resizes `image` to `width` pixels wide with bilinear filtering, keeping
/// the aspect ratio. The height is rounded and never drops below one.
pub fn resize_by_width(image: &RasterImage, width: u32) -> Result<RasterImage, Jp2Error> {
    if width == 0 {
        return Err(Jp2Error::InvalidDimensions {
            width,
            height: image.height(),
        });
    }
    let ratio = f64::from(image.height()) / f64::from(image.width());
    let height = ((f64::from(width) * ratio).round() as u32).max(1);

    if image.width() == width && image.height() == height {
        return Ok(image.clone());
    }

    let buffer_error = || Jp2Error::SampleBufferSize {
        expected: image.byte_count(),
        actual: image.byte_count(),
    };
    let samples = image.samples().to_vec();
    let resized = match image.format() {
        PixelFormat::Gray8 => {
            let source = GrayImage::from_raw(image.width(), image.height(), samples)
                .ok_or_else(buffer_error)?;
            imageops::resize(&source, width, height, FilterType::Triangle).into_raw()
        }
        PixelFormat::Rgb8 => {
            let source = RgbImage::from_raw(image.width(), image.height(), samples)
                .ok_or_else(buffer_error)?;
            imageops::resize(&source, width, height, FilterType::Triangle).into_raw()
        }
    };
    RasterImage::new(width, height, image.format(), resized)
}

/// BT.601 luma of an RGB sample, rounded.
fn luma(r: u8, g: u8, b: u8) -> u8 {
    // 0.299, 0.587, 0.114 in 16.16 fixed point
    let y = 19_595 * u32::from(r) + 38_470 * u32::from(g) + 7_471 * u32::from(b);
    ((y + 32_768) >> 16) as u8
}

/// Converts `image` to 8-bit grayscale. Grayscale input is returned as is.
pub fn to_grayscale(image: &RasterImage) -> Result<RasterImage, Jp2Error> {
    match image.format() {
        PixelFormat::Gray8 => Ok(image.clone()),
        PixelFormat::Rgb8 => {
            let samples = image
                .samples()
                .chunks_exact(3)
                .map(|p| luma(p[0], p[1], p[2]))
                .collect();
            RasterImage::new(image.width(), image.height(), PixelFormat::Gray8, samples)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_preserves_aspect_ratio() {
        let image = RasterImage::filled(400, 300, PixelFormat::Rgb8, 90).unwrap();
        let resized = resize_by_width(&image, 140).unwrap();
        assert_eq!((resized.width(), resized.height()), (140, 105));
        assert_eq!(resized.format(), PixelFormat::Rgb8);
        assert!(resized.samples().iter().all(|&s| s == 90));
    }

    #[test]
    fn test_resize_keeps_height_positive() {
        let image = RasterImage::filled(1000, 2, PixelFormat::Gray8, 5).unwrap();
        let resized = resize_by_width(&image, 10).unwrap();
        assert_eq!((resized.width(), resized.height()), (10, 1));
        assert!(resize_by_width(&image, 0).is_err());
    }

    #[test]
    fn test_grayscale() {
        let image =
            RasterImage::new(3, 1, PixelFormat::Rgb8, vec![255, 0, 0, 0, 255, 0, 255, 255, 255])
                .unwrap();
        let gray = to_grayscale(&image).unwrap();
        assert_eq!(gray.format(), PixelFormat::Gray8);
        assert_eq!(gray.samples(), &[76, 150, 255]);
        assert_eq!(to_grayscale(&gray).unwrap(), gray);
    }
}
