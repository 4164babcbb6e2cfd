//! Fidelity measures between an original raster and its reconstruction.

use crate::error::Jp2Error;
use crate::raster::RasterImage;

fn check_geometry(a: &RasterImage, b: &RasterImage) -> Result<(), Jp2Error> {
    if a.width() != b.width() || a.height() != b.height() {
        return Err(Jp2Error::InvalidDimensions {
            width: b.width(),
            height: b.height(),
        });
    }
    if a.format() != b.format() {
        return Err(Jp2Error::InvalidChannelCount(b.channels() as u8));
    }
    Ok(())
}

/// Peak signal-to-noise ratio in dB; infinite for identical images.
pub fn psnr(a: &RasterImage, b: &RasterImage) -> Result<f64, Jp2Error> {
    check_geometry(a, b)?;
    let squared: u64 = a
        .samples()
        .iter()
        .zip(b.samples())
        .map(|(&x, &y)| {
            let d = i64::from(x) - i64::from(y);
            (d * d) as u64
        })
        .sum();
    if squared == 0 {
        return Ok(f64::INFINITY);
    }
    let mse = squared as f64 / a.samples().len() as f64;
    Ok(10.0 * (255.0 * 255.0 / mse).log10())
}

/// Largest per-sample absolute difference.
pub fn max_abs_diff(a: &RasterImage, b: &RasterImage) -> Result<u8, Jp2Error> {
    check_geometry(a, b)?;
    Ok(a.samples()
        .iter()
        .zip(b.samples())
        .map(|(&x, &y)| x.abs_diff(y))
        .max()
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::PixelFormat;

    #[test]
    fn test_identical_images() {
        let image = RasterImage::filled(4, 4, PixelFormat::Gray8, 9).unwrap();
        assert_eq!(psnr(&image, &image), Ok(f64::INFINITY));
        assert_eq!(max_abs_diff(&image, &image), Ok(0));
    }

    #[test]
    fn test_known_error() {
        let a = RasterImage::filled(2, 2, PixelFormat::Gray8, 100).unwrap();
        let b = RasterImage::new(2, 2, PixelFormat::Gray8, vec![100, 100, 100, 110]).unwrap();
        assert_eq!(max_abs_diff(&a, &b), Ok(10));
        // MSE = 25
        let db = psnr(&a, &b).unwrap();
        assert!((db - 34.151).abs() < 1e-3, "{}", db);
    }

    #[test]
    fn test_geometry_mismatch() {
        let a = RasterImage::filled(2, 2, PixelFormat::Gray8, 0).unwrap();
        let b = RasterImage::filled(2, 3, PixelFormat::Gray8, 0).unwrap();
        let c = RasterImage::filled(2, 2, PixelFormat::Rgb8, 0).unwrap();
        assert!(psnr(&a, &b).is_err());
        assert!(max_abs_diff(&a, &c).is_err());
    }
}
