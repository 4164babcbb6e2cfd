//! 8-bit raster images as handed to the encoder and returned by the decoder.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::Jp2Error;

/// Sample layout of a raster. The discriminant is the channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PixelFormat {
    /// One 8-bit luma sample per pixel.
    #[default]
    Gray8 = 1,
    /// Three interleaved 8-bit samples (R, G, B) per pixel.
    Rgb8 = 3,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        u8::from(self) as usize
    }

    pub fn from_channels(channels: u8) -> Result<Self, Jp2Error> {
        Self::try_from(channels).map_err(|_| Jp2Error::InvalidChannelCount(channels))
    }
}

/// A row-major, channel-interleaved 8-bit image with non-zero dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    format: PixelFormat,
    samples: Vec<u8>,
}

impl RasterImage {
    /// Wraps `samples` after checking them against the declared geometry.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        samples: Vec<u8>,
    ) -> Result<Self, Jp2Error> {
        let expected = Self::sample_count(width, height, format)?;
        if samples.len() != expected {
            return Err(Jp2Error::SampleBufferSize {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            samples,
        })
    }

    /// An image with every sample set to `value`.
    pub fn filled(
        width: u32,
        height: u32,
        format: PixelFormat,
        value: u8,
    ) -> Result<Self, Jp2Error> {
        let count = Self::sample_count(width, height, format)?;
        Self::new(width, height, format, vec![value; count])
    }

    /// Number of samples a `width` x `height` image of `format` holds.
    pub fn sample_count(width: u32, height: u32, format: PixelFormat) -> Result<usize, Jp2Error> {
        if width == 0 || height == 0 {
            return Err(Jp2Error::InvalidDimensions { width, height });
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(format.channels()))
            .ok_or(Jp2Error::InvalidDimensions { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Size of the sample buffer in bytes.
    pub fn byte_count(&self) -> usize {
        self.samples.len()
    }

    pub fn sample(&self, x: u32, y: u32, channel: usize) -> u8 {
        let index = (y as usize * self.width as usize + x as usize) * self.channels() + channel;
        self.samples[index]
    }

    /// Copies the `width` x `height` window at (`x`, `y`) into a new image.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Self, Jp2Error> {
        if x.saturating_add(width) > self.width || y.saturating_add(height) > self.height {
            return Err(Jp2Error::InvalidDimensions { width, height });
        }
        let channels = self.channels();
        let row_len = width as usize * channels;
        let mut samples = Vec::with_capacity(Self::sample_count(width, height, self.format)?);
        for row in y..y + height {
            let start = (row as usize * self.width as usize + x as usize) * channels;
            samples.extend_from_slice(&self.samples[start..start + row_len]);
        }
        Self::new(width, height, self.format, samples)
    }

    /// Writes `tile` into this image with its top-left corner at (`x`, `y`).
    pub fn paste(&mut self, tile: &RasterImage, x: u32, y: u32) -> Result<(), Jp2Error> {
        if tile.format != self.format
            || x.saturating_add(tile.width) > self.width
            || y.saturating_add(tile.height) > self.height
        {
            return Err(Jp2Error::InvalidDimensions {
                width: tile.width,
                height: tile.height,
            });
        }
        let channels = self.channels();
        let row_len = tile.width as usize * channels;
        for row in 0..tile.height as usize {
            let dst = ((y as usize + row) * self.width as usize + x as usize) * channels;
            let src = row * row_len;
            self.samples[dst..dst + row_len].copy_from_slice(&tile.samples[src..src + row_len]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_geometry() {
        assert_eq!(
            RasterImage::new(0, 4, PixelFormat::Gray8, vec![]),
            Err(Jp2Error::InvalidDimensions {
                width: 0,
                height: 4
            })
        );
        assert_eq!(
            RasterImage::new(2, 2, PixelFormat::Rgb8, vec![0; 4]),
            Err(Jp2Error::SampleBufferSize {
                expected: 12,
                actual: 4
            })
        );
        assert!(RasterImage::new(2, 2, PixelFormat::Rgb8, vec![0; 12]).is_ok());
    }

    #[test]
    fn test_pixel_format_from_channels() {
        assert_eq!(PixelFormat::from_channels(1), Ok(PixelFormat::Gray8));
        assert_eq!(PixelFormat::from_channels(3), Ok(PixelFormat::Rgb8));
        assert_eq!(
            PixelFormat::from_channels(4),
            Err(Jp2Error::InvalidChannelCount(4))
        );
    }

    #[test]
    fn test_crop_and_paste() {
        let samples: Vec<u8> = (0..16).collect();
        let image = RasterImage::new(4, 4, PixelFormat::Gray8, samples).unwrap();

        let window = image.crop(1, 2, 3, 2).unwrap();
        assert_eq!(window.samples(), &[9, 10, 11, 13, 14, 15]);

        let mut canvas = RasterImage::filled(4, 4, PixelFormat::Gray8, 0).unwrap();
        canvas.paste(&window, 1, 2).unwrap();
        assert_eq!(canvas.sample(1, 2, 0), 9);
        assert_eq!(canvas.sample(3, 3, 0), 15);
        assert_eq!(canvas.sample(0, 0, 0), 0);

        assert!(image.crop(2, 2, 3, 1).is_err());
    }
}
