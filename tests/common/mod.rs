//! Synthetic images shared by the integration tests.
#![allow(dead_code)]

use jp2codec::{PixelFormat, RasterImage};

pub fn gradient(width: u32, height: u32, format: PixelFormat) -> RasterImage {
    let channels = format.channels() as u32;
    let mut samples = Vec::with_capacity((width * height * channels) as usize);
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let v = (x * 255 / width.max(2)) + (y * 128 / height.max(2)) + c * 40;
                samples.push((v % 256) as u8);
            }
        }
    }
    RasterImage::new(width, height, format, samples).unwrap()
}

pub fn checkerboard(width: u32, height: u32, cell: u32) -> RasterImage {
    let samples = (0..height)
        .flat_map(|y| (0..width).map(move |x| if (x / cell + y / cell) % 2 == 0 { 230 } else { 20 }))
        .collect();
    RasterImage::new(width, height, PixelFormat::Gray8, samples).unwrap()
}

/// Deterministic xorshift noise.
pub fn noise(width: u32, height: u32, format: PixelFormat, seed: u32) -> RasterImage {
    let mut state = seed.max(1);
    let count = (width * height) as usize * format.channels();
    let samples = (0..count)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect();
    RasterImage::new(width, height, format, samples).unwrap()
}

/// A smooth image with some texture, closer to a photo than pure noise.
pub fn photo_like(width: u32, height: u32, format: PixelFormat) -> RasterImage {
    let base = gradient(width, height, format);
    let grain = noise(width, height, format, 0xC0FFEE);
    let samples = base
        .samples()
        .iter()
        .zip(grain.samples())
        .map(|(&b, &n)| (b as i32 + (n as i32 - 128) / 16).clamp(0, 255) as u8)
        .collect();
    RasterImage::new(width, height, format, samples).unwrap()
}
