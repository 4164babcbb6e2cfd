//! Multiple component transforms applied to RGB tiles before the wavelet
//! transform.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::dwt::WaveletKernel;
use crate::raster::PixelFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ComponentTransform {
    #[default]
    None = 0,
    /// Reversible color transform (integer, pairs with the 5/3 kernel).
    Reversible = 1,
    /// Irreversible YCbCr transform (pairs with the 9/7 kernel).
    Irreversible = 2,
}

impl ComponentTransform {
    /// The transform an image of `format` gets under `kernel`.
    pub fn for_image(kernel: WaveletKernel, format: PixelFormat) -> Self {
        match (format, kernel) {
            (PixelFormat::Gray8, _) => Self::None,
            (PixelFormat::Rgb8, WaveletKernel::Reversible53) => Self::Reversible,
            (PixelFormat::Rgb8, WaveletKernel::Irreversible97) => Self::Irreversible,
        }
    }
}

/// RCT: Y = floor((R + 2G + B) / 4), Cb = B - G, Cr = R - G
pub fn forward_rct(planes: &mut [Vec<i32>]) {
    let [r, g, b] = planes else {
        return;
    };
    for i in 0..r.len() {
        let (red, green, blue) = (r[i], g[i], b[i]);
        r[i] = (red + 2 * green + blue) >> 2;
        g[i] = blue - green;
        b[i] = red - green;
    }
}

pub fn inverse_rct(planes: &mut [Vec<i32>]) {
    let [y, cb, cr] = planes else {
        return;
    };
    for i in 0..y.len() {
        let green = y[i].wrapping_sub(cb[i].wrapping_add(cr[i]) >> 2);
        let red = cr[i].wrapping_add(green);
        let blue = cb[i].wrapping_add(green);
        y[i] = red;
        cb[i] = green;
        cr[i] = blue;
    }
}

pub fn forward_ict(planes: &mut [Vec<f32>]) {
    let [r, g, b] = planes else {
        return;
    };
    for i in 0..r.len() {
        let (red, green, blue) = (r[i], g[i], b[i]);
        r[i] = 0.299 * red + 0.587 * green + 0.114 * blue;
        g[i] = -0.168_736 * red - 0.331_264 * green + 0.5 * blue;
        b[i] = 0.5 * red - 0.418_688 * green - 0.081_312 * blue;
    }
}

pub fn inverse_ict(planes: &mut [Vec<f32>]) {
    let [y, cb, cr] = planes else {
        return;
    };
    for i in 0..y.len() {
        let (luma, blue_diff, red_diff) = (y[i], cb[i], cr[i]);
        y[i] = luma + 1.402 * red_diff;
        cb[i] = luma - 0.344_136 * blue_diff - 0.714_136 * red_diff;
        cr[i] = luma + 1.772 * blue_diff;
    }
}
