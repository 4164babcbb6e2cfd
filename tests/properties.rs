//! Property tests over random geometry, quality and kernel.

mod common;

use common::noise;
use jp2codec::jp2::plan_for;
use jp2codec::{Jp2Encoder, PixelFormat, WaveletKernel, decode};
use proptest::prelude::*;

fn format_strategy() -> impl Strategy<Value = PixelFormat> {
    prop_oneof![Just(PixelFormat::Gray8), Just(PixelFormat::Rgb8)]
}

fn kernel_strategy() -> impl Strategy<Value = WaveletKernel> {
    prop_oneof![
        Just(WaveletKernel::Reversible53),
        Just(WaveletKernel::Irreversible97)
    ]
}

/// Image dimensions, kept small for speed.
fn dimensions_strategy() -> impl Strategy<Value = (u32, u32)> {
    (1u32..40, 1u32..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Decoding restores width, height and channel count.
    #[test]
    fn prop_geometry_round_trips(
        (width, height) in dimensions_strategy(),
        format in format_strategy(),
        kernel in kernel_strategy(),
        quality in 0u8..=100,
        seed in 1u32..u32::MAX,
    ) {
        let image = noise(width, height, format, seed);
        let bytes = Jp2Encoder::new(&image)
            .set_visual_quality(f32::from(quality))
            .set_kernel(kernel)
            .encode()
            .unwrap();
        let decoded = decode(&bytes).unwrap();
        prop_assert_eq!(decoded.width(), width);
        prop_assert_eq!(decoded.height(), height);
        prop_assert_eq!(decoded.format(), format);
    }

    /// The reversible kernel at full quality is lossless.
    #[test]
    fn prop_reversible_is_lossless(
        (width, height) in dimensions_strategy(),
        format in format_strategy(),
        levels in 0u8..=6,
        seed in 1u32..u32::MAX,
    ) {
        let image = noise(width, height, format, seed);
        let bytes = Jp2Encoder::new(&image)
            .set_visual_quality(100.0)
            .set_decomposition_levels(levels)
            .encode()
            .unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), image);
    }

    /// A higher quality never yields a coarser step for any sub-band.
    #[test]
    fn prop_plan_is_monotonic(
        low in 0.0f32..=100.0,
        high in 0.0f32..=100.0,
        levels in 0u8..=16,
        kernel in kernel_strategy(),
    ) {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let coarse = plan_for(low, levels, kernel).unwrap();
        let fine = plan_for(high, levels, kernel).unwrap();
        for (c, f) in coarse.steps().iter().zip(fine.steps()) {
            prop_assert!(c >= f, "q {} -> {}, {} < {}", low, high, c, f);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Any strict prefix of a codestream is reported as corrupt.
    #[test]
    fn prop_truncation_is_corrupt(
        (width, height) in dimensions_strategy(),
        format in format_strategy(),
        quality in 0u8..=100,
        cut in 0.0f64..1.0,
    ) {
        let image = noise(width, height, format, 12345);
        let bytes = Jp2Encoder::new(&image)
            .set_visual_quality(f32::from(quality))
            .set_tile_size(16, 16)
            .encode()
            .unwrap();
        let len = ((bytes.len() as f64) * cut) as usize;
        let err = decode(&bytes[..len]).unwrap_err();
        prop_assert!(err.is_corrupt_stream(), "{:?}", err);
    }
}
