//! Context modelling of quantized sub-band coefficients on top of the MQ coder.
//!
//! Each sub-band is coded on its own with fresh contexts, visiting
//! coefficients in raster order:
//!
//! 1. significance, in one of three contexts chosen by how many of the left
//!    and upper neighbours are non-zero;
//! 2. sign;
//! 3. the exponent of the magnitude (`floor(log2 |v|)`) in unary, one
//!    adaptive context per position;
//! 4. the bits below the leading one, in the uniform context.

use super::mq_coder::{MqContext, MqDecoder, MqEncoder};

const SIGNIFICANCE_CONTEXTS: usize = 3;
const EXPONENT_CONTEXTS: usize = 16;
/// Largest exponent of an `i32` magnitude; it ends the unary code on its own.
const MAXIMUM_EXPONENT: u32 = 31;

struct SubbandContexts {
    significance: [MqContext; SIGNIFICANCE_CONTEXTS],
    sign: MqContext,
    exponent: [MqContext; EXPONENT_CONTEXTS],
    uniform: MqContext,
}

impl SubbandContexts {
    fn new() -> Self {
        Self {
            significance: [MqContext::default(); SIGNIFICANCE_CONTEXTS],
            sign: MqContext::default(),
            exponent: [MqContext::default(); EXPONENT_CONTEXTS],
            uniform: MqContext::uniform(),
        }
    }

    fn exponent(&mut self, position: u32) -> &mut MqContext {
        &mut self.exponent[(position as usize).min(EXPONENT_CONTEXTS - 1)]
    }
}

fn significance_context(values: &[i32], width: usize, index: usize) -> usize {
    let x = index % width;
    let left = x > 0 && values[index - 1] != 0;
    let up = index >= width && values[index - width] != 0;
    usize::from(left) + usize::from(up)
}

/// Codes the `width` x `height` coefficients of one sub-band.
pub fn encode_subband(coefficients: &[i32], width: usize) -> Vec<u8> {
    let mut encoder = MqEncoder::new();
    let mut cx = SubbandContexts::new();
    let width = width.max(1);

    for (index, &value) in coefficients.iter().enumerate() {
        let sig = significance_context(coefficients, width, index);
        if value == 0 {
            encoder.encode(0, &mut cx.significance[sig]);
            continue;
        }
        encoder.encode(1, &mut cx.significance[sig]);
        encoder.encode(u8::from(value < 0), &mut cx.sign);

        let magnitude = value.unsigned_abs();
        let exponent = magnitude.ilog2();
        for position in 0..exponent {
            encoder.encode(1, cx.exponent(position));
        }
        if exponent < MAXIMUM_EXPONENT {
            encoder.encode(0, cx.exponent(exponent));
        }
        for bit in (0..exponent).rev() {
            encoder.encode(((magnitude >> bit) & 1) as u8, &mut cx.uniform);
        }
    }
    encoder.finish()
}

/// Decodes `count` coefficients of a sub-band `width` samples wide.
///
/// Any byte sequence decodes to some set of values; whether the payload was
/// consistent is established by the framing around it.
pub fn decode_subband(payload: &[u8], width: usize, count: usize) -> Vec<i32> {
    let mut decoder = MqDecoder::new(payload);
    let mut cx = SubbandContexts::new();
    let width = width.max(1);
    let mut values = vec![0i32; count];

    for index in 0..count {
        let sig = significance_context(&values, width, index);
        if decoder.decode(&mut cx.significance[sig]) == 0 {
            continue;
        }
        let negative = decoder.decode(&mut cx.sign) == 1;

        let mut exponent = 0;
        while exponent < MAXIMUM_EXPONENT && decoder.decode(cx.exponent(exponent)) == 1 {
            exponent += 1;
        }
        let mut magnitude: u32 = 1;
        for _ in 0..exponent {
            magnitude = (magnitude << 1) | u32::from(decoder.decode(&mut cx.uniform));
        }

        let magnitude = i64::from(magnitude);
        let value = if negative { -magnitude } else { magnitude };
        values[index] = value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    }
    values
}
