//! Discrete Wavelet Transforms (5-3 and 9-7) computed by lifting.
//!
//! Signals are extended symmetrically at both ends, so lines of any length
//! (odd lengths included) transform without padding. A forward pass leaves the
//! low-pass half in the first `ceil(n / 2)` samples of a line and the
//! high-pass half after it; the 2D transforms repeat this on rows and then
//! columns of a shrinking top-left region (Mallat layout).

use std::sync::OnceLock;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::subband::SubbandId;
use crate::constants::MAXIMUM_TILE_AREA;

/// Wavelet filter applied by the transform stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum WaveletKernel {
    /// Le Gall 5/3 integer lifting; exactly invertible.
    #[default]
    Reversible53 = 0,
    /// CDF 9/7 floating point lifting.
    Irreversible97 = 1,
}

/// An in-place lifting scheme over interleaved samples: even positions end
/// up low-pass, odd positions high-pass.
pub trait LiftingKernel {
    type Sample: Copy + Default;

    fn analyze(&self, line: &mut [Self::Sample]);

    fn synthesize(&self, line: &mut [Self::Sample]);
}

/// Reversible 5/3 transform on integers.
pub struct Dwt53;

impl LiftingKernel for Dwt53 {
    type Sample = i32;

    fn analyze(&self, x: &mut [i32]) {
        let n = x.len();
        if n < 2 {
            return;
        }
        // Prediction: y[2n+1] = x[2n+1] - floor((x[2n] + x[2n+2]) / 2)
        for i in (1..n).step_by(2) {
            let right = if i + 1 < n { x[i + 1] } else { x[i - 1] };
            x[i] = x[i].wrapping_sub(x[i - 1].wrapping_add(right) >> 1);
        }
        // Update: y[2n] = x[2n] + floor((y[2n-1] + y[2n+1] + 2) / 4)
        for i in (0..n).step_by(2) {
            let left = if i > 0 { x[i - 1] } else { x[i + 1] };
            let right = if i + 1 < n { x[i + 1] } else { x[i - 1] };
            x[i] = x[i].wrapping_add(left.wrapping_add(right).wrapping_add(2) >> 2);
        }
    }

    fn synthesize(&self, x: &mut [i32]) {
        let n = x.len();
        if n < 2 {
            return;
        }
        // Coefficients from a damaged stream can be arbitrarily large; wrap.
        for i in (0..n).step_by(2) {
            let left = if i > 0 { x[i - 1] } else { x[i + 1] };
            let right = if i + 1 < n { x[i + 1] } else { x[i - 1] };
            x[i] = x[i].wrapping_sub(left.wrapping_add(right).wrapping_add(2) >> 2);
        }
        for i in (1..n).step_by(2) {
            let right = if i + 1 < n { x[i + 1] } else { x[i - 1] };
            x[i] = x[i].wrapping_add(x[i - 1].wrapping_add(right) >> 1);
        }
    }
}

/// Floating point lifting with alternating odd/even steps followed by a
/// `1/K` (low) and `K` (high) normalization.
pub struct FloatLifting {
    steps: &'static [f32],
    k: f32,
}

impl FloatLifting {
    /// CDF 9/7, as used by the irreversible path.
    pub const CDF_97: Self = Self {
        steps: &[-1.586_134_3, -0.052_980_12, 0.882_911_1, 0.443_506_87],
        k: 1.230_174_1,
    };

    /// Le Gall 5/3 without integer rounding. Only used to measure basis norms
    /// of the reversible transform.
    pub const LE_GALL_53: Self = Self {
        steps: &[-0.5, 0.25],
        k: 1.0,
    };

    fn lift(x: &mut [f32], parity: usize, coefficient: f32) {
        let n = x.len();
        for i in (parity..n).step_by(2) {
            let left = if i > 0 { x[i - 1] } else { x[i + 1] };
            let right = if i + 1 < n { x[i + 1] } else { x[i - 1] };
            x[i] += coefficient * (left + right);
        }
    }
}

impl LiftingKernel for FloatLifting {
    type Sample = f32;

    fn analyze(&self, x: &mut [f32]) {
        if x.len() < 2 {
            return;
        }
        for (i, &step) in self.steps.iter().enumerate() {
            // Odd samples first, then even, alternating.
            Self::lift(x, 1 - i % 2, step);
        }
        let inv_k = 1.0 / self.k;
        for (i, v) in x.iter_mut().enumerate() {
            *v *= if i % 2 == 0 { inv_k } else { self.k };
        }
    }

    fn synthesize(&self, x: &mut [f32]) {
        if x.len() < 2 {
            return;
        }
        let inv_k = 1.0 / self.k;
        for (i, v) in x.iter_mut().enumerate() {
            *v *= if i % 2 == 0 { self.k } else { inv_k };
        }
        for (i, &step) in self.steps.iter().enumerate().rev() {
            Self::lift(x, 1 - i % 2, -step);
        }
    }
}

/// Forward 1D transform of `line`, leaving low-pass then high-pass halves.
pub fn forward_1d<K: LiftingKernel>(kernel: &K, line: &mut [K::Sample], scratch: &mut Vec<K::Sample>) {
    if line.len() < 2 {
        return;
    }
    kernel.analyze(line);
    scratch.clear();
    scratch.extend(line.iter().step_by(2));
    scratch.extend(line.iter().skip(1).step_by(2));
    line.copy_from_slice(scratch);
}

/// Inverse of [`forward_1d`].
pub fn inverse_1d<K: LiftingKernel>(kernel: &K, line: &mut [K::Sample], scratch: &mut Vec<K::Sample>) {
    let n = line.len();
    if n < 2 {
        return;
    }
    let low_len = n.div_ceil(2);
    scratch.clear();
    scratch.resize(n, K::Sample::default());
    for (k, &v) in line[..low_len].iter().enumerate() {
        scratch[2 * k] = v;
    }
    for (k, &v) in line[low_len..].iter().enumerate() {
        scratch[2 * k + 1] = v;
    }
    kernel.synthesize(scratch);
    line.copy_from_slice(scratch);
}

/// Region size before each decomposition level; entry 0 is the full plane.
fn level_dims(width: usize, height: usize, levels: u8) -> Vec<(usize, usize)> {
    let mut dims = vec![(width, height)];
    for _ in 0..levels {
        let (w, h) = dims[dims.len() - 1];
        dims.push((w.div_ceil(2), h.div_ceil(2)));
    }
    dims
}

/// Decomposes a `width` x `height` plane in place, `levels` times.
pub fn forward_2d<K: LiftingKernel>(
    kernel: &K,
    plane: &mut [K::Sample],
    width: usize,
    height: usize,
    levels: u8,
) {
    let dims = level_dims(width, height, levels);
    let mut scratch = Vec::with_capacity(width.max(height));
    let mut column = Vec::with_capacity(height);

    for &(w, h) in &dims[..levels as usize] {
        for y in 0..h {
            let row = &mut plane[y * width..y * width + w];
            forward_1d(kernel, row, &mut scratch);
        }
        for x in 0..w {
            column.clear();
            column.extend((0..h).map(|y| plane[y * width + x]));
            forward_1d(kernel, &mut column, &mut scratch);
            for (y, &v) in column.iter().enumerate() {
                plane[y * width + x] = v;
            }
        }
    }
}

/// Inverse of [`forward_2d`]: columns then rows, from the coarsest level up.
pub fn inverse_2d<K: LiftingKernel>(
    kernel: &K,
    plane: &mut [K::Sample],
    width: usize,
    height: usize,
    levels: u8,
) {
    let dims = level_dims(width, height, levels);
    let mut scratch = Vec::with_capacity(width.max(height));
    let mut column = Vec::with_capacity(height);

    for &(w, h) in dims[..levels as usize].iter().rev() {
        for x in 0..w {
            column.clear();
            column.extend((0..h).map(|y| plane[y * width + x]));
            inverse_1d(kernel, &mut column, &mut scratch);
            for (y, &v) in column.iter().enumerate() {
                plane[y * width + x] = v;
            }
        }
        for y in 0..h {
            let row = &mut plane[y * width..y * width + w];
            inverse_1d(kernel, row, &mut scratch);
        }
    }
}

/// Deepest decomposition any tile can reach: a tile of at most
/// `MAXIMUM_TILE_AREA` samples has a side of at most `2^12`.
pub const MAXIMUM_REACHABLE_LEVELS: u8 = (MAXIMUM_TILE_AREA.ilog2() / 2) as u8;

/// L2 norms of the 1D synthesis basis functions of the low-pass (or
/// high-pass) band at levels `1..=levels`, measured by reconstructing a
/// single impulse far from the boundaries. Each level is the previous one
/// upsampled and synthesized once more.
fn basis_norms_1d(lifting: &FloatLifting, levels: u8, high: bool) -> Vec<f64> {
    const BAND: usize = 32;
    let l2 = |line: &[f32]| {
        line.iter()
            .map(|&v| f64::from(v) * f64::from(v))
            .sum::<f64>()
            .sqrt()
    };

    let mut norms = Vec::with_capacity(levels as usize);
    if levels == 0 {
        return norms;
    }
    let mut current = vec![0.0f32; 2 * BAND];
    // Interleaved: low-pass at even positions, high-pass at odd.
    current[2 * (BAND / 2) + usize::from(high)] = 1.0;
    lifting.synthesize(&mut current);
    norms.push(l2(&current));

    for _ in 1..levels {
        let mut next = vec![0.0f32; current.len() * 2];
        for (k, &v) in current.iter().enumerate() {
            next[2 * k] = v;
        }
        lifting.synthesize(&mut next);
        current = next;
        norms.push(l2(&current));
    }
    norms
}

/// Per-level 1D basis norms of a kernel, indexed `[level - 1]`.
///
/// Computed once per kernel up to [`MAXIMUM_REACHABLE_LEVELS`]. Deeper bands
/// never hold coefficients and reuse the deepest norm.
pub struct BasisNorms {
    low: Vec<f64>,
    high: Vec<f64>,
}

static REVERSIBLE_NORMS: OnceLock<BasisNorms> = OnceLock::new();
static IRREVERSIBLE_NORMS: OnceLock<BasisNorms> = OnceLock::new();

impl BasisNorms {
    fn compute(lifting: &FloatLifting) -> Self {
        Self {
            low: basis_norms_1d(lifting, MAXIMUM_REACHABLE_LEVELS, false),
            high: basis_norms_1d(lifting, MAXIMUM_REACHABLE_LEVELS, true),
        }
    }

    pub fn for_kernel(kernel: WaveletKernel) -> &'static Self {
        match kernel {
            WaveletKernel::Reversible53 => {
                REVERSIBLE_NORMS.get_or_init(|| Self::compute(&FloatLifting::LE_GALL_53))
            }
            WaveletKernel::Irreversible97 => {
                IRREVERSIBLE_NORMS.get_or_init(|| Self::compute(&FloatLifting::CDF_97))
            }
        }
    }

    /// L2 norm of the 2D synthesis basis function of sub-band `id`.
    pub fn subband(&self, id: SubbandId) -> f64 {
        if id.level == 0 {
            return 1.0;
        }
        let index = id.level.min(MAXIMUM_REACHABLE_LEVELS) as usize - 1;
        let horizontal = if id.orientation.is_horizontal_high() {
            self.high[index]
        } else {
            self.low[index]
        };
        let vertical = if id.orientation.is_vertical_high() {
            self.high[index]
        } else {
            self.low[index]
        };
        horizontal * vertical
    }
}
