//! Rate control: visual quality to per-sub-band step sizes, and scalar
//! quantization with those steps.

use super::dwt::{BasisNorms, WaveletKernel};
use super::subband::{CoefficientBlock, QuantizedBlock, SubbandData, SubbandId, SubbandOrientation};
use crate::constants::{MAXIMUM_DECOMPOSITION_LEVELS, MAXIMUM_QUALITY, MINIMUM_QUALITY};
use crate::error::{Jp2Error, StreamFault};

/// Quality points per doubling of the base step.
const QUALITY_PER_OCTAVE: f64 = 12.5;

/// 9/7 step at full quality for a unit-norm band; keeps the worst pixel
/// error at full quality well inside two levels.
const IRREVERSIBLE_BASE_STEP: f64 = 0.125;

/// Diagonal details are the least visible, so they are quantized harder.
fn orientation_weight(orientation: SubbandOrientation) -> f64 {
    match orientation {
        SubbandOrientation::HH => 1.4,
        _ => 1.0,
    }
}

/// Immutable step sizes for every sub-band of a decomposition up to `levels`.
///
/// Steps are stored as LL steps for LL levels `0..=levels` followed by the
/// HL, LH, HH steps of levels `1..=levels`. An edge tile that supports fewer
/// decompositions than the image still finds the step for its own LL band.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizationPlan {
    levels: u8,
    steps: Vec<f32>,
}

/// Number of steps a plan for `levels` decompositions holds.
pub fn step_count(levels: u8) -> usize {
    let levels = levels as usize;
    (levels + 1) + 3 * levels
}

/// Derives the plan for `quality` in `[0, 100]`; 100 is the finest.
pub fn plan_for(
    quality: f32,
    levels: u8,
    kernel: WaveletKernel,
) -> Result<QuantizationPlan, Jp2Error> {
    if !(MINIMUM_QUALITY..=MAXIMUM_QUALITY).contains(&quality) {
        return Err(Jp2Error::InvalidQuality(quality));
    }
    if levels > MAXIMUM_DECOMPOSITION_LEVELS {
        return Err(Jp2Error::InvalidParameter("decomposition levels exceed 16"));
    }

    let scale = 2f64.powf((f64::from(MAXIMUM_QUALITY) - f64::from(quality)) / QUALITY_PER_OCTAVE);
    let norms = BasisNorms::for_kernel(kernel);
    let step = |id: SubbandId| -> f32 {
        let weighted = orientation_weight(id.orientation) / norms.subband(id);
        let step = match kernel {
            WaveletKernel::Reversible53 => 1.0 + (scale - 1.0) * weighted,
            WaveletKernel::Irreversible97 => IRREVERSIBLE_BASE_STEP * scale * weighted,
        };
        step as f32
    };

    let mut steps = Vec::with_capacity(step_count(levels));
    steps.extend((0..=levels).map(|level| step(SubbandId::ll(level))));
    for level in 1..=levels {
        steps.extend(
            SubbandOrientation::DETAILS
                .iter()
                .map(|&orientation| step(SubbandId::detail(level, orientation))),
        );
    }
    Ok(QuantizationPlan { levels, steps })
}

impl QuantizationPlan {
    /// Rebuilds a plan read from a codestream, checking every step.
    pub fn from_steps(levels: u8, steps: Vec<f32>) -> Result<Self, StreamFault> {
        if levels > MAXIMUM_DECOMPOSITION_LEVELS {
            return Err(StreamFault::InvalidLevels(levels));
        }
        let expected = step_count(levels);
        if steps.len() != expected {
            return Err(StreamFault::StepCountMismatch {
                expected,
                found: steps.len(),
            });
        }
        if let Some(index) = steps.iter().position(|s| !s.is_finite() || *s <= 0.0) {
            return Err(StreamFault::InvalidStepSize { index });
        }
        Ok(Self { levels, steps })
    }

    pub fn levels(&self) -> u8 {
        self.levels
    }

    pub fn steps(&self) -> &[f32] {
        &self.steps
    }

    /// Step size of sub-band `id`, `None` when the band is deeper than the plan.
    pub fn step(&self, id: SubbandId) -> Option<f32> {
        if id.level > self.levels {
            return None;
        }
        let index = match id.orientation.detail_index() {
            None => id.level as usize,
            Some(_) if id.level == 0 => return None,
            Some(offset) => self.levels as usize + 1 + 3 * (id.level as usize - 1) + offset,
        };
        self.steps.get(index).copied()
    }

    fn steps_for<T>(&self, block: &CoefficientBlock<T>) -> Result<Vec<f32>, Jp2Error> {
        block
            .subbands
            .iter()
            .map(|band| {
                self.step(band.id).ok_or(Jp2Error::InvalidParameter(
                    "coefficient block is deeper than the quantization plan",
                ))
            })
            .collect()
    }
}

/// Divides every coefficient by its sub-band step and rounds to nearest.
pub fn apply(plan: &QuantizationPlan, block: &CoefficientBlock) -> Result<QuantizedBlock, Jp2Error> {
    let steps = plan.steps_for(block)?;
    let subbands = block
        .subbands
        .iter()
        .zip(steps)
        .map(|(band, step)| SubbandData {
            id: band.id,
            width: band.width,
            height: band.height,
            // `as` saturates, which bounds what the entropy coder has to carry.
            coefficients: band.coefficients.iter().map(|&c| (c / step).round() as i32).collect(),
        })
        .collect();
    Ok(CoefficientBlock {
        width: block.width,
        height: block.height,
        levels: block.levels,
        subbands,
    })
}

/// Multiplies quantized coefficients back by their sub-band step.
pub fn invert(plan: &QuantizationPlan, block: &QuantizedBlock) -> Result<CoefficientBlock, Jp2Error> {
    let steps = plan.steps_for(block)?;
    let subbands = block
        .subbands
        .iter()
        .zip(steps)
        .map(|(band, step)| SubbandData {
            id: band.id,
            width: band.width,
            height: band.height,
            coefficients: band.coefficients.iter().map(|&q| q as f32 * step).collect(),
        })
        .collect();
    Ok(CoefficientBlock {
        width: block.width,
        height: block.height,
        levels: block.levels,
        subbands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_quality() {
        for quality in [-1.0, 100.5, 101.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                plan_for(quality, 5, WaveletKernel::Reversible53),
                Err(Jp2Error::InvalidQuality(_))
            ));
        }
    }

    #[test]
    fn test_lossless_plan_at_full_quality() {
        let plan = plan_for(100.0, 5, WaveletKernel::Reversible53).unwrap();
        assert_eq!(plan.steps().len(), step_count(5));
        assert!(plan.steps().iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_plan_is_monotonic() {
        for kernel in [WaveletKernel::Reversible53, WaveletKernel::Irreversible97] {
            let mut previous = plan_for(0.0, 4, kernel).unwrap();
            for q in 1..=100 {
                let plan = plan_for(q as f32, 4, kernel).unwrap();
                for (coarse, fine) in previous.steps().iter().zip(plan.steps()) {
                    assert!(coarse >= fine, "q={} {:?}", q, kernel);
                }
                previous = plan;
            }
        }
    }

    #[test]
    fn test_step_lookup() {
        let plan = plan_for(50.0, 2, WaveletKernel::Irreversible97).unwrap();
        assert_eq!(plan.steps().len(), 9);
        assert_eq!(plan.step(SubbandId::ll(0)), Some(plan.steps()[0]));
        assert_eq!(plan.step(SubbandId::ll(2)), Some(plan.steps()[2]));
        assert_eq!(
            plan.step(SubbandId::detail(1, SubbandOrientation::HL)),
            Some(plan.steps()[3])
        );
        assert_eq!(
            plan.step(SubbandId::detail(2, SubbandOrientation::HH)),
            Some(plan.steps()[8])
        );
        assert_eq!(plan.step(SubbandId::ll(3)), None);
        // Diagonal detail is weighted above the horizontal one of the same level.
        assert!(plan.steps()[5] > plan.steps()[3]);
    }

    #[test]
    fn test_from_steps_validation() {
        assert!(QuantizationPlan::from_steps(1, vec![1.0; 5]).is_ok());
        assert_eq!(
            QuantizationPlan::from_steps(1, vec![1.0; 4]),
            Err(StreamFault::StepCountMismatch {
                expected: 5,
                found: 4
            })
        );
        assert_eq!(
            QuantizationPlan::from_steps(1, vec![1.0, 1.0, 0.0, 1.0, 1.0]),
            Err(StreamFault::InvalidStepSize { index: 2 })
        );
        assert_eq!(
            QuantizationPlan::from_steps(0, vec![f32::NAN]),
            Err(StreamFault::InvalidStepSize { index: 0 })
        );
        assert_eq!(
            QuantizationPlan::from_steps(17, vec![]),
            Err(StreamFault::InvalidLevels(17))
        );
    }

    #[test]
    fn test_apply_and_invert() {
        let plane: Vec<f32> = (0..16).map(|v| v as f32 * 3.3 - 20.0).collect();
        let block = CoefficientBlock::from_plane(&plane, 4, 4, 1);
        let plan = plan_for(30.0, 1, WaveletKernel::Irreversible97).unwrap();
        let quantized = apply(&plan, &block).unwrap();
        let restored = invert(&plan, &quantized).unwrap();
        for (band, original) in restored.subbands.iter().zip(&block.subbands) {
            let step = plan.step(band.id).unwrap();
            for (a, b) in band.coefficients.iter().zip(&original.coefficients) {
                assert!((a - b).abs() <= step / 2.0 + 1e-4);
            }
        }

        let deep = CoefficientBlock::from_plane(&plane, 4, 4, 2);
        assert!(apply(&plan, &deep).is_err());
    }
}
