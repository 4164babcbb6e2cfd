//! Wavelet image codec.
//!
//! The pipeline runs per tile: level shift and component transform, a
//! multi-level 5/3 or 9/7 wavelet decomposition, scalar quantization with
//! steps derived from a visual quality, and MQ arithmetic coding of each
//! sub-band into a length-prefixed codestream.

pub mod codestream;
pub mod coefficient_coder;
pub mod color;
pub mod decoder;
pub mod dwt;
pub mod encoder;
pub mod mq_coder;
pub mod quantization;
pub mod subband;
pub mod tile;
pub mod transform;

pub use codestream::CodestreamHeader;
pub use color::ComponentTransform;
pub use decoder::Jp2Decoder;
pub use dwt::WaveletKernel;
pub use encoder::{EncoderOptions, Jp2Encoder};
pub use quantization::{QuantizationPlan, plan_for};
pub use subband::{CoefficientBlock, QuantizedBlock, SubbandId, SubbandOrientation};
pub use transform::TransformStage;
