//! jp2codec: a wavelet image codec with a visual-quality knob.
//!
//! ```no_run
//! use jp2codec::{Jp2Decoder, Jp2Encoder, PixelFormat, RasterImage};
//!
//! let image = RasterImage::filled(64, 48, PixelFormat::Gray8, 128)?;
//! let bytes = Jp2Encoder::new(&image).set_visual_quality(50.0).encode()?;
//! let decoded = Jp2Decoder::new(&bytes).decode()?;
//! assert_eq!(decoded.width(), 64);
//! # Ok::<(), jp2codec::Jp2Error>(())
//! ```

pub mod constants;
pub mod error;
pub mod jp2;
pub mod marker_code;
pub mod metrics;
pub mod preprocess;
pub mod raster;
pub mod stream_reader;
pub mod stream_writer;

pub use error::{Jp2Error, StreamFault};
pub use jp2::{
    CodestreamHeader, ComponentTransform, EncoderOptions, Jp2Decoder, Jp2Encoder,
    QuantizationPlan, WaveletKernel,
};
pub use raster::{PixelFormat, RasterImage};

/// Encodes `image` at `quality` with every other option at its default.
pub fn encode(image: &RasterImage, quality: f32) -> Result<Vec<u8>, Jp2Error> {
    Jp2Encoder::new(image).set_visual_quality(quality).encode()
}

/// Decodes a codestream produced by [`encode`] or [`Jp2Encoder`].
pub fn decode(bytes: &[u8]) -> Result<RasterImage, Jp2Error> {
    Jp2Decoder::new(bytes).decode()
}
