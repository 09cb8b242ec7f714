//! Network building blocks.
//!
//! The layers here form a closed set of statically-typed variants: plain
//! convolutions, transposed convolutions, and the spectral-normalization
//! decorator that wraps either. Each layer owns its parameters as
//! [`candle_core::Var`]s so an external collaborator (the weight
//! initializer, or a training loop) can overwrite them in place.

pub mod conv;
pub mod ops;
pub mod spectral;

pub use conv::{Conv2d, ConvTranspose2d, WeightLayer};
pub use ops::{INSTANCE_NORM_EPS, instance_norm2d, reflection_pad2d};
pub use spectral::{MaybeSpectral, SpectralNorm};
