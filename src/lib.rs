//! # edge-sisr
//!
//! Edge-guided single-image super-resolution networks built on
//! [Candle](https://github.com/huggingface/candle).
//!
//! The model is a two-stage pipeline: an [`EdgeGenerator`] predicts a
//! high-resolution edge map from a low-resolution image and its edges,
//! then an [`SrGenerator`] synthesizes the high-resolution image from the
//! upscaled input conditioned on those predicted edges. [`EdgeSrModel`]
//! wires the two stages together with fixed x4 nearest-neighbor
//! upsampling and channel concatenation.
//!
//! This crate defines the networks and their forward computation only;
//! training loops, losses, and checkpointing are left to external
//! collaborators that drive the exposed parameters.
//!
//! ## Modules
//!
//! * [`core`] - error handling
//! * [`layers`] - convolution layers, spectral normalization, tensor ops
//! * [`init`] - statistical weight-initialization policies
//! * [`models`] - the generators and the composite model
//! * [`utils`] - device parsing and image/tensor conversion
//!
//! ## Quick start
//!
//! ```no_run
//! use candle_core::Device;
//! use edge_sisr::{EdgeSrConfig, EdgeSrModel};
//! use edge_sisr::utils::{edge_map, image_to_tensor, load_image, tensor_to_image};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let device = Device::Cpu;
//! let model = EdgeSrModel::new(&EdgeSrConfig::default(), &device)?;
//!
//! let lr = load_image(std::path::Path::new("input.png"))?;
//! let lr_tensor = image_to_tensor(&lr, &device)?;
//! let lr_edges = edge_map(&lr, 10.0, 40.0, &device)?;
//!
//! let sr = model.forward(&lr_tensor, &lr_edges)?;
//! tensor_to_image(&sr)?.save("output.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `cuda` - Enable CUDA support for GPU acceleration

pub mod core;
pub mod init;
pub mod layers;
pub mod models;
pub mod utils;

// Re-exports for convenience
pub use crate::core::{SrError, SrResult};
pub use init::{InitPolicy, WeightInit};
pub use models::{
    EdgeGenerator, EdgeGeneratorConfig, EdgeSrConfig, EdgeSrModel, ResidualBlock, SrGenerator,
    SrGeneratorConfig, UPSCALE_FACTOR,
};
