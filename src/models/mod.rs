//! The edge-guided super-resolution networks.
//!
//! - [`ResidualBlock`] - the building block shared by both generators
//! - [`EdgeGenerator`] - low-resolution image + edges to high-resolution edges
//! - [`SrGenerator`] - upscaled image + predicted edges to the final image
//! - [`EdgeSrModel`] - the composite wiring the two stages together

pub mod config;
pub mod edge_generator;
pub mod edge_sr;
pub mod residual;
pub mod sr_generator;

pub use config::{EdgeGeneratorConfig, EdgeSrConfig, SrGeneratorConfig};
pub use edge_generator::EdgeGenerator;
pub use edge_sr::{EdgeSrModel, UPSCALE_FACTOR};
pub use residual::ResidualBlock;
pub use sr_generator::SrGenerator;
