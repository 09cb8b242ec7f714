//! Composite model wiring the two generator stages together.

use candle_core::{Device, Tensor};
use tracing::debug;

use super::config::{EdgeGeneratorConfig, EdgeSrConfig, SrGeneratorConfig};
use super::edge_generator::EdgeGenerator;
use super::sr_generator::SrGenerator;
use crate::core::SrError;
use crate::core::errors::candle_to_sr;
use crate::init::ParamSet;

/// The fixed nearest-neighbor upsampling factor applied to both inputs
/// before the generator stages. Independent of any generator `scale`
/// parameter.
pub const UPSCALE_FACTOR: usize = 4;

const MODEL_NAME: &str = "EdgeSrModel";

/// Edge-guided super-resolution model.
///
/// Owns one [`EdgeGenerator`] and one [`SrGenerator`] with no shared
/// weights. A forward pass upsamples the low-resolution image and edge
/// map, predicts high-resolution edges from their concatenation, then
/// synthesizes the high-resolution image from the image concatenated with
/// the predicted edges. No intermediate values are retained.
#[derive(Debug)]
pub struct EdgeSrModel {
    edge_generator: EdgeGenerator,
    sr_generator: SrGenerator,
}

impl EdgeSrModel {
    /// Builds both generator stages.
    pub fn new(config: &EdgeSrConfig, device: &Device) -> Result<Self, SrError> {
        let edge_config = EdgeGeneratorConfig {
            use_spectral_norm: config.use_spectral_norm,
            residual_blocks: config.residual_blocks,
            init_weights: config.init_weights,
            ..Default::default()
        };
        let sr_config = SrGeneratorConfig {
            residual_blocks: config.residual_blocks,
            init_weights: config.init_weights,
            ..Default::default()
        };
        Ok(Self {
            edge_generator: EdgeGenerator::new(&edge_config, device)?,
            sr_generator: SrGenerator::new(&sr_config, device)?,
        })
    }

    /// Runs the full pipeline: `(B, 3, H, W)` image plus `(B, 1, H, W)`
    /// edges in, `(B, 3, 4H, 4W)` image out.
    ///
    /// # Errors
    ///
    /// Any spatial or channel disagreement between the two inputs is a
    /// fatal [`SrError::InvalidInput`]; shape errors raised deeper in the
    /// pipeline propagate as [`SrError::Inference`].
    pub fn forward(&self, lr: &Tensor, lr_edges: &Tensor) -> Result<Tensor, SrError> {
        let (b, c, h, w) = lr
            .dims4()
            .map_err(|e| candle_to_sr(MODEL_NAME, "image dims", e))?;
        let (eb, ec, eh, ew) = lr_edges
            .dims4()
            .map_err(|e| candle_to_sr(MODEL_NAME, "edge dims", e))?;
        if c != 3 {
            return Err(SrError::invalid_input(format!(
                "expected a 3-channel image, got {c} channels"
            )));
        }
        if ec != 1 {
            return Err(SrError::invalid_input(format!(
                "expected a 1-channel edge map, got {ec} channels"
            )));
        }
        if (b, h, w) != (eb, eh, ew) {
            return Err(SrError::invalid_input(format!(
                "image {b}x{c}x{h}x{w} and edges {eb}x{ec}x{eh}x{ew} disagree"
            )));
        }

        let lr_scaled = lr
            .upsample_nearest2d(h * UPSCALE_FACTOR, w * UPSCALE_FACTOR)
            .map_err(|e| candle_to_sr(MODEL_NAME, "image upsample", e))?;
        let edges_scaled = lr_edges
            .upsample_nearest2d(h * UPSCALE_FACTOR, w * UPSCALE_FACTOR)
            .map_err(|e| candle_to_sr(MODEL_NAME, "edge upsample", e))?;

        let inputs = Tensor::cat(&[&lr_scaled, &edges_scaled], 1)
            .map_err(|e| candle_to_sr(MODEL_NAME, "edge stage concat", e))?;
        let edge_map = self.edge_generator.forward(&inputs)?;
        debug!(dims = ?edge_map.dims(), "predicted edge map");

        let inputs = Tensor::cat(&[&lr_scaled, &edge_map], 1)
            .map_err(|e| candle_to_sr(MODEL_NAME, "sr stage concat", e))?;
        self.sr_generator.forward(&inputs)
    }

    /// The first-stage generator.
    pub fn edge_generator(&self) -> &EdgeGenerator {
        &self.edge_generator
    }

    /// The second-stage generator.
    pub fn sr_generator(&self) -> &SrGenerator {
        &self.sr_generator
    }

    /// All trainable parameters of both stages, edge stage first.
    pub fn param_sets(&self) -> Vec<ParamSet<'_>> {
        let mut params = self.edge_generator.param_sets();
        params.extend(self.sr_generator.param_sets());
        params
    }
}
