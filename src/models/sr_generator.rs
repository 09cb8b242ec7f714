//! Second-stage generator: synthesizes the high-resolution color image.

use candle_core::{Device, Result, Tensor};
use candle_nn::{Conv2dConfig, ConvTranspose2dConfig};
use tracing::debug;

use super::config::SrGeneratorConfig;
use super::residual::ResidualBlock;
use crate::core::SrError;
use crate::core::errors::candle_to_sr;
use crate::init::{ParamSet, WeightInit};
use crate::layers::{
    Conv2d, ConvTranspose2d, INSTANCE_NORM_EPS, WeightLayer, instance_norm2d, reflection_pad2d,
};

const MODEL_NAME: &str = "SRGenerator";

/// Encoder / residual-stack / decoder network mapping a 4-channel input
/// (RGB + predicted edges) to a 3-channel image.
///
/// Same topology as the edge generator but without spectral normalization
/// anywhere; the output passes through `(tanh(x) + 1) / 2` into [0, 1].
#[derive(Debug)]
pub struct SrGenerator {
    enc1: Conv2d,
    enc2: Conv2d,
    enc3: Conv2d,
    middle: Vec<ResidualBlock>,
    dec1: ConvTranspose2d,
    dec2: ConvTranspose2d,
    head: Conv2d,
}

impl SrGenerator {
    /// Builds the generator; runs the weight initializer when the config
    /// asks for it.
    pub fn new(config: &SrGeneratorConfig, device: &Device) -> std::result::Result<Self, SrError> {
        config.validate()?;

        let base = Conv2dConfig::default();
        let down = Conv2dConfig {
            padding: 1,
            stride: 2,
            ..Default::default()
        };
        let up = ConvTranspose2dConfig {
            padding: 1,
            stride: 2,
            ..Default::default()
        };

        let build = || -> Result<Self> {
            Ok(Self {
                enc1: Conv2d::new(4, 64, 7, base, device)?,
                enc2: Conv2d::new(64, 128, 4, down, device)?,
                enc3: Conv2d::new(128, 256, 4, down, device)?,
                middle: (0..config.residual_blocks)
                    .map(|_| ResidualBlock::new(256, 2, false, device))
                    .collect::<Result<Vec<_>>>()?,
                dec1: ConvTranspose2d::new(256, 128, 4, up, device)?,
                dec2: ConvTranspose2d::new(128, 64, 4, up, device)?,
                head: Conv2d::new(64, 3, 7, base, device)?,
            })
        };
        let model = build().map_err(|e| candle_to_sr(MODEL_NAME, "construction", e))?;

        if config.init_weights {
            WeightInit::new(&config.init_type, config.init_gain)
                .apply_all(&model.param_sets())
                .map_err(|e| candle_to_sr(MODEL_NAME, "weight initialization", e))?;
        }
        Ok(model)
    }

    /// Runs the generator on a `(B, 4, H, W)` tensor, returning a
    /// `(B, 3, H, W)` image with values in [0, 1].
    pub fn forward(&self, x: &Tensor) -> std::result::Result<Tensor, SrError> {
        let y = self
            .encode(x)
            .map_err(|e| candle_to_sr(MODEL_NAME, "encoder", e))?;
        let y = self
            .middle_pass(&y)
            .map_err(|e| candle_to_sr(MODEL_NAME, "residual stack", e))?;
        let y = self
            .decode(&y)
            .map_err(|e| candle_to_sr(MODEL_NAME, "decoder", e))?;
        let y = y
            .tanh()
            .and_then(|t| t.affine(0.5, 0.5))
            .map_err(|e| candle_to_sr(MODEL_NAME, "output activation", e))?;
        debug!(dims = ?y.dims(), "sr generator output");
        Ok(y)
    }

    fn encode(&self, x: &Tensor) -> Result<Tensor> {
        let y = reflection_pad2d(x, 3)?;
        let y = instance_norm2d(&self.enc1.forward(&y)?, INSTANCE_NORM_EPS)?.relu()?;
        let y = instance_norm2d(&self.enc2.forward(&y)?, INSTANCE_NORM_EPS)?.relu()?;
        instance_norm2d(&self.enc3.forward(&y)?, INSTANCE_NORM_EPS)?.relu()
    }

    fn middle_pass(&self, x: &Tensor) -> Result<Tensor> {
        let mut y = x.clone();
        for block in &self.middle {
            y = block.forward(&y)?;
        }
        Ok(y)
    }

    fn decode(&self, x: &Tensor) -> Result<Tensor> {
        let y = instance_norm2d(&self.dec1.forward(x)?, INSTANCE_NORM_EPS)?.relu()?;
        let y = instance_norm2d(&self.dec2.forward(&y)?, INSTANCE_NORM_EPS)?.relu()?;
        let y = reflection_pad2d(&y, 3)?;
        self.head.forward(&y)
    }

    /// All trainable parameters, in construction order.
    pub fn param_sets(&self) -> Vec<ParamSet<'_>> {
        let mut params = vec![
            self.enc1.param_set(),
            self.enc2.param_set(),
            self.enc3.param_set(),
        ];
        for block in &self.middle {
            params.extend(block.param_sets());
        }
        params.push(self.dec1.param_set());
        params.push(self.dec2.param_set());
        params.push(self.head.param_set());
        params
    }
}
