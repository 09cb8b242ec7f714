//! First-stage generator: predicts a high-resolution edge map.

use candle_core::{Device, Result, Tensor};
use candle_nn::{Conv2dConfig, ConvTranspose2dConfig};
use tracing::debug;

use super::config::EdgeGeneratorConfig;
use super::residual::ResidualBlock;
use crate::core::SrError;
use crate::core::errors::candle_to_sr;
use crate::init::{ParamSet, WeightInit};
use crate::layers::{
    Conv2d, ConvTranspose2d, INSTANCE_NORM_EPS, MaybeSpectral, WeightLayer, instance_norm2d,
    reflection_pad2d,
};

const MODEL_NAME: &str = "EdgeGenerator";

/// Encoder / residual-stack / decoder network mapping a 4-channel input
/// (RGB + edges) to a 1-channel edge-confidence map in (0, 1).
///
/// Every convolution except the output head is optionally wrapped in
/// spectral normalization (on by default); the output passes through a
/// sigmoid. The encoder divides the spatial dimensions by 4 and the
/// decoder multiplies them back, so output spatial size equals input
/// spatial size.
#[derive(Debug)]
pub struct EdgeGenerator {
    enc1: MaybeSpectral<Conv2d>,
    enc2: MaybeSpectral<Conv2d>,
    enc3: MaybeSpectral<Conv2d>,
    middle: Vec<ResidualBlock>,
    dec1: MaybeSpectral<ConvTranspose2d>,
    dec2: MaybeSpectral<ConvTranspose2d>,
    head: Conv2d,
}

impl EdgeGenerator {
    /// Builds the generator; runs the weight initializer when the config
    /// asks for it.
    pub fn new(config: &EdgeGeneratorConfig, device: &Device) -> std::result::Result<Self, SrError> {
        config.validate()?;
        let sn = config.use_spectral_norm;

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
            let enc1 = MaybeSpectral::new(Conv2d::new(4, 64, 7, base, device)?, sn, device)?;
            let enc2 = MaybeSpectral::new(Conv2d::new(64, 128, 4, down, device)?, sn, device)?;
            let enc3 = MaybeSpectral::new(Conv2d::new(128, 256, 4, down, device)?, sn, device)?;
            let middle = (0..config.residual_blocks)
                .map(|_| ResidualBlock::new(256, 2, sn, device))
                .collect::<Result<Vec<_>>>()?;
            let dec1 = MaybeSpectral::new(ConvTranspose2d::new(256, 128, 4, up, device)?, sn, device)?;
            let dec2 = MaybeSpectral::new(ConvTranspose2d::new(128, 64, 4, up, device)?, sn, device)?;
            let head = Conv2d::new(64, 1, 7, base, device)?;
            Ok(Self {
                enc1,
                enc2,
                enc3,
                middle,
                dec1,
                dec2,
                head,
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
    /// `(B, 1, H, W)` edge map.
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
        let y = candle_nn::ops::sigmoid(&y).map_err(|e| candle_to_sr(MODEL_NAME, "sigmoid", e))?;
        debug!(dims = ?y.dims(), "edge generator output");
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_shape_and_range() {
        let device = Device::Cpu;
        let config = EdgeGeneratorConfig {
            residual_blocks: 2,
            ..Default::default()
        };
        let model = EdgeGenerator::new(&config, &device).unwrap();
        let x = Tensor::randn(0f32, 1f32, (1, 4, 32, 32), &device).unwrap();
        let y = model.forward(&x).unwrap();
        assert_eq!(y.dims(), &[1, 1, 32, 32]);

        let values: Vec<f32> = y.flatten_all().unwrap().to_vec1().unwrap();
        assert!(values.iter().all(|v| v.is_finite() && *v > 0.0 && *v < 1.0));
    }

    #[test]
    fn test_zero_residual_blocks_is_identity_middle() {
        let device = Device::Cpu;
        let config = EdgeGeneratorConfig {
            residual_blocks: 0,
            ..Default::default()
        };
        let model = EdgeGenerator::new(&config, &device).unwrap();
        assert!(model.middle.is_empty());

        let x = Tensor::randn(0f32, 1f32, (1, 4, 32, 32), &device).unwrap();
        let y = model.forward(&x).unwrap();
        assert_eq!(y.dims(), &[1, 1, 32, 32]);
    }

    #[test]
    fn test_bogus_init_type_does_not_fail() {
        let device = Device::Cpu;
        let config = EdgeGeneratorConfig {
            residual_blocks: 1,
            init_type: "bogus".to_string(),
            ..Default::default()
        };
        assert!(EdgeGenerator::new(&config, &device).is_ok());
    }

    #[test]
    fn test_param_count() {
        let device = Device::Cpu;
        let config = EdgeGeneratorConfig {
            residual_blocks: 3,
            ..Default::default()
        };
        let model = EdgeGenerator::new(&config, &device).unwrap();
        // 3 encoder convs + 2 per block + 2 decoder deconvs + head
        assert_eq!(model.param_sets().len(), 3 + 3 * 2 + 2 + 1);
    }
}
