//! Residual block shared by both generators.

use candle_core::{Device, Result, Tensor};
use candle_nn::Conv2dConfig;

use crate::init::ParamSet;
use crate::layers::{Conv2d, INSTANCE_NORM_EPS, MaybeSpectral, instance_norm2d, reflection_pad2d};

/// A fixed-topology residual block computing `input + F(input)`.
///
/// `F` is two reflect-padded, instance-normalized 3x3 convolutions at a
/// constant channel count; the first is dilated and followed by a ReLU,
/// the second is not activated so the skip addition stays linear. Both
/// convolutions carry a bias only when spectral normalization is off.
/// Output shape equals input shape exactly.
#[derive(Debug)]
pub struct ResidualBlock {
    conv1: MaybeSpectral<Conv2d>,
    conv2: MaybeSpectral<Conv2d>,
    dilation: usize,
}

impl ResidualBlock {
    /// Builds a block over `dim` channels with the given first-conv
    /// dilation.
    pub fn new(
        dim: usize,
        dilation: usize,
        use_spectral_norm: bool,
        device: &Device,
    ) -> Result<Self> {
        let dilated = Conv2dConfig {
            dilation,
            ..Default::default()
        };
        let conv1 = if use_spectral_norm {
            Conv2d::new_no_bias(dim, dim, 3, dilated, device)?
        } else {
            Conv2d::new(dim, dim, 3, dilated, device)?
        };
        let plain = Conv2dConfig::default();
        let conv2 = if use_spectral_norm {
            Conv2d::new_no_bias(dim, dim, 3, plain, device)?
        } else {
            Conv2d::new(dim, dim, 3, plain, device)?
        };
        Ok(Self {
            conv1: MaybeSpectral::new(conv1, use_spectral_norm, device)?,
            conv2: MaybeSpectral::new(conv2, use_spectral_norm, device)?,
            dilation,
        })
    }

    /// Applies the block.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let y = reflection_pad2d(x, self.dilation)?;
        let y = self.conv1.forward(&y)?;
        let y = instance_norm2d(&y, INSTANCE_NORM_EPS)?.relu()?;
        let y = reflection_pad2d(&y, 1)?;
        let y = self.conv2.forward(&y)?;
        let y = instance_norm2d(&y, INSTANCE_NORM_EPS)?;
        x + y
    }

    /// The block's parameters, in construction order.
    pub fn param_sets(&self) -> Vec<ParamSet<'_>> {
        vec![self.conv1.param_set(), self.conv2.param_set()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_shape_matches_input() {
        let device = Device::Cpu;
        for (dim, dilation) in [(4, 1), (4, 2), (8, 3)] {
            let block = ResidualBlock::new(dim, dilation, false, &device).unwrap();
            let x = Tensor::randn(0f32, 1f32, (2, dim, 12, 10), &device).unwrap();
            let y = block.forward(&x).unwrap();
            assert_eq!(y.dims(), x.dims(), "dim {dim} dilation {dilation}");
        }
    }

    #[test]
    fn test_spectral_variant_shape_and_params() {
        let device = Device::Cpu;
        let block = ResidualBlock::new(4, 2, true, &device).unwrap();
        let x = Tensor::randn(0f32, 1f32, (1, 4, 9, 9), &device).unwrap();
        let y = block.forward(&x).unwrap();
        assert_eq!(y.dims(), &[1, 4, 9, 9]);

        // Spectral-normalized convolutions carry no bias.
        for p in block.param_sets() {
            match p {
                ParamSet::Conv { bias, .. } => assert!(bias.is_none()),
                _ => panic!("residual blocks only hold convolutions"),
            }
        }
    }
}
