//! Convolution layers owning their parameters as [`Var`]s (NCHW layout).

use candle_core::{DType, Device, Result, Shape, Tensor, Var};
use candle_nn::init::{DEFAULT_KAIMING_NORMAL, Init};
use candle_nn::{Conv2dConfig, ConvTranspose2dConfig};

use crate::init::ParamSet;

/// A layer with a single weight kernel that can also be applied with a
/// substituted kernel. This is the seam the spectral-normalization
/// decorator plugs into.
pub trait WeightLayer {
    /// The weight kernel of this layer.
    fn weight(&self) -> &Var;

    /// The weight viewed as a 2-D matrix whose leading dimension is the
    /// output-channel axis.
    fn weight_matrix(&self) -> Result<Tensor>;

    /// Applies the layer with `weight` in place of the stored kernel.
    fn forward_with_weight(&self, x: &Tensor, weight: &Tensor) -> Result<Tensor>;

    /// The trainable parameters of this layer.
    fn param_set(&self) -> ParamSet<'_>;

    /// Applies the layer with its stored kernel.
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        self.forward_with_weight(x, self.weight().as_tensor())
    }
}

/// A 2-D convolution over NCHW tensors.
///
/// Construction matches the engine's default initialization
/// (Kaiming-normal weight, uniform bias), so a model whose initializer is
/// skipped still carries the framework-default parameter values.
#[derive(Debug)]
pub struct Conv2d {
    weight: Var,
    bias: Option<Var>,
    config: Conv2dConfig,
}

impl Conv2d {
    /// Creates a convolution with a bias term.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        config: Conv2dConfig,
        device: &Device,
    ) -> Result<Self> {
        let fan_in = (in_channels / config.groups) * kernel * kernel;
        let bound = 1.0 / (fan_in as f64).sqrt();
        let bias = Init::Uniform {
            lo: -bound,
            up: bound,
        }
        .var(Shape::from(out_channels), DType::F32, device)?;
        let mut layer = Self::new_no_bias(in_channels, out_channels, kernel, config, device)?;
        layer.bias = Some(bias);
        Ok(layer)
    }

    /// Creates a convolution without a bias term.
    pub fn new_no_bias(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        config: Conv2dConfig,
        device: &Device,
    ) -> Result<Self> {
        let weight = DEFAULT_KAIMING_NORMAL.var(
            Shape::from((
                out_channels,
                in_channels / config.groups,
                kernel,
                kernel,
            )),
            DType::F32,
            device,
        )?;
        Ok(Self {
            weight,
            bias: None,
            config,
        })
    }
}

impl WeightLayer for Conv2d {
    fn weight(&self) -> &Var {
        &self.weight
    }

    fn weight_matrix(&self) -> Result<Tensor> {
        self.weight.as_tensor().flatten_from(1)
    }

    fn forward_with_weight(&self, x: &Tensor, weight: &Tensor) -> Result<Tensor> {
        let x = x.conv2d(
            weight,
            self.config.padding,
            self.config.stride,
            self.config.dilation,
            self.config.groups,
        )?;
        match &self.bias {
            None => Ok(x),
            Some(bias) => {
                let channels = bias.as_tensor().dims1()?;
                let bias = bias.as_tensor().reshape((1, channels, 1, 1))?;
                x.broadcast_add(&bias)
            }
        }
    }

    fn param_set(&self) -> ParamSet<'_> {
        ParamSet::Conv {
            weight: &self.weight,
            bias: self.bias.as_ref(),
        }
    }
}

/// A 2-D transposed convolution over NCHW tensors.
#[derive(Debug)]
pub struct ConvTranspose2d {
    weight: Var,
    bias: Option<Var>,
    config: ConvTranspose2dConfig,
}

impl ConvTranspose2d {
    /// Creates a transposed convolution with a bias term.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        config: ConvTranspose2dConfig,
        device: &Device,
    ) -> Result<Self> {
        let weight = DEFAULT_KAIMING_NORMAL.var(
            Shape::from((in_channels, out_channels, kernel, kernel)),
            DType::F32,
            device,
        )?;
        let fan_in = out_channels * kernel * kernel;
        let bound = 1.0 / (fan_in as f64).sqrt();
        let bias = Init::Uniform {
            lo: -bound,
            up: bound,
        }
        .var(Shape::from(out_channels), DType::F32, device)?;
        Ok(Self {
            weight,
            bias: Some(bias),
            config,
        })
    }
}

impl WeightLayer for ConvTranspose2d {
    fn weight(&self) -> &Var {
        &self.weight
    }

    fn weight_matrix(&self) -> Result<Tensor> {
        // The output-channel axis of a transposed kernel is axis 1.
        self.weight.as_tensor().transpose(0, 1)?.flatten_from(1)
    }

    fn forward_with_weight(&self, x: &Tensor, weight: &Tensor) -> Result<Tensor> {
        let x = x.conv_transpose2d(
            weight,
            self.config.padding,
            self.config.output_padding,
            self.config.stride,
            self.config.dilation,
        )?;
        match &self.bias {
            None => Ok(x),
            Some(bias) => {
                let channels = bias.as_tensor().dims1()?;
                let bias = bias.as_tensor().reshape((1, channels, 1, 1))?;
                x.broadcast_add(&bias)
            }
        }
    }

    fn param_set(&self) -> ParamSet<'_> {
        ParamSet::Conv {
            weight: &self.weight,
            bias: self.bias.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv2d_shapes() {
        let device = Device::Cpu;
        let config = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        let conv = Conv2d::new(4, 8, 3, config, &device).unwrap();
        let x = Tensor::randn(0f32, 1f32, (2, 4, 16, 16), &device).unwrap();
        let y = conv.forward(&x).unwrap();
        assert_eq!(y.dims(), &[2, 8, 16, 16]);
    }

    #[test]
    fn test_strided_conv_downsamples() {
        let device = Device::Cpu;
        let config = Conv2dConfig {
            padding: 1,
            stride: 2,
            ..Default::default()
        };
        let conv = Conv2d::new(8, 16, 4, config, &device).unwrap();
        let x = Tensor::randn(0f32, 1f32, (1, 8, 32, 32), &device).unwrap();
        let y = conv.forward(&x).unwrap();
        assert_eq!(y.dims(), &[1, 16, 16, 16]);
    }

    #[test]
    fn test_conv_transpose_upsamples() {
        let device = Device::Cpu;
        let config = ConvTranspose2dConfig {
            padding: 1,
            stride: 2,
            ..Default::default()
        };
        let conv = ConvTranspose2d::new(16, 8, 4, config, &device).unwrap();
        let x = Tensor::randn(0f32, 1f32, (1, 16, 16, 16), &device).unwrap();
        let y = conv.forward(&x).unwrap();
        assert_eq!(y.dims(), &[1, 8, 32, 32]);
    }
}
