//! Spectral normalization as a decorator over a weight layer.
//!
//! The wrapper owns the underlying layer plus the power-iteration
//! bookkeeping: a persistent estimate `u` of the weight matrix's leading
//! left singular vector. Each forward pass runs one power iteration,
//! refreshes `u`, and applies the layer with `weight / sigma` so the
//! effective kernel always has unit spectral norm.

use candle_core::{Device, Result, Tensor, Var};

use super::conv::WeightLayer;
use crate::init::ParamSet;

const L2_EPS: f64 = 1e-12;

/// A weight layer rescaled by an estimate of its largest singular value.
#[derive(Debug)]
pub struct SpectralNorm<L> {
    inner: L,
    u: Var,
}

impl<L: WeightLayer> SpectralNorm<L> {
    /// Wraps `inner`, seeding the singular-vector estimate with a random
    /// unit vector.
    pub fn new(inner: L, device: &Device) -> Result<Self> {
        let rows = inner.weight_matrix()?.dim(0)?;
        let u = l2_normalize(&Tensor::randn(0f32, 1f32, (rows, 1), device)?)?;
        Ok(Self {
            inner,
            u: Var::from_tensor(&u)?,
        })
    }

    /// The wrapped layer.
    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Applies the wrapped layer with its spectrally-normalized weight,
    /// advancing the power iteration by one step.
    ///
    /// Each call writes the refreshed `u` estimate back into the wrapper.
    /// Callers that need a deterministic `u` evolution must not run
    /// forward passes concurrently.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let w = self.inner.weight_matrix()?;
        let v = l2_normalize(&w.t()?.matmul(self.u.as_tensor())?)?;
        let u = l2_normalize(&w.matmul(&v)?)?;
        let sigma = u.t()?.matmul(&w.matmul(&v)?)?;
        self.u.set(&u)?;
        let weight = self.inner.weight().as_tensor().broadcast_div(&sigma)?;
        self.inner.forward_with_weight(x, &weight)
    }
}

fn l2_normalize(t: &Tensor) -> Result<Tensor> {
    let norm = (t.sqr()?.sum_all()?.sqrt()? + L2_EPS)?;
    t.broadcast_div(&norm)
}

/// A layer that is optionally wrapped in spectral normalization, chosen at
/// construction time.
#[derive(Debug)]
pub enum MaybeSpectral<L> {
    /// The layer applied as-is.
    Plain(L),
    /// The layer applied through [`SpectralNorm`].
    Normalized(SpectralNorm<L>),
}

impl<L: WeightLayer> MaybeSpectral<L> {
    /// Wraps `layer` when `use_spectral_norm` is set, otherwise keeps it
    /// plain.
    pub fn new(layer: L, use_spectral_norm: bool, device: &Device) -> Result<Self> {
        if use_spectral_norm {
            Ok(Self::Normalized(SpectralNorm::new(layer, device)?))
        } else {
            Ok(Self::Plain(layer))
        }
    }

    /// The underlying layer, whichever variant is active.
    pub fn inner(&self) -> &L {
        match self {
            Self::Plain(layer) => layer,
            Self::Normalized(sn) => sn.inner(),
        }
    }

    /// The trainable parameters of the underlying layer.
    pub fn param_set(&self) -> ParamSet<'_> {
        self.inner().param_set()
    }

    /// Applies the layer.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        match self {
            Self::Plain(layer) => layer.forward(x),
            Self::Normalized(sn) => sn.forward(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::conv::Conv2d;
    use candle_nn::Conv2dConfig;

    #[test]
    fn test_spectral_norm_is_scale_invariant() {
        let device = Device::Cpu;
        let config = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        let conv = Conv2d::new_no_bias(3, 6, 3, config, &device).unwrap();
        let sn = SpectralNorm::new(conv, &device).unwrap();
        let x = Tensor::randn(0f32, 1f32, (1, 3, 8, 8), &device).unwrap();

        // Let the power iteration settle so consecutive sigma estimates agree.
        for _ in 0..30 {
            sn.forward(&x).unwrap();
        }
        let before = sn.forward(&x).unwrap();

        // Rescaling the kernel must not change the normalized output.
        let scaled = (sn.inner().weight().as_tensor() * 10.0).unwrap();
        sn.inner().weight().set(&scaled).unwrap();
        let after = sn.forward(&x).unwrap();

        let diff: f32 = (before - after)
            .unwrap()
            .abs()
            .unwrap()
            .flatten_all()
            .unwrap()
            .max(0)
            .unwrap()
            .to_scalar()
            .unwrap();
        assert!(diff < 1e-3, "outputs diverged by {diff}");
    }

    #[test]
    fn test_plain_variant_passes_through() {
        let device = Device::Cpu;
        let conv = Conv2d::new(3, 3, 3, Conv2dConfig::default(), &device).unwrap();
        let layer = MaybeSpectral::new(conv, false, &device).unwrap();
        let x = Tensor::randn(0f32, 1f32, (1, 3, 9, 9), &device).unwrap();
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.dims(), &[1, 3, 7, 7]);
    }
}
