//! Statistical weight initialization.
//!
//! Models are constructed with the engine's default parameter values and
//! then handed to [`WeightInit`], which overwrites filter weights in place
//! according to the selected policy and zeroes every bias. Dispatch is by
//! the [`ParamSet`] variant a layer exposes, so the set of initializable
//! layer kinds is closed and checked at compile time.

use candle_core::{DType, Result, Tensor, Var};
use ndarray::Array2;
use tracing::warn;

/// The default gain applied by [`WeightInit`].
pub const DEFAULT_GAIN: f64 = 0.02;

/// The initialization policies a model can request by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitPolicy {
    /// Zero-mean Gaussian with standard deviation `gain`.
    Normal,
    /// Xavier/Glorot normal, scaled by `gain`.
    Xavier,
    /// Kaiming normal, a = 0, fan-in mode. Ignores `gain`.
    Kaiming,
    /// Orthogonal rows/columns, scaled by `gain`.
    Orthogonal,
}

impl InitPolicy {
    /// Resolves a policy name. Unknown names resolve to `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "normal" => Some(Self::Normal),
            "xavier" => Some(Self::Xavier),
            "kaiming" => Some(Self::Kaiming),
            "orthogonal" => Some(Self::Orthogonal),
            _ => None,
        }
    }
}

/// The parameters one layer exposes to the initializer.
///
/// `Norm` covers affine normalization layers (weight drawn from
/// N(1, gain), bias zeroed). No layer in this model family is an affine
/// normalization today — instance norm carries no parameters — so the
/// variant is only reachable if the family is extended with one.
pub enum ParamSet<'a> {
    /// A convolution or transposed convolution.
    Conv {
        /// The filter kernel.
        weight: &'a Var,
        /// The optional bias term.
        bias: Option<&'a Var>,
    },
    /// A fully-connected layer.
    Linear {
        /// The weight matrix.
        weight: &'a Var,
        /// The optional bias term.
        bias: Option<&'a Var>,
    },
    /// An affine normalization layer.
    Norm {
        /// The per-channel scale.
        weight: &'a Var,
        /// The per-channel shift.
        bias: &'a Var,
    },
}

/// A weight-initialization pass over a model's parameters.
///
/// An unrecognized policy name turns the pass into a no-op: parameters
/// keep their construction-time defaults. A warning records the skip.
pub struct WeightInit {
    policy: Option<InitPolicy>,
    gain: f64,
}

impl WeightInit {
    /// Creates a pass for the named policy with the given gain.
    pub fn new(init_type: &str, gain: f64) -> Self {
        let policy = InitPolicy::from_name(init_type);
        if policy.is_none() {
            warn!(init_type, "unrecognized init policy, keeping default weights");
        }
        Self { policy, gain }
    }

    /// Applies the pass to every parameter set, in order.
    pub fn apply_all(&self, params: &[ParamSet<'_>]) -> Result<()> {
        for p in params {
            self.apply(p)?;
        }
        Ok(())
    }

    /// Applies the pass to a single layer's parameters, mutating the
    /// underlying variables in place.
    pub fn apply(&self, params: &ParamSet<'_>) -> Result<()> {
        let policy = match self.policy {
            Some(policy) => policy,
            None => return Ok(()),
        };
        match params {
            ParamSet::Conv { weight, bias } | ParamSet::Linear { weight, bias } => {
                weight.set(&self.filter_weight(policy, weight)?)?;
                if let Some(bias) = bias {
                    zero(bias)?;
                }
            }
            ParamSet::Norm { weight, bias } => {
                let w = Tensor::randn(
                    1f32,
                    self.gain as f32,
                    weight.dims().to_vec(),
                    weight.device(),
                )?;
                weight.set(&w)?;
                zero(bias)?;
            }
        }
        Ok(())
    }

    fn filter_weight(&self, policy: InitPolicy, weight: &Var) -> Result<Tensor> {
        let dims = weight.dims().to_vec();
        let (fan_in, fan_out) = fan_in_out(&dims);
        let device = weight.device();
        match policy {
            InitPolicy::Normal => Tensor::randn(0f32, self.gain as f32, dims, device),
            InitPolicy::Xavier => {
                let std = self.gain * (2.0 / (fan_in + fan_out) as f64).sqrt();
                Tensor::randn(0f32, std as f32, dims, device)
            }
            InitPolicy::Kaiming => {
                let std = (2.0 / fan_in as f64).sqrt();
                Tensor::randn(0f32, std as f32, dims, device)
            }
            InitPolicy::Orthogonal => orthogonal(&dims, self.gain, device),
        }
    }
}

fn zero(var: &Var) -> Result<()> {
    var.set(&Tensor::zeros(
        var.dims().to_vec(),
        DType::F32,
        var.device(),
    )?)
}

/// Fan-in/fan-out of a filter shaped `(out, in, ...)`; trailing dimensions
/// form the receptive field.
fn fan_in_out(dims: &[usize]) -> (usize, usize) {
    let receptive: usize = dims[2..].iter().product();
    (dims[1] * receptive, dims[0] * receptive)
}

/// Draws a matrix with orthonormal rows (or columns, whichever fits) from
/// the QR decomposition of a Gaussian sample, scaled by `gain`, and
/// reshapes it to `dims`. The weight is viewed as `(dims[0], rest)`.
fn orthogonal(dims: &[usize], gain: f64, device: &candle_core::Device) -> Result<Tensor> {
    let rows = dims[0];
    let cols: usize = dims[1..].iter().product();
    let (m, n) = if rows < cols { (cols, rows) } else { (rows, cols) };

    let sample = Tensor::randn(0f32, 1f32, (m, n), device)?
        .flatten_all()?
        .to_vec1::<f32>()?;
    let mut q = Array2::from_shape_vec((m, n), sample).map_err(candle_core::Error::wrap)?;

    // Modified Gram-Schmidt; the positive normalization plays the role of
    // the usual sign correction on diag(R).
    for j in 0..n {
        let mut v = q.column(j).to_owned();
        for i in 0..j {
            let qi = q.column(i).to_owned();
            let r = qi.dot(&v);
            v.zip_mut_with(&qi, |a, &b| *a -= r * b);
        }
        let norm = v.dot(&v).sqrt().max(1e-12);
        v.mapv_inplace(|x| x / norm);
        q.column_mut(j).assign(&v);
    }

    let out = if rows < cols { q.t().to_owned() } else { q };
    let flat: Vec<f32> = out.iter().map(|&x| x * gain as f32).collect();
    Tensor::from_vec(flat, dims.to_vec(), device)
}
