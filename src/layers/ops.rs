//! Tensor operations the engine does not provide directly.
//!
//! Candle has no reflection padding and no instance normalization, so both
//! are implemented here as free functions over NCHW tensors.

use candle_core::{Result, Tensor};

/// Epsilon used by [`instance_norm2d`] throughout the networks.
pub const INSTANCE_NORM_EPS: f64 = 1e-5;

/// Pads the two spatial dimensions of an NCHW tensor by mirroring interior
/// values. The border sample itself is not repeated: padding by 2 turns
/// `[a, b, c, d]` into `[c, b, a, b, c, d, c, b]` along each axis.
///
/// # Errors
///
/// Fails if the input is not 4-D or a spatial dimension is not strictly
/// larger than `pad`.
pub fn reflection_pad2d(x: &Tensor, pad: usize) -> Result<Tensor> {
    if pad == 0 {
        return Ok(x.clone());
    }
    let (_b, _c, h, w) = x.dims4()?;
    let x = reflect_dim(x, 2, h, pad)?;
    reflect_dim(&x, 3, w, pad)
}

fn reflect_dim(x: &Tensor, dim: usize, size: usize, pad: usize) -> Result<Tensor> {
    if size <= pad {
        candle_core::bail!(
            "reflection pad {pad} needs a spatial dimension larger than {pad}, got {size}"
        )
    }
    let mut index = Vec::with_capacity(size + 2 * pad);
    for i in 0..pad {
        index.push((pad - i) as u32);
    }
    for i in 0..size {
        index.push(i as u32);
    }
    for i in 0..pad {
        index.push((size - 2 - i) as u32);
    }
    let len = index.len();
    let index = Tensor::from_vec(index, len, x.device())?;
    x.index_select(&index, dim)
}

/// Normalizes each channel of each sample independently using that sample's
/// own spatial mean and (biased) variance. No running statistics are kept
/// and no affine transform is applied.
pub fn instance_norm2d(x: &Tensor, eps: f64) -> Result<Tensor> {
    let (_b, _c, _h, _w) = x.dims4()?;
    let mean = x.mean_keepdim(2)?.mean_keepdim(3)?;
    let centered = x.broadcast_sub(&mean)?;
    let var = centered.sqr()?.mean_keepdim(2)?.mean_keepdim(3)?;
    centered.broadcast_div(&(var + eps)?.sqrt()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_reflection_pad_zero_is_identity() {
        let device = Device::Cpu;
        let x = Tensor::from_vec(vec![1f32, 2.0, 3.0, 4.0], (1, 1, 1, 4), &device).unwrap();
        let padded = reflection_pad2d(&x, 0).unwrap();
        assert_eq!(padded.dims(), &[1, 1, 1, 4]);
    }

    #[test]
    fn test_reflection_pad_values() {
        let device = Device::Cpu;
        let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let x = Tensor::from_vec(values, (1, 1, 4, 3), &device).unwrap();
        let padded = reflection_pad2d(&x, 2).unwrap();
        assert_eq!(padded.dims(), &[1, 1, 8, 7]);

        // The original column 0 ([0, 3, 6, 9]) lands at padded column 2.
        let col: Vec<f32> = padded
            .narrow(3, 2, 1)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        assert_eq!(col, vec![6.0, 3.0, 0.0, 3.0, 6.0, 9.0, 6.0, 3.0]);
    }

    #[test]
    fn test_reflection_pad_too_small() {
        let device = Device::Cpu;
        let x = Tensor::zeros((1, 1, 2, 2), candle_core::DType::F32, &device).unwrap();
        assert!(reflection_pad2d(&x, 2).is_err());
    }

    #[test]
    fn test_instance_norm_statistics() {
        let device = Device::Cpu;
        let x = Tensor::randn(3f32, 5f32, (2, 4, 8, 8), &device).unwrap();
        let y = instance_norm2d(&x, INSTANCE_NORM_EPS).unwrap();
        assert_eq!(y.dims(), x.dims());

        let worst_mean: f32 = y
            .mean_keepdim(2)
            .unwrap()
            .mean_keepdim(3)
            .unwrap()
            .abs()
            .unwrap()
            .flatten_all()
            .unwrap()
            .max(0)
            .unwrap()
            .to_scalar()
            .unwrap();
        assert!(worst_mean < 1e-4, "per-channel mean should be ~0, got {worst_mean}");

        let var: f32 = y
            .sqr()
            .unwrap()
            .mean_keepdim(2)
            .unwrap()
            .mean_keepdim(3)
            .unwrap()
            .flatten_all()
            .unwrap()
            .min(0)
            .unwrap()
            .to_scalar()
            .unwrap();
        assert!(
            (var - 1.0).abs() < 1e-2,
            "per-channel variance should be ~1, got {var}"
        );
    }
}
