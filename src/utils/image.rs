//! Conversions between images and the NCHW tensors the models consume.

use candle_core::{Device, Tensor};
use image::{GrayImage, RgbImage};

use crate::core::SrError;

/// Loads an image from a file path and converts it to an [`RgbImage`].
pub fn load_image(path: &std::path::Path) -> Result<RgbImage, SrError> {
    let img = image::open(path).map_err(SrError::ImageLoad)?;
    Ok(img.to_rgb8())
}

/// Converts an RGB image to a `(1, 3, H, W)` f32 tensor with values in
/// [0, 1].
pub fn image_to_tensor(img: &RgbImage, device: &Device) -> Result<Tensor, SrError> {
    let (width, height) = img.dimensions();
    let (w, h) = (width as usize, height as usize);
    let mut data = vec![0f32; 3 * h * w];
    for (x, y, pixel) in img.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for channel in 0..3 {
            data[channel * h * w + y * w + x] = pixel.0[channel] as f32 / 255.0;
        }
    }
    Tensor::from_vec(data, (1, 3, h, w), device)
        .map_err(|e| SrError::tensor_operation("build image tensor", e))
}

/// Converts a grayscale image to a `(1, 1, H, W)` f32 tensor with values
/// in [0, 1].
pub fn gray_to_tensor(img: &GrayImage, device: &Device) -> Result<Tensor, SrError> {
    let (width, height) = img.dimensions();
    let (w, h) = (width as usize, height as usize);
    let mut data = vec![0f32; h * w];
    for (x, y, pixel) in img.enumerate_pixels() {
        data[y as usize * w + x as usize] = pixel.0[0] as f32 / 255.0;
    }
    Tensor::from_vec(data, (1, 1, h, w), device)
        .map_err(|e| SrError::tensor_operation("build edge tensor", e))
}

/// Converts a `(1, 3, H, W)` tensor with values in [0, 1] back to an RGB
/// image, clamping out-of-range values.
pub fn tensor_to_image(tensor: &Tensor) -> Result<RgbImage, SrError> {
    let (b, c, h, w) = tensor
        .dims4()
        .map_err(|e| SrError::tensor_operation("read image dims", e))?;
    if b != 1 || c != 3 {
        return Err(SrError::invalid_input(format!(
            "expected a (1, 3, H, W) tensor, got ({b}, {c}, {h}, {w})"
        )));
    }
    let data: Vec<f32> = tensor
        .flatten_all()
        .map_err(|e| SrError::tensor_operation("flatten image tensor", e))?
        .to_vec1()
        .map_err(|e| SrError::tensor_operation("read image values", e))?;

    let img = RgbImage::from_fn(w as u32, h as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let mut rgb = [0u8; 3];
        for (channel, value) in rgb.iter_mut().enumerate() {
            let v = data[channel * h * w + y * w + x].clamp(0.0, 1.0);
            *value = (v * 255.0).round() as u8;
        }
        image::Rgb(rgb)
    });
    Ok(img)
}

/// Extracts a `(1, 1, H, W)` binary edge tensor from an RGB image using a
/// Canny detector, the form in which the composite model expects its
/// second input.
pub fn edge_map(
    img: &RgbImage,
    low_threshold: f32,
    high_threshold: f32,
    device: &Device,
) -> Result<Tensor, SrError> {
    let gray = image::imageops::grayscale(img);
    let edges = imageproc::edges::canny(&gray, low_threshold, high_threshold);
    gray_to_tensor(&edges, device)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 16) as u8, (y * 16) as u8, 128])
        })
    }

    #[test]
    fn test_image_tensor_round_trip() {
        let device = Device::Cpu;
        let img = gradient_image(8, 6);
        let tensor = image_to_tensor(&img, &device).unwrap();
        assert_eq!(tensor.dims(), &[1, 3, 6, 8]);

        let back = tensor_to_image(&tensor).unwrap();
        assert_eq!(back.dimensions(), (8, 6));
        assert_eq!(back, img);
    }

    #[test]
    fn test_tensor_to_image_rejects_wrong_channels() {
        let device = Device::Cpu;
        let t = Tensor::zeros((1, 1, 4, 4), candle_core::DType::F32, &device).unwrap();
        assert!(tensor_to_image(&t).is_err());
    }

    #[test]
    fn test_edge_map_shape_and_binarity() {
        let device = Device::Cpu;
        let img = gradient_image(16, 16);
        let edges = edge_map(&img, 10.0, 40.0, &device).unwrap();
        assert_eq!(edges.dims(), &[1, 1, 16, 16]);

        let values: Vec<f32> = edges.flatten_all().unwrap().to_vec1().unwrap();
        assert!(values.iter().all(|&v| v == 0.0 || v == 1.0));
    }
}
