//! Utility functions: device parsing and image/tensor conversion.

pub mod device;
pub mod image;

pub use device::parse_device;
pub use image::{edge_map, gray_to_tensor, image_to_tensor, load_image, tensor_to_image};
