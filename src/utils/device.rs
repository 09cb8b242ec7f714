//! Device configuration for Candle-based models.

use candle_core::Device;

use crate::core::SrError;

/// Parses a device string and creates a Candle [`Device`].
///
/// Accepts `"cpu"`, `"cuda"`/`"gpu"` (CUDA device 0), or `"cuda:N"`.
///
/// # Errors
///
/// Returns a [`SrError::ConfigError`] if the string is not one of the
/// supported formats, CUDA is requested without the `cuda` feature, or
/// device creation fails.
pub fn parse_device(device_str: &str) -> Result<Device, SrError> {
    let device_str = device_str.to_lowercase();
    let ordinal = match device_str.as_str() {
        "cpu" => return Ok(Device::Cpu),
        "cuda" | "gpu" => 0,
        s if s.starts_with("cuda:") => {
            let rest = s.strip_prefix("cuda:").unwrap_or_default();
            rest.parse::<usize>().map_err(|_| SrError::ConfigError {
                message: format!("invalid CUDA device ordinal in '{s}'"),
            })?
        }
        other => {
            return Err(SrError::ConfigError {
                message: format!("unknown device '{other}', use 'cpu', 'cuda', or 'cuda:N'"),
            });
        }
    };
    new_cuda(ordinal)
}

#[cfg(feature = "cuda")]
fn new_cuda(ordinal: usize) -> Result<Device, SrError> {
    Device::new_cuda(ordinal).map_err(|e| SrError::ConfigError {
        message: format!("failed to create CUDA device {ordinal}: {e}"),
    })
}

#[cfg(not(feature = "cuda"))]
fn new_cuda(_ordinal: usize) -> Result<Device, SrError> {
    Err(SrError::ConfigError {
        message: "CUDA support not enabled, compile with --features cuda".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu() {
        assert!(matches!(parse_device("cpu"), Ok(Device::Cpu)));
        assert!(matches!(parse_device("CPU"), Ok(Device::Cpu)));
    }

    #[test]
    fn test_parse_unknown() {
        assert!(parse_device("tpu").is_err());
        assert!(parse_device("cuda:x").is_err());
    }
}
