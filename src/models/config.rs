//! Construction parameters for the generators and the composite model.

use serde::Deserialize;
use std::path::Path;

use crate::core::SrError;
use crate::init::DEFAULT_GAIN;

/// Construction parameters for [`crate::models::EdgeGenerator`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EdgeGeneratorConfig {
    /// Nominal super-resolution factor. Accepted for compatibility with
    /// the composite contract but not used by the generator itself; see
    /// [`crate::models::UPSCALE_FACTOR`].
    pub scale: usize,
    /// Number of residual blocks in the middle stage. Zero is valid and
    /// makes the middle stage an identity pass-through.
    pub residual_blocks: usize,
    /// Wraps every convolution except the output head in spectral
    /// normalization.
    pub use_spectral_norm: bool,
    /// Runs the weight initializer immediately after construction.
    pub init_weights: bool,
    /// Name of the initialization policy. An unrecognized name leaves the
    /// default weights in place.
    pub init_type: String,
    /// Gain passed to the initialization policy.
    pub init_gain: f64,
}

impl Default for EdgeGeneratorConfig {
    fn default() -> Self {
        Self {
            scale: 4,
            residual_blocks: 8,
            use_spectral_norm: true,
            init_weights: true,
            init_type: "normal".to_string(),
            init_gain: DEFAULT_GAIN,
        }
    }
}

impl EdgeGeneratorConfig {
    /// Validates the parameter ranges.
    pub fn validate(&self) -> Result<(), SrError> {
        validate_common("EdgeGenerator", self.scale, self.init_gain)
    }
}

/// Construction parameters for [`crate::models::SrGenerator`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SrGeneratorConfig {
    /// Nominal super-resolution factor; accepted but unused, as above.
    pub scale: usize,
    /// Number of residual blocks in the middle stage.
    pub residual_blocks: usize,
    /// Runs the weight initializer immediately after construction.
    pub init_weights: bool,
    /// Name of the initialization policy.
    pub init_type: String,
    /// Gain passed to the initialization policy.
    pub init_gain: f64,
}

impl Default for SrGeneratorConfig {
    fn default() -> Self {
        Self {
            scale: 4,
            residual_blocks: 8,
            init_weights: true,
            init_type: "normal".to_string(),
            init_gain: DEFAULT_GAIN,
        }
    }
}

impl SrGeneratorConfig {
    /// Validates the parameter ranges.
    pub fn validate(&self) -> Result<(), SrError> {
        validate_common("SRGenerator", self.scale, self.init_gain)
    }
}

/// Construction parameters for [`crate::models::EdgeSrModel`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EdgeSrConfig {
    /// Spectral-normalization switch forwarded to the edge generator.
    pub use_spectral_norm: bool,
    /// Residual-block count forwarded to both generators.
    pub residual_blocks: usize,
    /// Initializer switch forwarded to both generators.
    pub init_weights: bool,
}

impl Default for EdgeSrConfig {
    fn default() -> Self {
        Self {
            use_spectral_norm: true,
            residual_blocks: 8,
            init_weights: true,
        }
    }
}

impl EdgeSrConfig {
    /// Loads the configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SrError> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| SrError::ConfigError {
            message: format!("failed to parse edge-sr config: {e}"),
        })
    }
}

fn validate_common(model: &str, scale: usize, init_gain: f64) -> Result<(), SrError> {
    if scale == 0 {
        return Err(SrError::ConfigError {
            message: format!("{model}: scale must be > 0"),
        });
    }
    if !init_gain.is_finite() || init_gain <= 0.0 {
        return Err(SrError::ConfigError {
            message: format!("{model}: init_gain must be positive and finite, got {init_gain}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference() {
        let cfg = EdgeGeneratorConfig::default();
        assert_eq!(cfg.scale, 4);
        assert_eq!(cfg.residual_blocks, 8);
        assert!(cfg.use_spectral_norm);
        assert!(cfg.init_weights);
        assert_eq!(cfg.init_type, "normal");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_gain() {
        let cfg = SrGeneratorConfig {
            init_gain: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_path_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"use_spectral_norm": false}}"#).unwrap();
        let cfg = EdgeSrConfig::from_path(file.path()).unwrap();
        assert!(!cfg.use_spectral_norm);
        assert_eq!(cfg.residual_blocks, 8);
    }
}
