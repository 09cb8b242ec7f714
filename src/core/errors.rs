//! Error types for the super-resolution pipeline.
//!
//! This module defines the errors that can occur while constructing the
//! networks or running a forward pass, together with utility constructors
//! for creating errors with appropriate context. Shape and channel
//! mismatches reported by the tensor engine are fatal: they are wrapped
//! with context at model boundaries and propagated, never retried.

use thiserror::Error;

/// Enum representing different stages of tensor processing.
///
/// This enum is used to identify which stage of the pipeline an error
/// occurred in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessingStage {
    /// Error occurred during tensor operations.
    TensorOperation,
    /// Error occurred during normalization.
    Normalization,
    /// Error occurred during upsampling.
    Upsample,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::Normalization => write!(f, "normalization"),
            ProcessingStage::Upsample => write!(f, "upsample"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Enum representing the errors that can occur in this crate.
#[derive(Error, Debug)]
pub enum SrError {
    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred during tensor processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred inside a model forward pass or construction.
    #[error("inference failed in {model_name}: {context}")]
    Inference {
        /// The name of the model where the error occurred.
        model_name: String,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

/// Convenient result alias for super-resolution operations.
pub type SrResult<T> = Result<T, SrError>;

impl SrError {
    /// Creates an SrError for tensor operations.
    pub fn tensor_operation(
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind: ProcessingStage::TensorOperation,
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an SrError for a failure inside a named model.
    pub fn inference(
        model_name: impl Into<String>,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.into(),
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an SrError for invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an SrError for configuration problems.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

/// Convert a Candle error to an SrError for model operations.
pub fn candle_to_sr(
    model_name: &str,
    context: impl Into<String>,
    err: candle_core::Error,
) -> SrError {
    SrError::inference(model_name, context, err)
}
