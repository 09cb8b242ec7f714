//! Core error handling for the super-resolution pipeline.

pub mod errors;

pub use errors::{ProcessingStage, SrError, SrResult};
