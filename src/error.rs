//! # Centralized Error Handling
//!
//! Unified error types for the entire crate using `thiserror`.
//!
//! Validation and configuration errors are raised before any job runs, so
//! they never leave artifacts behind. Everything else aborts the pipeline at
//! the stage where it happened.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for pedsim operations
#[derive(Error, Debug)]
pub enum PedSimError {
    /// I/O errors (file missing, permission denied, read/write failures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure creating, reading or deleting a staged artifact
    #[error("Artifact error at {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Structurally invalid pedigree (duplicates, unknown parents, cycles)
    #[error("Invalid pedigree: {message}")]
    Validation { message: String },

    /// Configuration errors (out-of-range parameters, unusable paths)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Failure reported by a sample simulator, surfaced unchanged
    #[error("Simulation of sample {sample} failed: {message}")]
    Simulation { sample: String, message: String },

    /// VCF parsing errors (malformed records, missing fields)
    #[error("VCF error: {message}")]
    Vcf { message: String },

    /// Reference sequence errors
    #[error("Reference error: {message}")]
    Reference { message: String },

    /// Parse errors
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Type alias for Results using PedSimError
pub type Result<T> = std::result::Result<T, PedSimError>;

impl PedSimError {
    /// Create a pedigree validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a simulation error for a sample
    pub fn simulation(sample: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Simulation {
            sample: sample.into(),
            message: message.into(),
        }
    }

    /// Create a VCF error with a message
    pub fn vcf(message: impl Into<String>) -> Self {
        Self::Vcf {
            message: message.into(),
        }
    }

    /// Create a reference error
    pub fn reference(message: impl Into<String>) -> Self {
        Self::Reference {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Attach the artifact path to an I/O failure
    pub fn artifact(path: &Path, source: std::io::Error) -> Self {
        Self::Artifact {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for errors detected before any job runs
    pub fn is_preflight(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Config { .. })
    }
}

// Convert noodles VCF errors to PedSimError
impl From<noodles::vcf::header::ParseError> for PedSimError {
    fn from(err: noodles::vcf::header::ParseError) -> Self {
        Self::Vcf {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PedSimError::validation("duplicate sample id: F");
        assert_eq!(err.to_string(), "Invalid pedigree: duplicate sample id: F");

        let err = PedSimError::parse(3, "expected at least 5 columns");
        assert_eq!(
            err.to_string(),
            "Parse error at line 3: expected at least 5 columns"
        );
    }

    #[test]
    fn test_preflight_classification() {
        assert!(PedSimError::config("bad").is_preflight());
        assert!(PedSimError::validation("bad").is_preflight());
        assert!(!PedSimError::simulation("C", "boom").is_preflight());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(!PedSimError::artifact(Path::new("x.vcf.gz"), io).is_preflight());
    }
}
