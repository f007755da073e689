use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the derivation engine.
pub type ImpactorResult<T> = Result<T, ImpactorError>;

/// Failure reported by a [`GeometryKernel`](crate::GeometryKernel) operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("invalid {what}: {value}")]
    InvalidDimension { what: &'static str, value: f64 },

    #[error("{operation} produced an empty solid")]
    EmptySolid { operation: &'static str },

    #[error("geometry backend failure: {message}")]
    Backend { message: String },
}

impl KernelError {
    /// Rejects non-finite or non-positive dimensions before they reach the backend.
    pub fn require_positive(what: &'static str, value: f64) -> Result<f64, KernelError> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(KernelError::InvalidDimension { what, value })
        }
    }
}

/// Failure while persisting a composed stage.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not tessellate part '{part}': {message}")]
    Tessellation { part: String, message: String },

    #[error("metadata encoding failed: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Error taxonomy of the engine.
///
/// `InvalidInput` and `GeometryInfeasible` are raised by the engine itself,
/// `KernelFailure` wraps whatever the geometry backend rejected together with
/// the part that was being built.
#[derive(Debug, Error)]
pub enum ImpactorError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("geometry infeasible: {message}")]
    GeometryInfeasible { message: String },

    #[error("kernel failure while building '{part}': {source}")]
    KernelFailure {
        part: String,
        #[source]
        source: KernelError,
    },

    #[error("stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: Box<ImpactorError>,
    },

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl ImpactorError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn infeasible(message: impl Into<String>) -> Self {
        Self::GeometryInfeasible {
            message: message.into(),
        }
    }

    pub fn kernel(part: impl Into<String>, source: KernelError) -> Self {
        Self::KernelFailure {
            part: part.into(),
            source,
        }
    }

    pub fn stage(stage: impl Into<String>, source: ImpactorError) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Strips `StageFailed` wrappers and returns the underlying cause.
    pub fn root_cause(&self) -> &ImpactorError {
        match self {
            ImpactorError::StageFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self.root_cause(), ImpactorError::InvalidInput { .. })
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self.root_cause(), ImpactorError::GeometryInfeasible { .. })
    }
}
