// /src/errors.rs
//! Errors for the document boundary and the editing helpers. Reconciliation
//! itself is total and never produces one of these.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcilerError {
    #[error("Document (de)serialization failed: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Operation index {index} out of range ({len} operations)")]
    OperationOutOfRange { index: usize, len: usize },

    #[error("Container index {index} out of range ({len} containers)")]
    ContainerOutOfRange { index: usize, len: usize },

    #[error("Row {index} out of range in {section} ({len} rows)")]
    RowOutOfRange { section: String, index: usize, len: usize },

    #[error("Cannot remove the last operation of a job")]
    LastOperation,

    #[error("Unknown section '{0}'")]
    UnknownSection(String),

    #[error("Reconciler state lock poisoned")]
    LockPoisoned,

    #[error("Python call failed: {0}")]
    PythonError(String),
}

#[cfg(feature = "python")]
impl From<ReconcilerError> for pyo3::PyErr {
    fn from(err: ReconcilerError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for ReconcilerError {
    fn from(err: pyo3::PyErr) -> Self {
        ReconcilerError::PythonError(err.to_string())
    }
}
