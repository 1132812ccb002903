use thiserror::Error;

/// Error taxonomy for the ISI analysis pipeline (spec §7).
///
/// Every variant is surfaced to the caller with a short machine-readable
/// kind (the variant itself) and a descriptive message naming the
/// offending parameter or array shape. Only the coherence → magnitude
/// degradation is handled internally; every other condition aborts the
/// run and propagates.
#[derive(Error, Debug)]
pub enum IsiError {
    #[error("configuration missing required field: {0}")]
    ConfigurationMissing(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid shape: expected {expected}, got {got}")]
    InvalidShape { expected: String, got: String },

    #[error("invalid dtype: {0}")]
    InvalidDType(String),

    #[error("backend failure ({backend}, {shape}): {reason}")]
    BackendFailure {
        backend: String,
        shape: String,
        reason: String,
    },

    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}

pub type Result<T> = std::result::Result<T, IsiError>;
