use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowalignError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("metadata error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("catalog not found: {0}")]
    MissingCatalog(PathBuf),

    #[error("no image at row {row}, column {column}")]
    MissingImage { row: usize, column: usize },

    #[error("only {hits} hits found, need at least {min_hits}")]
    InsufficientHits { hits: usize, min_hits: usize },

    #[error("no acquisition aligned to any end tile")]
    NoAlignment,

    #[error("invalid image shape: {0}")]
    InvalidShape(String),

    #[error("corrupt stats file: {0}")]
    CorruptStats(String),

    #[error("invalid read name: {0}")]
    InvalidReadName(String),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("pipeline error: {0}")]
    Pipeline(String),
}

pub type Result<T> = std::result::Result<T, FlowalignError>;
