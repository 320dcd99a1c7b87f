//src/error.rs

use thiserror::Error;

/// A row of the alignment table that could not be turned into an `AlignmentHit`.
#[derive(Debug, Error)]
#[error("malformed alignment row at line {line} ({reason}): {row}")]
pub struct MalformedHitError {
    /// 1-based line number in the input table
    pub line: u64,
    pub row: String,
    pub reason: String,
}

/// A taxonomy block with fewer than three attribute values (parent, rank, name).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("taxon {taxid} has {found} attribute value(s), expected at least 3")]
pub struct MalformedTaxonomyError {
    pub taxid: String,
    pub found: usize,
}

/// Lookup failures against the `TaxonomyStore`. Callers resolving lineages
/// treat both variants as "unknown" and fall back to the `None` sentinel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("taxon {0} is not in the taxonomy store")]
    UnknownTaxon(String),
    #[error(transparent)]
    Malformed(#[from] MalformedTaxonomyError),
}

#[derive(Debug, Error)]
pub enum MultitaxError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    MalformedHit(#[from] MalformedHitError),
    #[error("error processing results table (CSV)")]
    Csv(#[from] csv::Error),
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, MultitaxError>;
