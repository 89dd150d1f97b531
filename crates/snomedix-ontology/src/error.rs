//! Error types for ontology loading.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OntologyError>;

#[derive(Error, Debug)]
pub enum OntologyError {
    #[error("Ontology resource not found: {0}")]
    NotFound(PathBuf),

    #[error("Missing RF2 file with prefix '{prefix}' in {dir}")]
    MissingFile { prefix: &'static str, dir: PathBuf },

    #[error("Malformed RF2 file {file}:{line}: {reason}")]
    Malformed {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Ontology contains no concepts")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
