//! Error types for tagging and linking.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LinkError>;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Similarity index is empty")]
    EmptyIndex,

    #[error("Cannot link an empty mention")]
    EmptyMention,

    #[error("Ontology error: {0}")]
    Ontology(#[from] snomedix_ontology::OntologyError),

    #[error("Encoder error: {0}")]
    Embed(#[from] snomedix_embed::EmbedError),

    #[error("Index error: {0}")]
    Index(#[from] snomedix_index::IndexError),

    #[error("Tagger error: {0}")]
    Ner(#[from] snomedix_ner::NerError),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for LinkError {
    fn from(e: tokio::task::JoinError) -> Self {
        LinkError::Task(e.to_string())
    }
}
