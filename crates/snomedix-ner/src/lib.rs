//! Clinical named entity recognition using Candle.
//!
//! Splits documents into sentences and tags each sentence with a
//! token-classification model (or a dictionary), producing typed spans with
//! sentence-local byte offsets. Linking the spans to ontology concepts
//! happens downstream.

pub mod bio;
mod bert_tagger;
mod lexicon;
pub mod segment;
mod tagger;

pub use bert_tagger::{BertSequenceTagger, TaggerConfig};
pub use lexicon::LexiconTagger;
pub use segment::SentenceSplitter;
pub use tagger::{SequenceTagger, TaggedSpan};

pub type Result<T> = std::result::Result<T, NerError>;

#[derive(Debug, thiserror::Error)]
pub enum NerError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Invalid lexicon {path}:{line}: {reason}")]
    Lexicon {
        path: std::path::PathBuf,
        line: usize,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<candle_core::Error> for NerError {
    fn from(e: candle_core::Error) -> Self {
        NerError::Inference(e.to_string())
    }
}

impl From<tokenizers::Error> for NerError {
    fn from(e: tokenizers::Error) -> Self {
        NerError::Tokenization(e.to_string())
    }
}

impl From<snomedix_embed::EmbedError> for NerError {
    fn from(e: snomedix_embed::EmbedError) -> Self {
        use snomedix_embed::EmbedError;
        match e {
            EmbedError::Download(msg) => NerError::Download(msg),
            EmbedError::Tokenizer(msg) => NerError::Tokenization(msg),
            EmbedError::Inference(msg) => NerError::Inference(msg),
            EmbedError::Io(err) => NerError::Io(err),
            other => NerError::ModelLoad(other.to_string()),
        }
    }
}
