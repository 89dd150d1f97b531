//! Configuration for the string encoder.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::PoolingStrategy;

/// Configuration for [`crate::BertEncoder`].
///
/// Ontology surface forms and query mentions must be encoded with the same
/// values; [`EncoderConfig::identifier`] is folded into the embedding cache key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Hugging Face model ID
    pub model_id: String,

    /// Directory holding a local copy of the model; downloads land here too.
    pub local_dir: Option<PathBuf>,

    /// Fixed token length; inputs are truncated and padded to it (default: 8)
    pub max_length: usize,

    /// Batch size for bulk encoding (default: 128)
    pub batch_size: usize,

    /// L2-normalize vectors (default: false)
    pub normalize: bool,

    /// Pooling strategy (default: cls)
    pub pooling: PoolingStrategy,

    /// Use GPU if available (default: false)
    pub use_gpu: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            model_id: "cambridgeltl/SapBERT-from-PubMedBERT-fulltext".to_string(),
            local_dir: None,
            max_length: 8,
            batch_size: 128,
            normalize: false,
            pooling: PoolingStrategy::Cls,
            use_gpu: false,
        }
    }
}

impl EncoderConfig {
    /// Use a custom model.
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Look for (and store) model files in `dir`.
    pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_dir = Some(dir.into());
        self
    }

    /// Set batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the fixed token length.
    pub fn with_max_length(mut self, length: usize) -> Self {
        self.max_length = length;
        self
    }

    /// Everything that changes the produced vectors.
    pub fn identifier(&self) -> String {
        format!(
            "{}|max_length={}|pooling={}|normalize={}",
            self.model_id,
            self.max_length,
            self.pooling.as_str(),
            self.normalize
        )
    }
}
