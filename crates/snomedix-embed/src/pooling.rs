//! Pooling strategies for embedding extraction.

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

/// Pooling strategy for converting token embeddings to a string embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PoolingStrategy {
    /// Use [CLS] token embedding (what SapBERT is trained for)
    #[default]
    Cls,

    /// Mean pooling over all tokens (excluding padding)
    Mean,
}

impl PoolingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolingStrategy::Cls => "cls",
            PoolingStrategy::Mean => "mean",
        }
    }

    /// Apply pooling to token embeddings.
    ///
    /// # Arguments
    /// * `embeddings` - Tensor of shape (batch_size, seq_len, hidden_dim)
    /// * `attention_mask` - F32 tensor of shape (batch_size, seq_len)
    ///
    /// # Returns
    /// Tensor of shape (batch_size, hidden_dim)
    pub fn apply(&self, embeddings: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            PoolingStrategy::Cls => cls_pool(embeddings),
            PoolingStrategy::Mean => mean_pool(embeddings, attention_mask),
        }
    }
}

/// Mean pooling over non-padding tokens.
fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    // (batch, seq_len, 1) mask broadcast over hidden_dim
    let mask_expanded = attention_mask
        .unsqueeze(2)?
        .expand(embeddings.shape())?;

    let sum_embeddings = (embeddings * &mask_expanded)?.sum(1)?;

    let sum_mask = attention_mask
        .unsqueeze(2)?
        .sum(1)?
        .clamp(1e-9f32, f32::MAX)?;

    sum_embeddings.broadcast_div(&sum_mask)
}

/// Extract [CLS] token embedding (first token).
fn cls_pool(embeddings: &Tensor) -> candle_core::Result<Tensor> {
    embeddings.narrow(1, 0, 1)?.squeeze(1)
}

/// L2 normalize embeddings.
pub fn l2_normalize(embeddings: &Tensor) -> candle_core::Result<Tensor> {
    let norms = embeddings.sqr()?.sum_keepdim(1)?.sqrt()?;
    let norms_clamped = norms.clamp(1e-9f32, f32::MAX)?;
    embeddings.broadcast_div(&norms_clamped)
}
