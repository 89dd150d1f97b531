//! String encoder: trait and the candle BERT implementation.

use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_transformers::models::bert::BertModel;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::device::{is_gpu, select_device};
use crate::hub::ModelFiles;
use crate::pooling::l2_normalize;
use crate::{EmbedError, EncoderConfig, Result};

/// Maps strings to fixed-size vectors.
///
/// Implementations must be deterministic: the same input always yields the
/// same vector, and `identifier` changes whenever that mapping would.
pub trait Encoder: Send + Sync {
    /// Encode many strings; output order matches input order.
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Encode a single string.
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        self.encode_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::InvalidInput("No embedding produced".to_string()))
    }

    /// Length of every produced vector.
    fn dimension(&self) -> usize;

    /// Stable description of the model and settings behind the vectors.
    fn identifier(&self) -> String;
}

/// BERT encoder (SapBERT by default) producing pooled hidden states.
pub struct BertEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    config: EncoderConfig,
    dimension: usize,
}

impl BertEncoder {
    /// Resolve model files (local dir or hub download) and load the model.
    pub async fn new(config: EncoderConfig) -> Result<Self> {
        info!("Loading encoder model: {}", config.model_id);
        let files = ModelFiles::resolve(config.model_id.clone(), config.local_dir.clone()).await?;
        Self::from_files(&files, config)
    }

    /// Load from already resolved files.
    pub fn from_files(files: &ModelFiles, config: EncoderConfig) -> Result<Self> {
        let start = Instant::now();
        if config.max_length == 0 {
            return Err(EmbedError::InvalidInput("max_length must be positive".to_string()));
        }

        let device = select_device(config.use_gpu);
        debug!("Using device: {:?}", device);

        let bert_config = files.bert_config()?;
        let vb = files.var_builder(&device)?;
        let model = BertModel::load(vb.clone(), &bert_config)
            .or_else(|_| BertModel::load(vb.pp("bert"), &bert_config))
            .map_err(|e| EmbedError::ModelLoad(format!("BertModel: {}", e)))?;

        let mut tokenizer = files.tokenizer()?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))
            .map_err(|e| EmbedError::Tokenizer(e.to_string()))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(config.max_length),
            pad_id,
            pad_token: "[PAD]".to_string(),
            ..Default::default()
        }));

        info!(
            "Encoder loaded in {:.2}s (dim={}, max_length={})",
            start.elapsed().as_secs_f32(),
            bert_config.hidden_size,
            config.max_length
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension: bert_config.hidden_size,
            config,
        })
    }

    /// Forward one batch through the model.
    fn forward_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let text_refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let encodings = self
            .tokenizer
            .encode_batch(text_refs, true)
            .map_err(|e| EmbedError::Tokenizer(e.to_string()))?;

        // Fixed padding makes every encoding the same length.
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);
        let batch_size = encodings.len();
        let mut input_ids = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask = Vec::with_capacity(batch_size * seq_len);
        let mut token_type_ids = Vec::with_capacity(batch_size * seq_len);
        for encoding in &encodings {
            if encoding.get_ids().len() != seq_len {
                return Err(EmbedError::Tokenizer(format!(
                    "ragged batch: expected {} tokens, got {}",
                    seq_len,
                    encoding.get_ids().len()
                )));
            }
            input_ids.extend_from_slice(encoding.get_ids());
            attention_mask.extend_from_slice(encoding.get_attention_mask());
            token_type_ids.extend_from_slice(encoding.get_type_ids());
        }

        let input_ids = Tensor::from_vec(input_ids, (batch_size, seq_len), &self.device)?;
        let token_type_ids = Tensor::from_vec(token_type_ids, (batch_size, seq_len), &self.device)?;
        // F32 mask for the broadcasting in pooling
        let attention_mask = Tensor::from_vec(attention_mask, (batch_size, seq_len), &self.device)?
            .to_dtype(DType::F32)?;

        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = self.config.pooling.apply(&hidden, &attention_mask)?;
        let pooled = if self.config.normalize {
            l2_normalize(&pooled)?
        } else {
            pooled
        };

        Ok(pooled.to_vec2::<f32>()?)
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Check if GPU is being used.
    pub fn is_gpu(&self) -> bool {
        is_gpu(&self.device)
    }
}

impl Encoder for BertEncoder {
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            vectors.extend(self.forward_batch(batch)?);
        }

        debug!(
            "Encoded {} texts in {:.2}ms",
            texts.len(),
            start.elapsed().as_secs_f32() * 1000.0
        );
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn identifier(&self) -> String {
        self.config.identifier()
    }
}
