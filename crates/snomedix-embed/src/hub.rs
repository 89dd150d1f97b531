//! Model file resolution: a local directory first, the Hugging Face Hub second.
//!
//! Downloads are copied into the local directory (when one is configured) so
//! the next start does not touch the network.

use std::fs;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{Config, HiddenAct, PositionEmbeddingType};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::{EmbedError, Result};

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const VOCAB_FILE: &str = "vocab.txt";
const WEIGHT_FILES: [&str; 2] = ["model.safetensors", "pytorch_model.bin"];

/// Paths of everything needed to instantiate a BERT-family model.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    /// `tokenizer.json`, when the repository ships one.
    pub tokenizer: Option<PathBuf>,
    /// `vocab.txt`, used to build a WordPiece tokenizer otherwise.
    pub vocab: Option<PathBuf>,
    pub weights: PathBuf,
}

impl ModelFiles {
    /// Resolve model files, downloading `model_id` when `local_dir` is unset
    /// or incomplete. Runs the blocking hub client off the async runtime.
    pub async fn resolve(model_id: String, local_dir: Option<PathBuf>) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::resolve_blocking(&model_id, local_dir.as_deref()))
            .await
            .map_err(|e| EmbedError::Download(e.to_string()))?
    }

    pub fn resolve_blocking(model_id: &str, local_dir: Option<&Path>) -> Result<Self> {
        if let Some(dir) = local_dir {
            if let Some(files) = Self::local(dir) {
                info!("Using local model files in {:?}", dir);
                return Ok(files);
            }
            warn!(
                "Model files not found in {:?}, downloading default model {}",
                dir, model_id
            );
        }

        let files = Self::download(model_id)?;
        match local_dir {
            Some(dir) => files.persist_to(dir),
            None => Ok(files),
        }
    }

    /// Files already present in `dir`, if the set is complete.
    pub fn local(dir: &Path) -> Option<Self> {
        let config = dir.join(CONFIG_FILE);
        if !config.is_file() {
            return None;
        }
        let weights = WEIGHT_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())?;
        let tokenizer = Some(dir.join(TOKENIZER_FILE)).filter(|p| p.is_file());
        let vocab = Some(dir.join(VOCAB_FILE)).filter(|p| p.is_file());
        if tokenizer.is_none() && vocab.is_none() {
            return None;
        }
        Some(Self { config, tokenizer, vocab, weights })
    }

    /// Download from the Hugging Face Hub (cached under the hub cache dir).
    pub fn download(model_id: &str) -> Result<Self> {
        let api = Api::new().map_err(|e| EmbedError::Download(format!("API init: {}", e)))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        info!("Downloading {} from Hugging Face Hub...", model_id);
        let config = repo
            .get(CONFIG_FILE)
            .map_err(|e| EmbedError::Download(format!("{}: {}", CONFIG_FILE, e)))?;

        // Try tokenizer.json first, fall back to vocab.txt (older BERT repos)
        let tokenizer = repo.get(TOKENIZER_FILE).ok();
        let vocab = if tokenizer.is_none() {
            debug!("{} not found, fetching {}", TOKENIZER_FILE, VOCAB_FILE);
            Some(
                repo.get(VOCAB_FILE)
                    .map_err(|e| EmbedError::Download(format!("{}: {}", VOCAB_FILE, e)))?,
            )
        } else {
            None
        };

        let weights = repo
            .get(WEIGHT_FILES[0])
            .or_else(|_| repo.get(WEIGHT_FILES[1]))
            .map_err(|e| EmbedError::Download(format!("model weights: {}", e)))?;
        info!("Weights at: {:?}", weights);

        Ok(Self { config, tokenizer, vocab, weights })
    }

    /// Copy every file into `dir` and return the copied paths.
    pub fn persist_to(&self, dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let copy = |src: &Path| -> Result<PathBuf> {
            let name = src
                .file_name()
                .ok_or_else(|| EmbedError::Download(format!("bad model path {:?}", src)))?;
            let dest = dir.join(name);
            fs::copy(src, &dest)?;
            Ok(dest)
        };
        let persisted = Self {
            config: copy(&self.config)?,
            tokenizer: self.tokenizer.as_deref().map(copy).transpose()?,
            vocab: self.vocab.as_deref().map(copy).transpose()?,
            weights: copy(&self.weights)?,
        };
        info!("Model files stored in {:?}", dir);
        Ok(persisted)
    }

    /// Raw `config.json`.
    pub fn config_json(&self) -> Result<serde_json::Value> {
        let content = fs::read_to_string(&self.config)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// BERT config parsed from `config.json`.
    pub fn bert_config(&self) -> Result<Config> {
        Ok(bert_config(&self.config_json()?))
    }

    /// Memory-map safetensors, or read a PyTorch checkpoint.
    pub fn var_builder(&self, device: &Device) -> Result<VarBuilder<'static>> {
        let is_safetensors = self
            .weights
            .extension()
            .map(|e| e == "safetensors")
            .unwrap_or(false);
        let vb = if is_safetensors {
            // SAFETY: the weights file is not modified while the model is alive.
            unsafe { VarBuilder::from_mmaped_safetensors(&[&self.weights], DType::F32, device)? }
        } else {
            VarBuilder::from_pth(&self.weights, DType::F32, device)?
        };
        Ok(vb)
    }

    /// Load `tokenizer.json`, or build an uncased BERT WordPiece tokenizer
    /// from `vocab.txt`.
    pub fn tokenizer(&self) -> Result<Tokenizer> {
        if let Some(path) = &self.tokenizer {
            return Tokenizer::from_file(path).map_err(|e| EmbedError::Tokenizer(e.to_string()));
        }
        let vocab_path = self
            .vocab
            .as_ref()
            .ok_or_else(|| EmbedError::Tokenizer("No tokenizer found".to_string()))?;
        wordpiece_from_vocab(vocab_path)
    }
}

/// Uncased BERT WordPiece tokenizer with `[CLS]`/`[SEP]` post-processing.
pub fn wordpiece_from_vocab(vocab_path: &Path) -> Result<Tokenizer> {
    use tokenizers::models::wordpiece::WordPieceBuilder;
    use tokenizers::normalizers::bert::BertNormalizer;
    use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
    use tokenizers::processors::bert::BertProcessing;

    let vocab_content = fs::read_to_string(vocab_path)?;
    let vocab: ahash::AHashMap<String, u32> = vocab_content
        .lines()
        .enumerate()
        .map(|(i, line)| (line.to_string(), i as u32))
        .collect();
    info!("Loaded vocab with {} tokens", vocab.len());

    let special = |token: &str| {
        vocab
            .get(token)
            .copied()
            .ok_or_else(|| EmbedError::Tokenizer(format!("{} missing from vocab", token)))
    };
    let cls = ("[CLS]".to_string(), special("[CLS]")?);
    let sep = ("[SEP]".to_string(), special("[SEP]")?);

    let wordpiece = WordPieceBuilder::new()
        .vocab(vocab)
        .continuing_subword_prefix("##".to_string())
        .max_input_chars_per_word(100)
        .unk_token("[UNK]".to_string())
        .build()
        .map_err(|e| EmbedError::Tokenizer(format!("WordPiece build: {}", e)))?;

    let mut tokenizer = Tokenizer::new(wordpiece);
    tokenizer
        .with_normalizer(Some(BertNormalizer::new(true, true, None, true)))
        .with_pre_tokenizer(Some(BertPreTokenizer))
        .with_post_processor(Some(BertProcessing::new(sep, cls)));
    Ok(tokenizer)
}

/// Build a candle BERT config from a Hugging Face `config.json`.
pub fn bert_config(json: &serde_json::Value) -> Config {
    let usize_or = |key: &str, default: usize| {
        json.get(key).and_then(|v| v.as_u64()).map(|v| v as usize).unwrap_or(default)
    };
    let f64_or = |key: &str, default: f64| json.get(key).and_then(|v| v.as_f64()).unwrap_or(default);

    let hidden_act = match json.get("hidden_act").and_then(|v| v.as_str()) {
        Some("relu") => HiddenAct::Relu,
        Some("gelu_new") | Some("gelu_approximate") => HiddenAct::GeluApproximate,
        _ => HiddenAct::Gelu,
    };

    Config {
        vocab_size: usize_or("vocab_size", 30522),
        hidden_size: usize_or("hidden_size", 768),
        num_hidden_layers: usize_or("num_hidden_layers", 12),
        num_attention_heads: usize_or("num_attention_heads", 12),
        intermediate_size: usize_or("intermediate_size", 3072),
        hidden_act,
        hidden_dropout_prob: f64_or("hidden_dropout_prob", 0.1),
        max_position_embeddings: usize_or("max_position_embeddings", 512),
        type_vocab_size: usize_or("type_vocab_size", 2),
        initializer_range: f64_or("initializer_range", 0.02),
        layer_norm_eps: f64_or("layer_norm_eps", 1e-12),
        pad_token_id: usize_or("pad_token_id", 0),
        position_embedding_type: PositionEmbeddingType::Absolute,
        use_cache: true,
        classifier_dropout: None,
        model_type: json.get("model_type").and_then(|v| v.as_str()).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bert_config_defaults_and_overrides() {
        let json = serde_json::json!({
            "hidden_size": 384,
            "num_hidden_layers": 6,
            "hidden_act": "relu",
            "model_type": "bert"
        });
        let config = bert_config(&json);
        assert_eq!(config.hidden_size, 384);
        assert_eq!(config.num_hidden_layers, 6);
        assert_eq!(config.vocab_size, 30522);
        assert_eq!(config.model_type.as_deref(), Some("bert"));
    }

    #[test]
    fn test_local_requires_complete_file_set() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ModelFiles::local(dir.path()).is_none());

        fs::write(dir.path().join(CONFIG_FILE), "{}").unwrap();
        fs::write(dir.path().join("pytorch_model.bin"), b"").unwrap();
        assert!(ModelFiles::local(dir.path()).is_none());

        fs::write(dir.path().join(VOCAB_FILE), "[PAD]\n[UNK]\n[CLS]\n[SEP]\n").unwrap();
        let files = ModelFiles::local(dir.path()).unwrap();
        assert!(files.tokenizer.is_none());
        assert!(files.weights.ends_with("pytorch_model.bin"));
    }

    #[test]
    fn test_wordpiece_tokenizer_adds_cls_and_sep() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = dir.path().join(VOCAB_FILE);
        fs::write(&vocab, "[PAD]\n[UNK]\n[CLS]\n[SEP]\nhead\n##ache\nmigraine\n").unwrap();

        let tokenizer = wordpiece_from_vocab(&vocab).unwrap();
        let encoding = tokenizer.encode("Headache MIGRAINE", true).unwrap();
        assert_eq!(encoding.get_tokens(), &["[CLS]", "head", "##ache", "migraine", "[SEP]"]);
        assert_eq!(encoding.get_ids(), &[2, 4, 5, 6, 3]);
    }
}
