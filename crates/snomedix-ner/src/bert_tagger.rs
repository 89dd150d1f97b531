//! BERT token-classification tagger.

use std::path::PathBuf;
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::{Linear, Module};
use candle_transformers::models::bert::BertModel;
use serde::{Deserialize, Serialize};
use snomedix_embed::device::select_device;
use snomedix_embed::hub::bert_config;
use snomedix_embed::ModelFiles;
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::bio::{self, TokenPrediction};
use crate::{NerError, Result, SequenceTagger, TaggedSpan};

/// Tagger model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerConfig {
    /// Hugging Face model id of a BERT token-classification checkpoint
    pub model_id: String,
    /// Directory checked before downloading; downloads are copied here.
    pub local_dir: Option<PathBuf>,
    /// Tokens per window; longer sentences are tagged in several windows.
    pub max_length: usize,
    pub use_gpu: bool,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            model_id: "samrawal/bert-base-uncased_clinical-ner".to_string(),
            local_dir: None,
            max_length: 512,
            use_gpu: false,
        }
    }
}

impl TaggerConfig {
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_dir = Some(dir.into());
        self
    }
}

/// Sequence tagger backed by a BERT encoder and a linear token classifier.
pub struct BertSequenceTagger {
    model: BertModel,
    classifier: Linear,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    device: Device,
    config: TaggerConfig,
}

impl BertSequenceTagger {
    /// Resolve the model files (local directory or hub) and load the tagger.
    pub async fn new(config: TaggerConfig) -> Result<Self> {
        let files = ModelFiles::resolve(config.model_id.clone(), config.local_dir.clone()).await?;
        Self::from_files(&files, config)
    }

    pub fn from_files(files: &ModelFiles, config: TaggerConfig) -> Result<Self> {
        let start = Instant::now();
        info!("Loading NER model: {}", config.model_id);

        let device = select_device(config.use_gpu);
        let json = files.config_json()?;
        let labels = labels_from_config(&json)?;
        let bert_config = bert_config(&json);
        debug!("NER labels: {:?}", labels);

        let vb = files.var_builder(&device)?;
        let model = BertModel::load(vb.pp("bert"), &bert_config)
            .or_else(|_| BertModel::load(vb.clone(), &bert_config))
            .map_err(|e| NerError::ModelLoad(format!("BertModel: {}", e)))?;
        let classifier = candle_nn::linear(bert_config.hidden_size, labels.len(), vb.pp("classifier"))
            .map_err(|e| NerError::ModelLoad(format!("Classifier: {}", e)))?;

        let mut tokenizer = files.tokenizer()?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))
            .map_err(|e| NerError::Tokenization(e.to_string()))?;
        tokenizer.with_padding(None);

        info!("NER model loaded in {:?} ({} labels)", start.elapsed(), labels.len());

        Ok(Self {
            model,
            classifier,
            tokenizer,
            labels,
            device,
            config,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn config(&self) -> &TaggerConfig {
        &self.config
    }

    /// Run the classifier over one encoding window.
    fn classify(&self, encoding: &Encoding) -> Result<WindowOutput> {
        let ids = encoding.get_ids();
        let seq_len = ids.len();
        let input_ids = Tensor::from_vec(ids.to_vec(), (1, seq_len), &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let attention_mask = Tensor::from_vec(encoding.get_attention_mask().to_vec(), (1, seq_len), &self.device)?;

        // [1, seq, hidden] -> [seq, num_labels]
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let logits = self.classifier.forward(&hidden)?.squeeze(0)?;
        let probs = candle_nn::ops::softmax(&logits, 1)?;
        Ok(WindowOutput {
            preds: probs.argmax(1)?.to_vec1::<u32>()?,
            probs: probs.to_vec2::<f32>()?,
        })
    }
}

impl SequenceTagger for BertSequenceTagger {
    fn tag_spans(&self, sentence: &str) -> Result<Vec<TaggedSpan>> {
        let start = Instant::now();
        if sentence.trim().is_empty() {
            return Ok(Vec::new());
        }

        let encoding = self.tokenizer.encode(sentence, true)?;
        if encoding.get_ids().is_empty() {
            return Ok(Vec::new());
        }

        let windows = windows(&encoding);
        if windows.len() > 1 {
            debug!("Sentence split into {} windows of {} tokens", windows.len(), self.config.max_length);
        }

        let mut outputs = Vec::with_capacity(windows.len());
        for window in &windows {
            outputs.push(self.classify(window)?);
        }
        let tagged: Vec<(&Encoding, &WindowOutput)> = windows.into_iter().zip(outputs.iter()).collect();
        let predictions = token_predictions(&self.labels, &tagged);

        let spans = bio::decode(sentence, &predictions);
        debug!("Tagged {} spans in {:?}", spans.len(), start.elapsed());
        Ok(spans)
    }

    fn name(&self) -> String {
        self.config.model_id.clone()
    }
}

/// The encoding followed by its overflow windows. Sentences longer than
/// `max_length` continue there, with offsets still into the whole sentence.
fn windows(encoding: &Encoding) -> Vec<&Encoding> {
    std::iter::once(encoding)
        .chain(encoding.get_overflowing().iter())
        .filter(|window| !window.get_ids().is_empty())
        .collect()
}

/// Argmax class and class probabilities of every token in a window.
#[derive(Debug, Clone, Default)]
struct WindowOutput {
    preds: Vec<u32>,
    probs: Vec<Vec<f32>>,
}

/// Turn classified windows into token predictions for BIO decoding.
///
/// Special tokens are dropped. A token continues a word when it shares the
/// previous real token's word id, also across window boundaries.
fn token_predictions<'a>(
    labels: &'a [String],
    windows: &[(&Encoding, &WindowOutput)],
) -> Vec<TokenPrediction<'a>> {
    let mut predictions = Vec::new();
    let mut previous_word = None;

    for (encoding, output) in windows {
        let offsets = encoding.get_offsets();
        let special = encoding.get_special_tokens_mask();
        let word_ids = encoding.get_word_ids();

        for (i, &pred) in output.preds.iter().enumerate() {
            if special.get(i).copied().unwrap_or(0) == 1 {
                continue;
            }
            let Some(&(token_start, token_end)) = offsets.get(i) else {
                continue;
            };
            let class = pred as usize;
            let word = word_ids.get(i).copied().flatten();
            predictions.push(TokenPrediction {
                label: labels.get(class).map(String::as_str).unwrap_or("O"),
                start: token_start,
                end: token_end,
                score: output
                    .probs
                    .get(i)
                    .and_then(|row| row.get(class))
                    .copied()
                    .unwrap_or(0.0),
                continues_word: word.is_some() && word == previous_word,
            });
            previous_word = word;
        }
    }
    predictions
}

/// Class labels ordered by id, from the `id2label` map of `config.json`.
fn labels_from_config(json: &serde_json::Value) -> Result<Vec<String>> {
    let map = json
        .get("id2label")
        .and_then(|v| v.as_object())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| NerError::ModelLoad("config.json has no id2label".to_string()))?;

    let mut pairs: Vec<(usize, String)> = map
        .iter()
        .filter_map(|(k, v)| Some((k.parse().ok()?, v.as_str()?.to_string())))
        .collect();
    pairs.sort_by_key(|(id, _)| *id);

    let count = pairs.last().map(|(id, _)| id + 1).unwrap_or(0);
    let mut labels = vec!["O".to_string(); count];
    for (id, label) in pairs {
        labels[id] = label;
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_labels_ordered_by_id() {
        let config = json!({
            "id2label": {"2": "I-problem", "0": "B-problem", "1": "O", "10": "B-test"}
        });
        let labels = labels_from_config(&config).unwrap();
        assert_eq!(labels.len(), 11);
        assert_eq!(&labels[..3], &["B-problem", "O", "I-problem"]);
        assert_eq!(labels[10], "B-test");
        assert_eq!(labels[5], "O");
    }

    #[test]
    fn test_missing_labels_is_error() {
        assert!(matches!(labels_from_config(&json!({})), Err(NerError::ModelLoad(_))));
        assert!(labels_from_config(&json!({"id2label": {}})).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = TaggerConfig::default();
        assert_eq!(config.model_id, "samrawal/bert-base-uncased_clinical-ner");
        assert_eq!(config.max_length, 512);
    }

    fn labels() -> Vec<String> {
        ["O", "B-problem", "B-treatment"].iter().map(|l| l.to_string()).collect()
    }

    fn wordpiece(max_length: Option<usize>) -> Tokenizer {
        let dir = tempfile::tempdir().unwrap();
        let vocab = dir.path().join("vocab.txt");
        std::fs::write(&vocab, "[PAD]\n[UNK]\n[CLS]\n[SEP]\nhead\n##ache\nmigraine\ntook\naspirin\n").unwrap();
        let mut tokenizer = snomedix_embed::hub::wordpiece_from_vocab(&vocab).unwrap();
        if let Some(max_length) = max_length {
            tokenizer
                .with_truncation(Some(TruncationParams {
                    max_length,
                    ..Default::default()
                }))
                .unwrap();
        }
        tokenizer
    }

    /// Stand-in classifier: labels known word starts, everything else `O`.
    fn classify_by_token(encoding: &Encoding) -> WindowOutput {
        let preds: Vec<u32> = encoding
            .get_tokens()
            .iter()
            .map(|token| match token.as_str() {
                "head" | "migraine" => 1,
                "aspirin" => 2,
                _ => 0,
            })
            .collect();
        let probs = preds
            .iter()
            .map(|&pred| {
                let mut row = vec![0.1; 3];
                row[pred as usize] = 0.8;
                row
            })
            .collect();
        WindowOutput { preds, probs }
    }

    fn tag_with(tokenizer: &Tokenizer, sentence: &str) -> (usize, Vec<TaggedSpan>) {
        let labels = labels();
        let encoding = tokenizer.encode(sentence, true).unwrap();
        let windows = windows(&encoding);
        let outputs: Vec<WindowOutput> = windows.iter().map(|w| classify_by_token(w)).collect();
        let tagged: Vec<(&Encoding, &WindowOutput)> = windows.iter().copied().zip(outputs.iter()).collect();
        let predictions = token_predictions(&labels, &tagged);
        (windows.len(), bio::decode(sentence, &predictions))
    }

    fn summary(spans: &[TaggedSpan]) -> Vec<(&str, &str, usize, usize)> {
        spans
            .iter()
            .map(|s| (s.tag.as_str(), s.text.as_str(), s.start, s.end))
            .collect()
    }

    #[test]
    fn test_token_predictions_skip_special_tokens() {
        let labels = labels();
        let tokenizer = wordpiece(None);
        let encoding = tokenizer.encode("Headache, took aspirin", true).unwrap();
        let output = classify_by_token(&encoding);
        let predictions = token_predictions(&labels, &[(&encoding, &output)]);

        let view: Vec<(&str, usize, usize, bool)> = predictions
            .iter()
            .map(|p| (p.label, p.start, p.end, p.continues_word))
            .collect();
        assert_eq!(
            view,
            vec![
                ("B-problem", 0, 4, false),
                ("O", 4, 8, true),
                ("O", 8, 9, false),
                ("O", 10, 14, false),
                ("B-treatment", 15, 22, false),
            ]
        );
        assert!((predictions[0].score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_word_pieces_join_their_word() {
        let (windows, spans) = tag_with(&wordpiece(None), "Headache, took aspirin");
        assert_eq!(windows, 1);
        assert_eq!(
            summary(&spans),
            vec![("problem", "Headache", 0, 8), ("treatment", "aspirin", 15, 22)]
        );
    }

    #[test]
    fn test_long_sentence_tagged_across_windows() {
        // One word piece per window; "head" and "##ache" land in different windows.
        let sentence = "Headache migraine took aspirin";
        let (windows, spans) = tag_with(&wordpiece(Some(3)), sentence);
        assert!(windows > 1);
        assert_eq!(
            summary(&spans),
            vec![
                ("problem", "Headache", 0, 8),
                ("problem", "migraine", 9, 17),
                ("treatment", "aspirin", 23, 30),
            ]
        );
    }

    #[tokio::test]
    #[ignore] // Requires model download
    async fn test_clinical_tagger() {
        let tagger = BertSequenceTagger::new(TaggerConfig::default()).await.unwrap();
        let spans = tagger
            .tag_spans("Today I woke up with migraine and I took an aspirine.")
            .unwrap();
        assert!(spans.iter().any(|s| s.text.contains("migraine")));
        assert!(spans.iter().any(|s| s.text.contains("aspirine")));
    }
}
