//! Configuration loading for snomedix.
//! Reads snomedix.toml from the current directory or the path in the
//! SNOMEDIX_CONFIG env var. Every field has a default.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use snomedix_embed::{EncoderConfig, PoolingStrategy};
use snomedix_index::{HnswParams, IndexKind};
use snomedix_link::{ServiceConfig, TaggerSource};
use snomedix_ner::TaggerConfig;
use tracing::{info, warn};


#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ontology: OntologyConfig,
    #[serde(default)]
    pub encoder: EncoderSection,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub tagger: TaggerSection,
    #[serde(default)]
    pub linker: LinkerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16    { 5000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OntologyConfig {
    /// RF2 snapshot directory
    #[serde(default = "default_ontology_path")]
    pub path: PathBuf,
}

fn default_ontology_path() -> PathBuf { PathBuf::from("static/snomed") }

impl Default for OntologyConfig {
    fn default() -> Self {
        Self { path: default_ontology_path() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSection {
    #[serde(default = "default_encoder_model")]
    pub model_id: String,
    pub local_dir: Option<PathBuf>,
    #[serde(default = "default_encoder_max_length")]
    pub max_length: usize,
    #[serde(default = "default_encoder_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub pooling: PoolingStrategy,
    #[serde(default)]
    pub normalize: bool,
    #[serde(default)]
    pub use_gpu: bool,
}

fn default_encoder_model()      -> String { EncoderConfig::default().model_id }
fn default_encoder_max_length() -> usize  { 8 }
fn default_encoder_batch_size() -> usize  { 128 }

impl Default for EncoderSection {
    fn default() -> Self {
        Self {
            model_id: default_encoder_model(),
            local_dir: None,
            max_length: default_encoder_max_length(),
            batch_size: default_encoder_batch_size(),
            pooling: PoolingStrategy::default(),
            normalize: false,
            use_gpu: false,
        }
    }
}

impl EncoderSection {
    pub fn to_encoder_config(&self) -> EncoderConfig {
        EncoderConfig {
            model_id: self.model_id.clone(),
            local_dir: self.local_dir.clone(),
            max_length: self.max_length,
            batch_size: self.batch_size,
            normalize: self.normalize,
            pooling: self.pooling,
            use_gpu: self.use_gpu,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Flat,
    Hnsw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_kind")]
    pub kind: IndexType,
    /// Where encoded ontology vectors are cached; set `cache = false` to
    /// always re-encode.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    #[serde(default = "default_true")]
    pub cache: bool,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,
}

fn default_index_kind()      -> IndexType { IndexType::Hnsw }
fn default_cache_path()      -> PathBuf   { PathBuf::from("static/snomed/snomed.emb") }
fn default_true()            -> bool      { true }
fn default_max_connections() -> usize     { 16 }
fn default_ef_construction() -> usize     { 200 }
fn default_ef_search()       -> usize     { 64 }

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            kind: default_index_kind(),
            cache_path: default_cache_path(),
            cache: true,
            max_connections: default_max_connections(),
            ef_construction: default_ef_construction(),
            ef_search: default_ef_search(),
        }
    }
}

impl IndexConfig {
    pub fn index_kind(&self) -> IndexKind {
        match self.kind {
            IndexType::Flat => IndexKind::Flat,
            IndexType::Hnsw => IndexKind::Hnsw(HnswParams {
                max_connections: self.max_connections,
                ef_construction: self.ef_construction,
                ef_search: self.ef_search,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaggerKind {
    Bert,
    Lexicon,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerSection {
    #[serde(default = "default_tagger_kind")]
    pub kind: TaggerKind,
    #[serde(default = "default_tagger_model")]
    pub model_id: String,
    #[serde(default = "default_tagger_dir")]
    pub local_dir: Option<PathBuf>,
    #[serde(default = "default_tagger_max_length")]
    pub max_length: usize,
    #[serde(default)]
    pub use_gpu: bool,
    /// `term<TAB>tag` file used when `kind = "lexicon"`
    #[serde(default = "default_lexicon_path")]
    pub lexicon_path: PathBuf,
}

fn default_tagger_kind()       -> TaggerKind      { TaggerKind::Bert }
fn default_tagger_model()      -> String          { TaggerConfig::default().model_id }
fn default_tagger_dir()        -> Option<PathBuf> { Some(PathBuf::from("static/models/ner")) }
fn default_tagger_max_length() -> usize           { 512 }
fn default_lexicon_path()      -> PathBuf         { PathBuf::from("static/lexicon.tsv") }

impl Default for TaggerSection {
    fn default() -> Self {
        Self {
            kind: default_tagger_kind(),
            model_id: default_tagger_model(),
            local_dir: default_tagger_dir(),
            max_length: default_tagger_max_length(),
            use_gpu: false,
            lexicon_path: default_lexicon_path(),
        }
    }
}

impl TaggerSection {
    pub fn to_tagger_config(&self) -> TaggerConfig {
        TaggerConfig {
            model_id: self.model_id.clone(),
            local_dir: self.local_dir.clone(),
            max_length: self.max_length,
            use_gpu: self.use_gpu,
        }
    }

    pub fn source(&self) -> TaggerSource {
        match self.kind {
            TaggerKind::Bert => TaggerSource::Bert(self.to_tagger_config()),
            TaggerKind::Lexicon => TaggerSource::Lexicon(self.lexicon_path.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkerConfig {
    /// Capacity of the mention -> concept LRU
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

fn default_cache_size() -> usize { 4096 }

impl Default for LinkerConfig {
    fn default() -> Self {
        Self { cache_size: default_cache_size() }
    }
}

impl Config {
    /// Load configuration from snomedix.toml.
    /// Checks SNOMEDIX_CONFIG env var first, then current directory. A
    /// missing file yields the defaults; a malformed one is an error.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("SNOMEDIX_CONFIG").unwrap_or_else(|_| "snomedix.toml".to_string());
        Self::from_path(path)
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Config file not found: {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Reading {}", path.display()))?;
        let config = Self::parse(&content).with_context(|| format!("Parsing {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            ontology_path: self.ontology.path.clone(),
            encoder: self.encoder.to_encoder_config(),
            index: self.index.index_kind(),
            cache_path: self.index.cache.then(|| self.index.cache_path.clone()),
            tagger: self.tagger.source(),
            cache_size: self.linker.cache_size,
        }
    }
}
