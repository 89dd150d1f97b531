//! The linking service: every loaded component behind one explicitly
//! constructed object.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use snomedix_embed::{BertEncoder, Encoder, EncoderConfig};
use snomedix_index::{EmbeddingCache, IndexKind, IndexOptions, SurfaceIndex};
use snomedix_ner::{BertSequenceTagger, LexiconTagger, SequenceTagger, TaggerConfig};
use snomedix_ontology::Ontology;
use tracing::info;

use crate::mention::TaggedText;
use crate::normalizer::{canonicalize, Link, Normalizer, DEFAULT_CACHE_SIZE};
use crate::tagger::Tagger;
use crate::Result;

/// Which sequence tagger to load.
#[derive(Debug, Clone)]
pub enum TaggerSource {
    Bert(TaggerConfig),
    /// `term<TAB>tag` dictionary file
    Lexicon(PathBuf),
}

impl Default for TaggerSource {
    fn default() -> Self {
        TaggerSource::Bert(TaggerConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// RF2 snapshot directory
    pub ontology_path: PathBuf,
    pub encoder: EncoderConfig,
    pub index: IndexKind,
    /// Encoded ontology vectors; `None` disables the cache.
    pub cache_path: Option<PathBuf>,
    pub tagger: TaggerSource,
    pub cache_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ontology_path: PathBuf::from("static/snomed"),
            encoder: EncoderConfig::default(),
            index: IndexKind::default(),
            cache_path: Some(PathBuf::from("static/snomed/snomed.emb")),
            tagger: TaggerSource::default(),
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

/// Counters reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub concepts: usize,
    pub surface_forms: usize,
    pub cache_entries: usize,
    pub cache_capacity: usize,
    pub encoder: String,
    pub tagger: String,
}

pub struct LinkingService {
    ontology: Arc<Ontology>,
    normalizer: Arc<Normalizer>,
    tagger: Tagger,
}

impl LinkingService {
    /// Load the ontology, models and index. Blocking work runs on the
    /// blocking thread pool.
    pub async fn load(config: ServiceConfig) -> Result<Self> {
        let start = Instant::now();
        info!("Loading SNOMED CT from {:?}", config.ontology_path);
        let ontology_path = config.ontology_path.clone();
        let ontology = tokio::task::spawn_blocking(move || Ontology::load(ontology_path)).await??;
        let ontology = Arc::new(ontology);
        info!(
            "Loaded {} concepts, {} surface forms",
            ontology.len(),
            ontology.surface_entries().len()
        );

        let sequence_tagger: Arc<dyn SequenceTagger> = match config.tagger {
            TaggerSource::Bert(tagger_config) => Arc::new(BertSequenceTagger::new(tagger_config).await?),
            TaggerSource::Lexicon(path) => {
                Arc::new(tokio::task::spawn_blocking(move || LexiconTagger::from_file(path)).await??)
            }
        };

        let batch_size = config.encoder.batch_size;
        let encoder: Arc<dyn Encoder> = Arc::new(BertEncoder::new(config.encoder).await?);

        let options = IndexOptions {
            kind: config.index,
            batch_size: Some(batch_size),
            cache: config.cache_path.map(EmbeddingCache::new),
        };
        let index = {
            let ontology = ontology.clone();
            let encoder = encoder.clone();
            tokio::task::spawn_blocking(move || SurfaceIndex::build(&ontology, encoder.as_ref(), &options)).await??
        };

        info!("Linking service ready in {:?}", start.elapsed());
        Ok(Self::from_parts(ontology, encoder, index, sequence_tagger, config.cache_size))
    }

    /// Assemble a service from already constructed components.
    pub fn from_parts(
        ontology: Arc<Ontology>,
        encoder: Arc<dyn Encoder>,
        index: SurfaceIndex,
        sequence_tagger: Arc<dyn SequenceTagger>,
        cache_size: usize,
    ) -> Self {
        let normalizer = Arc::new(Normalizer::new(encoder, Arc::new(index), cache_size));
        let tagger = Tagger::new(sequence_tagger, normalizer.clone());
        Self {
            ontology,
            normalizer,
            tagger,
        }
    }

    pub fn tag(&self, text: &str) -> Result<TaggedText> {
        self.tagger.tag(text)
    }

    /// Link a single mention; `None` when it is blank.
    pub fn link(&self, mention: &str) -> Result<Option<Link>> {
        if canonicalize(mention).is_empty() {
            return Ok(None);
        }
        self.normalizer.normalize(mention).map(Some)
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            concepts: self.ontology.len(),
            surface_forms: self.normalizer.index().len(),
            cache_entries: self.normalizer.cache_len(),
            cache_capacity: self.normalizer.cache_capacity(),
            encoder: self.normalizer.encoder().identifier(),
            tagger: self.tagger.sequence_tagger().name(),
        }
    }

    pub fn ontology(&self) -> &Ontology {
        &self.ontology
    }
}
