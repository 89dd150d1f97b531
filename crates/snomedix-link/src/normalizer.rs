//! Mention normalisation: canonicalise, look up the memo cache, otherwise
//! encode and take the nearest ontology surface form.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;
use serde::Serialize;
use snomedix_embed::Encoder;
use snomedix_index::SurfaceIndex;
use snomedix_ontology::ConceptId;
use tracing::debug;

use crate::{LinkError, Result};

pub const DEFAULT_CACHE_SIZE: usize = 4096;

/// The ontology entry a mention resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    /// Matched surface form
    pub name: String,
    pub concept_id: ConceptId,
}

/// Cache key for a mention: surrounding whitespace removed, lower-cased.
pub fn canonicalize(mention: &str) -> String {
    mention.trim().to_lowercase()
}

pub struct Normalizer {
    encoder: Arc<dyn Encoder>,
    index: Arc<SurfaceIndex>,
    cache: Mutex<LruCache<String, Link>>,
}

impl Normalizer {
    pub fn new(encoder: Arc<dyn Encoder>, index: Arc<SurfaceIndex>, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            encoder,
            index,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Resolve `mention` to its closest ontology entry.
    ///
    /// Results are memoised by canonical form. Concurrent misses for the same
    /// key may both encode; the value is deterministic so the second insert
    /// simply overwrites the first.
    pub fn normalize(&self, mention: &str) -> Result<Link> {
        let key = canonicalize(mention);
        if key.is_empty() {
            return Err(LinkError::EmptyMention);
        }

        if let Some(link) = self.lock_cache().get(&key) {
            return Ok(link.clone());
        }

        if self.index.is_empty() {
            return Err(LinkError::EmptyIndex);
        }
        let query = self.encoder.encode(&key)?;
        let (entry, distance) = self.index.nearest(&query)?.ok_or(LinkError::EmptyIndex)?;
        debug!("Linked '{}' -> {} '{}' (d={:.4})", key, entry.concept_id, entry.surface, distance);

        let link = Link {
            name: entry.surface.clone(),
            concept_id: entry.concept_id.clone(),
        };
        self.lock_cache().put(key, link.clone());
        Ok(link)
    }

    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    pub fn cache_capacity(&self) -> usize {
        self.lock_cache().cap().get()
    }

    pub fn encoder(&self) -> &dyn Encoder {
        self.encoder.as_ref()
    }

    pub fn index(&self) -> &SurfaceIndex {
        &self.index
    }

    // Entries are plain values; a poisoned lock is still usable.
    fn lock_cache(&self) -> MutexGuard<'_, LruCache<String, Link>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snomedix_embed::testing::HashingEncoder;
    use snomedix_index::{IndexKind, IndexOptions};
    use snomedix_ontology::{Concept, Ontology};

    fn normalizer(encoder: Arc<HashingEncoder>, cache_size: usize) -> Normalizer {
        let ontology = Ontology::from_concepts(vec![
            Concept::new("25064002", "Headache").with_synonyms(["Cephalgia"]),
            Concept::new("37796009", "Migraine"),
            Concept::new("387458008", "Aspirin"),
        ])
        .unwrap();
        let options = IndexOptions {
            kind: IndexKind::Flat,
            ..Default::default()
        };
        let index = SurfaceIndex::build(&ontology, encoder.as_ref(), &options).unwrap();
        Normalizer::new(encoder, Arc::new(index), cache_size)
    }

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize("  Headache \n"), "headache");
        assert_eq!(canonicalize("MIGRAINE"), "migraine");
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let normalizer = normalizer(Arc::new(HashingEncoder::default()), 16);
        let a = normalizer.normalize("Headache").unwrap();
        let b = normalizer.normalize("  headache ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.concept_id, "25064002");
        assert_eq!(normalizer.cache_len(), 1);
    }

    #[test]
    fn test_repeated_mention_encodes_once() {
        let encoder = Arc::new(HashingEncoder::default());
        let normalizer = normalizer(encoder.clone(), 16);
        let before = encoder.encoded();

        for _ in 0..5 {
            normalizer.normalize("Migraine").unwrap();
        }
        assert_eq!(encoder.encoded() - before, 1);
    }

    #[test]
    fn test_cache_is_bounded() {
        let encoder = Arc::new(HashingEncoder::default());
        let normalizer = normalizer(encoder.clone(), 2);
        assert_eq!(normalizer.cache_capacity(), 2);

        normalizer.normalize("headache").unwrap();
        normalizer.normalize("migraine").unwrap();
        normalizer.normalize("aspirin").unwrap();
        assert_eq!(normalizer.cache_len(), 2);

        // "headache" was evicted and is encoded again
        let before = encoder.encoded();
        normalizer.normalize("headache").unwrap();
        assert_eq!(encoder.encoded() - before, 1);
    }

    #[test]
    fn test_empty_mention() {
        let normalizer = normalizer(Arc::new(HashingEncoder::default()), 4);
        assert!(matches!(normalizer.normalize("   "), Err(LinkError::EmptyMention)));
    }

    #[test]
    fn test_empty_index() {
        let encoder = Arc::new(HashingEncoder::default());
        let index = SurfaceIndex::from_vectors(Vec::new(), &[], IndexKind::Flat, encoder.dimension()).unwrap();
        let normalizer = Normalizer::new(encoder, Arc::new(index), 4);
        assert!(matches!(normalizer.normalize("headache"), Err(LinkError::EmptyIndex)));
    }
}
