//! The surface-form index: ontology surface entries aligned with their vectors.

use std::time::Instant;

use snomedix_embed::Encoder;
use snomedix_ontology::{Ontology, SurfaceEntry};
use tracing::{debug, info};

use crate::cache::{cache_fingerprint, EmbeddingCache};
use crate::vector::{IndexKind, Neighbour, VectorIndex};
use crate::{IndexError, Result};

/// Options for [`SurfaceIndex::build`].
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub kind: IndexKind,
    /// Surface forms per encoder call (default: 128)
    pub batch_size: Option<usize>,
    /// Where encoded vectors persist across restarts.
    pub cache: Option<EmbeddingCache>,
}

const DEFAULT_BATCH_SIZE: usize = 128;

/// Nearest-neighbour lookup from a vector to an ontology surface entry.
#[derive(Debug)]
pub struct SurfaceIndex {
    entries: Vec<SurfaceEntry>,
    index: VectorIndex,
}

impl SurfaceIndex {
    /// Encode (or load from cache) every surface form of `ontology` and
    /// index the vectors.
    pub fn build(ontology: &Ontology, encoder: &dyn Encoder, options: &IndexOptions) -> Result<Self> {
        let entries = ontology.surface_entries().to_vec();
        let dimension = encoder.dimension();
        let fingerprint = cache_fingerprint(&ontology.fingerprint(), &encoder.identifier());
        debug!("Surface index fingerprint {}", fingerprint);

        let cached = options
            .cache
            .as_ref()
            .and_then(|cache| cache.load(&fingerprint, dimension, entries.len()));

        let vectors = match cached {
            Some(vectors) => vectors,
            None => {
                let batch_size = options.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
                let vectors = encode_surfaces(&entries, encoder, batch_size)?;
                if let Some(cache) = &options.cache {
                    cache.store(&fingerprint, &vectors)?;
                }
                vectors
            }
        };

        Self::from_vectors(entries, &vectors, options.kind, dimension)
    }

    /// Index precomputed vectors; `vectors[i]` belongs to `entries[i]`.
    pub fn from_vectors(
        entries: Vec<SurfaceEntry>,
        vectors: &[Vec<f32>],
        kind: IndexKind,
        dimension: usize,
    ) -> Result<Self> {
        if vectors.len() != entries.len() {
            return Err(IndexError::RowMismatch {
                vectors: vectors.len(),
                entries: entries.len(),
            });
        }
        let index = VectorIndex::build(kind, dimension, vectors)?;
        Ok(Self { entries, index })
    }

    /// Closest surface entry to `query` and its distance.
    pub fn nearest(&self, query: &[f32]) -> Result<Option<(&SurfaceEntry, f32)>> {
        Ok(self
            .search(query, 1)?
            .into_iter()
            .next()
            .and_then(|n| self.entries.get(n.position).map(|e| (e, n.distance))))
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbour>> {
        self.index.search(query, k)
    }

    pub fn entry(&self, position: usize) -> Option<&SurfaceEntry> {
        self.entries.get(position)
    }

    pub fn entries(&self) -> &[SurfaceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }
}

fn encode_surfaces(entries: &[SurfaceEntry], encoder: &dyn Encoder, batch_size: usize) -> Result<Vec<Vec<f32>>> {
    let start = Instant::now();
    let batch_size = batch_size.max(1);
    let total_batches = entries.len().div_ceil(batch_size);
    let report_every = (total_batches / 20).max(1);
    info!("Encoding {} ontology surface forms...", entries.len());

    let mut vectors = Vec::with_capacity(entries.len());
    for (i, batch) in entries.chunks(batch_size).enumerate() {
        let names: Vec<String> = batch.iter().map(|e| e.surface.clone()).collect();
        let encoded = encoder.encode_batch(&names)?;
        if encoded.len() != names.len() {
            return Err(IndexError::RowMismatch {
                vectors: encoded.len(),
                entries: names.len(),
            });
        }
        vectors.extend(encoded);
        if (i + 1) % report_every == 0 || i + 1 == total_batches {
            info!("Encoded {}/{} surface forms", vectors.len(), entries.len());
        }
    }

    info!(
        "Encoded {} surface forms in {:.1}s",
        vectors.len(),
        start.elapsed().as_secs_f32()
    );
    Ok(vectors)
}
