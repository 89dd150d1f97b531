//! On-disk cache of the encoded ontology surface forms.
//!
//! The file is a gzip-compressed bincode record carrying a fingerprint of the
//! ontology content and the encoder configuration. A cache whose fingerprint,
//! dimension or row count disagrees with the current run is ignored and
//! rebuilt.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::{IndexError, Result};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    fingerprint: String,
    dimension: usize,
    rows: usize,
    data: Vec<f32>,
}

/// Cache key for ontology vectors: ontology content plus encoder identity.
pub fn cache_fingerprint(ontology_fingerprint: &str, encoder_identifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ontology_fingerprint.as_bytes());
    hasher.update(b"\0");
    hasher.update(encoder_identifier.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Vector cache at a fixed path.
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    path: PathBuf,
}

impl EmbeddingCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached vectors, if the file exists and matches `fingerprint`,
    /// `dimension` and `rows`.
    pub fn load(&self, fingerprint: &str, dimension: usize, rows: usize) -> Option<Vec<Vec<f32>>> {
        if !self.path.is_file() {
            debug!("No embedding cache at {:?}", self.path);
            return None;
        }
        let file = match self.read() {
            Ok(file) => file,
            Err(e) => {
                warn!("Ignoring unreadable embedding cache {:?}: {}", self.path, e);
                return None;
            }
        };
        if file.version != FORMAT_VERSION
            || file.fingerprint != fingerprint
            || file.dimension != dimension
            || file.rows != rows
            || file.data.len() != dimension * rows
        {
            warn!(
                "Embedding cache {:?} is stale ({} rows x {} dim), rebuilding",
                self.path, file.rows, file.dimension
            );
            return None;
        }
        info!("Loaded {} cached vectors from {:?}", rows, self.path);
        Some(file.data.chunks_exact(dimension.max(1)).map(<[f32]>::to_vec).collect())
    }

    fn read(&self) -> Result<CacheFile> {
        let reader = GzDecoder::new(BufReader::new(File::open(&self.path)?));
        Ok(bincode::deserialize_from(reader)?)
    }

    /// Write `vectors` under `fingerprint`, replacing any existing file.
    pub fn store(&self, fingerprint: &str, vectors: &[Vec<f32>]) -> Result<()> {
        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }
        let file = CacheFile {
            version: FORMAT_VERSION,
            fingerprint: fingerprint.to_string(),
            dimension,
            rows: vectors.len(),
            data: vectors.concat(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        {
            let mut encoder = GzEncoder::new(BufWriter::new(File::create(&tmp)?), Compression::default());
            bincode::serialize_into(&mut encoder, &file)?;
            encoder.finish()?;
        }
        fs::rename(&tmp, &self.path)?;
        info!("Stored {} vectors in {:?}", vectors.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectors() -> Vec<Vec<f32>> {
        vec![vec![0.5, 1.0, -2.0], vec![3.0, 0.0, 0.25]]
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::new(dir.path().join("nested/snomed.emb"));

        cache.store("abc", &vectors()).unwrap();
        assert_eq!(cache.load("abc", 3, 2), Some(vectors()));
        assert!(!dir.path().join("nested/snomed.tmp").exists());
    }

    #[test]
    fn test_stale_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::new(dir.path().join("snomed.emb"));
        cache.store("abc", &vectors()).unwrap();

        assert_eq!(cache.load("other", 3, 2), None);
        assert_eq!(cache.load("abc", 4, 2), None);
        assert_eq!(cache.load("abc", 3, 5), None);
    }

    #[test]
    fn test_corrupt_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snomed.emb");
        fs::write(&path, b"not a cache").unwrap();
        assert_eq!(EmbeddingCache::new(&path).load("abc", 3, 2), None);
    }

    #[test]
    fn test_fingerprint_depends_on_both_parts() {
        let a = cache_fingerprint("onto", "sapbert|8");
        assert_eq!(a, cache_fingerprint("onto", "sapbert|8"));
        assert_ne!(a, cache_fingerprint("onto", "sapbert|16"));
        assert_ne!(a, cache_fingerprint("onto2", "sapbert|8"));
    }
}
