//! Deterministic encoder for tests that must not load model weights.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{Encoder, Result};

/// Hashes lower-cased character trigrams into a fixed number of buckets and
/// L2-normalises the counts. Strings equal up to case map to equal vectors.
#[derive(Debug)]
pub struct HashingEncoder {
    dimension: usize,
    calls: AtomicUsize,
    encoded: AtomicUsize,
}

impl HashingEncoder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            calls: AtomicUsize::new(0),
            encoded: AtomicUsize::new(0),
        }
    }

    /// Number of `encode_batch` invocations (including via `encode`).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of strings encoded so far.
    pub fn encoded(&self) -> usize {
        self.encoded.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let padded: Vec<char> = format!("  {}  ", text.to_lowercase()).chars().collect();
        let mut v = vec![0f32; self.dimension];
        for window in padded.windows(3) {
            // FNV-1a
            let mut hash: u64 = 0xcbf29ce484222325;
            for c in window {
                hash ^= *c as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            v[(hash % self.dimension as u64) as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-9);
        v.iter_mut().for_each(|x| *x /= norm);
        v
    }
}

impl Default for HashingEncoder {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Encoder for HashingEncoder {
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.encoded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn identifier(&self) -> String {
        format!("hashing-trigram|dim={}", self.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_and_counted() {
        let encoder = HashingEncoder::default();
        let a = encoder.encode("Migraine").unwrap();
        let b = encoder.encode("migraine").unwrap();
        let c = encoder.encode("aspirin").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert_eq!(encoder.calls(), 3);
    }
}
