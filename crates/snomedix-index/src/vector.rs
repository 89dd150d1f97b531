//! Vector indexes: exact flat L2 scan and approximate HNSW.
//!
//! Both report Euclidean distance and identify vectors by their insertion
//! position, which is the position of the matching surface entry.

use hnsw_rs::prelude as hnsw;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{IndexError, Result};

/// HNSW construction and search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Graph degree (M)
    pub max_connections: usize,
    pub ef_construction: usize,
    /// Search breadth; higher trades latency for recall.
    pub ef_search: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            max_connections: 16,
            ef_construction: 200,
            ef_search: 64,
        }
    }
}

/// Which index structure to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IndexKind {
    /// Exhaustive scan; exact, ties go to the lowest position.
    Flat,
    Hnsw(HnswParams),
}

impl Default for IndexKind {
    fn default() -> Self {
        IndexKind::Hnsw(HnswParams::default())
    }
}

/// One search result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbour {
    pub position: usize,
    pub distance: f32,
}

pub enum VectorIndex {
    Flat(FlatIndex),
    Hnsw(HnswIndex),
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            VectorIndex::Flat(_) => "flat",
            VectorIndex::Hnsw(_) => "hnsw",
        };
        f.debug_struct("VectorIndex")
            .field("kind", &kind)
            .field("dimension", &self.dimension())
            .field("len", &self.len())
            .finish()
    }
}

impl VectorIndex {
    /// Build an index over `vectors`, all of which must have `dimension` entries.
    pub fn build(kind: IndexKind, dimension: usize, vectors: &[Vec<f32>]) -> Result<Self> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }
        let index = match kind {
            IndexKind::Flat => VectorIndex::Flat(FlatIndex::new(dimension, vectors)),
            IndexKind::Hnsw(params) => VectorIndex::Hnsw(HnswIndex::new(params, dimension, vectors)),
        };
        info!("Built {:?}", index);
        Ok(index)
    }

    /// The `k` nearest vectors, closest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbour>> {
        if query.len() != self.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension(),
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        Ok(match self {
            VectorIndex::Flat(index) => index.search(query, k),
            VectorIndex::Hnsw(index) => index.search(query, k),
        })
    }

    pub fn dimension(&self) -> usize {
        match self {
            VectorIndex::Flat(index) => index.dimension,
            VectorIndex::Hnsw(index) => index.dimension,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VectorIndex::Flat(index) => index.len(),
            VectorIndex::Hnsw(index) => index.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Contiguous row-major vectors scanned exhaustively.
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    fn new(dimension: usize, vectors: &[Vec<f32>]) -> Self {
        let mut data = Vec::with_capacity(dimension * vectors.len());
        for v in vectors {
            data.extend_from_slice(v);
        }
        Self { dimension, data }
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<Neighbour> {
        let mut scored: Vec<(f32, usize)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(i, row)| (squared_l2(query, row), i))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(k)
            .map(|(d, position)| Neighbour {
                position,
                distance: d.sqrt(),
            })
            .collect()
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Wrapper over `hnsw_rs` with L2 distance.
pub struct HnswIndex {
    inner: hnsw::Hnsw<'static, f32, hnsw::DistL2>,
    params: HnswParams,
    dimension: usize,
    len: usize,
}

impl HnswIndex {
    fn new(params: HnswParams, dimension: usize, vectors: &[Vec<f32>]) -> Self {
        let max_layer = 16;
        let inner = hnsw::Hnsw::<f32, hnsw::DistL2>::new(
            params.max_connections,
            vectors.len().max(1),
            max_layer,
            params.ef_construction,
            hnsw::DistL2 {},
        );
        let data: Vec<(&[f32], usize)> = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (v.as_slice(), i))
            .collect();
        inner.parallel_insert_slice(&data);
        debug!(
            "Inserted {} vectors into HNSW (M={}, ef_construction={})",
            vectors.len(),
            params.max_connections,
            params.ef_construction
        );
        Self {
            inner,
            params,
            dimension,
            len: vectors.len(),
        }
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<Neighbour> {
        let ef_search = self.params.ef_search.max(k);
        let mut hits: Vec<Neighbour> = self
            .inner
            .search(query, k, ef_search)
            .into_iter()
            .map(|n| Neighbour {
                position: n.d_id,
                distance: n.distance,
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Vec<Vec<f32>> {
        (0..50)
            .map(|i| vec![i as f32, (i % 7) as f32, (i / 10) as f32])
            .collect()
    }

    #[test]
    fn test_flat_returns_exact_nearest() {
        let index = VectorIndex::build(IndexKind::Flat, 3, &grid()).unwrap();
        let hits = index.search(&[12.1, 5.0, 1.0], 2).unwrap();
        assert_eq!(hits[0].position, 12);
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn test_flat_ties_go_to_lowest_position() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]];
        let index = VectorIndex::build(IndexKind::Flat, 2, &vectors).unwrap();
        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits[0].position, 0);
        assert_eq!(hits[1].position, 2);
    }

    #[test]
    fn test_hnsw_finds_stored_vector() {
        let params = HnswParams {
            ef_search: 100,
            ..Default::default()
        };
        let vectors = grid();
        let index = VectorIndex::build(IndexKind::Hnsw(params), 3, &vectors).unwrap();
        assert_eq!(index.len(), 50);

        let hits = index.search(&vectors[33], 1).unwrap();
        assert_eq!(hits[0].position, 33);
        assert!(hits[0].distance < 1e-4);
    }

    #[test]
    fn test_dimension_checked() {
        let index = VectorIndex::build(IndexKind::Flat, 3, &grid()).unwrap();
        assert!(matches!(
            index.search(&[1.0, 2.0], 1),
            Err(IndexError::DimensionMismatch { expected: 3, actual: 2 })
        ));
        assert!(VectorIndex::build(IndexKind::Flat, 2, &grid()).is_err());
    }

    #[test]
    fn test_index_kind_serde() {
        let kind: IndexKind = serde_json::from_str(r#"{"kind":"flat"}"#).unwrap();
        assert_eq!(kind, IndexKind::Flat);
    }
}
