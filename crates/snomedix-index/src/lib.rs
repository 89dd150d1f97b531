//! Similarity index over encoded SNOMED CT surface forms.
//!
//! Every surface form is encoded once (or loaded from the on-disk cache) and
//! placed in an exact or HNSW index; a query vector maps back to the closest
//! `(surface, concept id)` pair.

pub mod cache;
pub mod error;
pub mod surface;
pub mod vector;

pub use cache::{cache_fingerprint, EmbeddingCache};
pub use error::{IndexError, Result};
pub use surface::{IndexOptions, SurfaceIndex};
pub use vector::{HnswParams, IndexKind, Neighbour, VectorIndex};
