//! SNOMED CT ontology loading.
//!
//! Reads an RF2 snapshot (concepts, descriptions, IS-A relationships) into an
//! immutable concept graph and flattens every concept's surface forms into the
//! `(surface, concept id)` pairs the similarity index is built from.
//!
//! # Example
//! ```rust,no_run
//! use snomedix_ontology::Ontology;
//!
//! fn main() -> Result<(), snomedix_ontology::OntologyError> {
//!     let ontology = Ontology::load("static/snomed")?;
//!     println!("{} concepts, {} surface forms", ontology.len(), ontology.surface_entries().len());
//!     Ok(())
//! }
//! ```

pub mod concept;
pub mod error;
pub mod rf2;

pub use concept::{Concept, ConceptId, Ontology, SurfaceEntry};
pub use error::{OntologyError, Result};
