//! Clinical entity tagging and SNOMED CT linking.
//!
//! [`LinkingService`] owns the loaded ontology, encoder, similarity index and
//! sequence tagger. [`Normalizer`] maps a mention to its closest ontology
//! surface form (memoised in a bounded LRU); [`Tagger`] runs sentence
//! splitting, span detection and linking over a whole document.
//!
//! # Example
//! ```rust,no_run
//! use snomedix_link::{LinkingService, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = LinkingService::load(ServiceConfig::default()).await?;
//!     let tagged = service.tag("Today I woke up with migraine and I took an aspirine.")?;
//!     for entity in &tagged.entities {
//!         println!("{} {} -> {}", entity.tag, entity.surface, entity.concept_id);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod mention;
pub mod normalizer;
pub mod service;
pub mod tagger;

pub use error::{LinkError, Result};
pub use mention::{EntityMention, TaggedText};
pub use normalizer::{canonicalize, Link, Normalizer};
pub use service::{LinkingService, ServiceConfig, ServiceStats, TaggerSource};
pub use tagger::Tagger;
