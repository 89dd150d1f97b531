//! Snomedix string encoder
//!
//! Pure Rust SapBERT encoding using Candle (Hugging Face).
//! No Python dependency - direct model loading from Hugging Face Hub or a
//! local directory.
//!
//! # Features
//! - `Encoder` trait shared by the ontology index build and query normalisation
//! - Fixed token length (truncate + pad) so encoding is deterministic
//! - CLS pooling by default, GPU support (CUDA, Metal) with fallback to CPU
//!
//! # Example
//! ```rust,no_run
//! use snomedix_embed::{BertEncoder, Encoder, EncoderConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let encoder = BertEncoder::new(EncoderConfig::default()).await?;
//!     let vector = encoder.encode("migraine")?;
//!     println!("Embedding dimension: {}", vector.len()); // 768
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod device;
pub mod encoder;
pub mod error;
pub mod hub;
pub mod pooling;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::EncoderConfig;
pub use encoder::{BertEncoder, Encoder};
pub use error::{EmbedError, Result};
pub use hub::ModelFiles;
pub use pooling::PoolingStrategy;
