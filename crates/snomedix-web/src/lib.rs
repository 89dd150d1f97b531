//! snomedix-web: HTTP API for clinical entity tagging and SNOMED CT linking
//! Routes:
//!   - `GET /tag_string?txt=`  entities of a document, linked to concepts
//!   - `GET /link_entity?txt=` closest concept for a single mention
//!   - `GET /health`           loaded resource counters
//!   - `GET /`                 demo page

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
