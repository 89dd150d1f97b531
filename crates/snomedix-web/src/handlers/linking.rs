//! Tagging and linking endpoints.
//!
//! Inference is CPU bound, so each request runs the pipeline on the
//! blocking thread pool.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use snomedix_link::TaggedText;
use tracing::debug;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct TextQuery {
    /// Missing behaves as the empty string
    #[serde(default)]
    pub txt: String,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub text: String,
    /// `"<concept name> (<concept id>)"`
    pub entities: Vec<String>,
}

/// GET /tag_string: entities of a document
pub async fn tag_string(
    State(state): State<SharedState>,
    Query(query): Query<TextQuery>,
) -> Result<Json<TaggedText>, ApiError> {
    debug!("tag_string: {} chars", query.txt.chars().count());
    let service = state.service.clone();
    let tagged = tokio::task::spawn_blocking(move || service.tag(&query.txt)).await??;
    Ok(Json(tagged))
}

/// GET /link_entity: closest concept for one mention
pub async fn link_entity(
    State(state): State<SharedState>,
    Query(query): Query<TextQuery>,
) -> Result<Json<LinkResponse>, ApiError> {
    let service = state.service.clone();
    let mention = query.txt.clone();
    let link = tokio::task::spawn_blocking(move || service.link(&mention)).await??;

    Ok(Json(LinkResponse {
        text: query.txt,
        entities: link
            .into_iter()
            .map(|l| format!("{} ({})", l.name, l.concept_id))
            .collect(),
    }))
}
