//! HTTP contract of the tagging and linking endpoints, served from a
//! dictionary tagger and a deterministic encoder.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use snomedix_embed::testing::HashingEncoder;
use snomedix_index::{IndexKind, IndexOptions, SurfaceIndex};
use snomedix_link::LinkingService;
use snomedix_ner::{LexiconTagger, NerError, SequenceTagger, TaggedSpan};
use snomedix_ontology::{Concept, Ontology};
use snomedix_web::router::build_router;
use snomedix_web::state::AppState;
use tower::ServiceExt;

fn service_with(tagger: Arc<dyn SequenceTagger>) -> LinkingService {
    let ontology = Arc::new(
        Ontology::from_concepts(vec![
            Concept::new("25064002", "Headache"),
            Concept::new("37796009", "Migraine"),
            Concept::new("387458008", "Aspirin").with_synonyms(["Acetylsalicylic acid"]),
        ])
        .unwrap(),
    );
    let encoder = Arc::new(HashingEncoder::default());
    let options = IndexOptions {
        kind: IndexKind::Flat,
        ..Default::default()
    };
    let index = SurfaceIndex::build(&ontology, encoder.as_ref(), &options).unwrap();
    LinkingService::from_parts(ontology, encoder, index, tagger, 32)
}

fn app() -> axum::Router {
    let tagger = LexiconTagger::new([
        ("migraine", "problem"),
        ("headache", "problem"),
        ("aspirine", "treatment"),
    ])
    .unwrap();
    build_router(AppState::new(service_with(Arc::new(tagger))))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }));
    (status, body)
}

#[tokio::test]
async fn test_tag_string() {
    let (status, body) = get(
        app(),
        "/tag_string?txt=%20Today%20I%20woke%20up%20with%20migraine%20and%20I%20took%20an%20aspirine.%20",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Today I woke up with migraine and I took an aspirine.");
    assert_eq!(
        body["entities"][0],
        json!(["T1", "problem", [[21, 29]], "Migraine", "concept_id: 37796009"])
    );
    let second = &body["entities"][1];
    assert_eq!(second[0], "T2");
    assert_eq!(second[1], "treatment");
    assert_eq!(second[2], json!([[44, 52]]));
    assert!(second[4].as_str().unwrap().starts_with("concept_id: "));
}

#[tokio::test]
async fn test_tag_string_without_text() {
    let expected = json!({ "text": "", "entities": [] });

    let (status, body) = get(app(), "/tag_string").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, expected);

    let (_, body) = get(app(), "/tag_string?txt=").await;
    assert_eq!(body, expected);
}

#[tokio::test]
async fn test_link_entity() {
    let (status, body) = get(app(), "/link_entity?txt=Headache").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "text": "Headache", "entities": ["Headache (25064002)"] }));

    // Input is echoed untrimmed
    let (_, body) = get(app(), "/link_entity?txt=+headache+").await;
    assert_eq!(body, json!({ "text": " headache ", "entities": ["Headache (25064002)"] }));
}

#[tokio::test]
async fn test_link_entity_blank() {
    let (status, body) = get(app(), "/link_entity").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "text": "", "entities": [] }));
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (_, _) = get(app.clone(), "/tag_string?txt=Migraine.").await;
    let (status, body) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["concepts"], 3);
    assert_eq!(body["surface_forms"], 4);
    assert_eq!(body["cache_entries"], 1);
    assert_eq!(body["encoder"], "hashing-trigram|dim=64");
}

#[tokio::test]
async fn test_index_links_demo() {
    let resp = app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8_lossy(&bytes);
    assert!(html.contains("./tag_string?txt=Today%20I%20woke%20up%20with%20migraine"));
}

struct BrokenTagger;

impl SequenceTagger for BrokenTagger {
    fn tag_spans(&self, _sentence: &str) -> snomedix_ner::Result<Vec<TaggedSpan>> {
        Err(NerError::Inference("out of memory".to_string()))
    }
}

#[tokio::test]
async fn test_pipeline_failure_is_server_error() {
    let app = build_router(AppState::new(service_with(Arc::new(BrokenTagger))));
    let (status, body) = get(app, "/tag_string?txt=Migraine").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("out of memory"));
}
