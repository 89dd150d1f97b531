//! Demo page and health check.

use axum::{extract::State, response::Html, Json};
use snomedix_link::ServiceStats;

use crate::state::SharedState;

pub const DEMO_TEXT: &str = "Today I woke up with migraine and I took an aspirine.";

/// GET /: demo link
pub async fn index() -> Html<String> {
    let href = format!("./tag_string?txt={}", DEMO_TEXT.replace(' ', "%20"));
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>snomedix</title>
</head>
<body>
    <p>Demo: <a href="{href}">click here</a> to tag <em>{text}</em></p>
    <p>Link a single mention: <a href="./link_entity?txt=headache">./link_entity?txt=headache</a></p>
</body>
</html>"#,
        href = href,
        text = DEMO_TEXT,
    ))
}

#[derive(Debug, serde::Serialize)]
pub struct Health {
    pub status: &'static str,
    #[serde(flatten)]
    pub stats: ServiceStats,
}

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        stats: state.service.stats(),
    })
}
