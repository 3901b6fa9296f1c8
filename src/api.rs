use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::Serialize;
use tera::Tera;
use tower_http::services::ServeDir;

use crate::engine::{Engine, metrics::MetricsRegistry};

/// Source shown in the editor when the page first loads.
pub const DEFAULT_SNIPPET: &str = r#"package main

import "fmt"

func main() {
	fmt.Println("Hello, World!")
}
"#;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<Engine>,
    metrics: Arc<MetricsRegistry>,
    templates: Arc<Tera>,
}

pub fn routes(engine: Arc<Engine>, metrics: Arc<MetricsRegistry>, templates: Tera) -> Router {
    let state = AppState {
        engine,
        metrics,
        templates: Arc::new(templates),
    };
    Router::new()
        .route("/", get(index))
        .route("/run", post(run_source))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_text))
        .nest_service(
            "/static",
            ServeDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static")),
        )
        .with_state(state)
}

pub fn load_templates() -> tera::Result<Tera> {
    Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*.html"))
}

#[derive(Serialize)]
struct IndexContext {
    default_code: &'static str,
}

async fn index(State(state): State<AppState>) -> Response {
    let rendered = tera::Context::from_serialize(IndexContext {
        default_code: DEFAULT_SNIPPET,
    })
    .and_then(|ctx| state.templates.render("index.html", &ctx));

    match rendered {
        Ok(body) => Html(body).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to render editor page");
            (StatusCode::INTERNAL_SERVER_ERROR, "template error").into_response()
        }
    }
}

/// Runs the raw request body as a program. The response body is either the
/// program's stdout or `Error: ` followed by the failure message; both use
/// status 200, which the editor page relies on. Only an empty submission is
/// rejected outright.
async fn run_source(State(state): State<AppState>, body: Bytes) -> Response {
    if body.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, "text/plain")],
            "No code provided",
        )
            .into_response();
    }

    tracing::info!(bytes = body.len(), "received source submission");
    let source = String::from_utf8_lossy(&body);
    let payload = match state.engine.execute(&source).await {
        Ok(stdout) => stdout,
        Err(err) => {
            tracing::warn!(error = %err, "execution failed");
            format!("Error: {err}").into_bytes()
        }
    };

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        payload,
    )
        .into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

async fn metrics_text(State(state): State<AppState>) -> (StatusCode, String) {
    (StatusCode::OK, state.metrics.render_prometheus())
}
