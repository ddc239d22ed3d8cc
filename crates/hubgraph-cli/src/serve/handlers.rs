//! HTTP route handlers for the query server.
//!
//! Handlers only read from the publication; they never block on the poll
//! loop.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use hubgraph_core::publish::format_timestamp;

use super::models::{ErrorResponse, StatusResponse};
use super::AppState;

const NOT_READY: &str = "No data has been published yet";

/// GET `/graphdata.json` - The latest graph document.
///
/// Response format:
/// ```json
/// {
///   "nodes": [{"id": "acme/widget", "group": 0, "title": ""}],
///   "links": [{"source": "acme/widget", "target": "123", "value": 1}]
/// }
/// ```
pub async fn graph_data(State(state): State<Arc<AppState>>) -> Response {
    match state.publications.current() {
        Some(publication) => json_body(publication.graph_json().to_owned()),
        None => not_ready(),
    }
}

/// GET `/dashboarddata.json` - The latest dashboard document.
pub async fn dashboard_data(State(state): State<Arc<AppState>>) -> Response {
    match state.publications.current() {
        Some(publication) => json_body(publication.dashboard_json().to_owned()),
        None => not_ready(),
    }
}

/// GET `/api/status` - Publication metadata.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let response = match state.publications.current() {
        Some(publication) => StatusResponse {
            published: true,
            version: Some(publication.version()),
            published_at: Some(format_timestamp(publication.published_at())),
            nodes: publication.graph().nodes.len(),
            links: publication.graph().links.len(),
        },
        None => StatusResponse {
            published: false,
            version: None,
            published_at: None,
            nodes: 0,
            links: 0,
        },
    };
    Json(response)
}

fn json_body(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn not_ready() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse::new(NOT_READY)),
    )
        .into_response()
}
