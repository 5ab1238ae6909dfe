//! HTTP handlers for the query surface
//!
//! One real endpoint: `GET /api?path=<absolute>&depth=<n>` returns the JSON
//! slice of the tree rooted at `path`, `depth + 1` levels deep, so the
//! default `depth=0` shows the named node plus one level of children. Every
//! other request path gets a 500 with a short body. The tree never changes
//! after startup, so responses carry a public one-hour cache header.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use treeserve::Tree;

/// Query parameters for `/api`.
///
/// `depth` is kept as a raw string: an unparseable value is defined to mean
/// zero, not a client error.
#[derive(Debug, Deserialize)]
pub struct ApiParams {
    /// Absolute path of the subtree root.
    pub path: Option<String>,
    /// Levels of children to include below the named node.
    pub depth: Option<String>,
}

/// Build the application router around a finalized tree.
pub fn router(tree: Arc<Tree>) -> Router {
    Router::new()
        .route("/api", get(api))
        .fallback(invalid_request)
        .with_state(tree)
}

/// `GET /api` - serialize a slice of the tree.
async fn api(State(tree): State<Arc<Tree>>, Query(params): Query<ApiParams>) -> impl IntoResponse {
    let depth = params
        .depth
        .as_deref()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(0);
    debug!(path = params.path.as_deref(), depth, "api query");

    let body = tree.to_json(params.path.as_deref(), Some(depth.saturating_add(1)));

    (
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Json(body),
    )
}

/// Anything that is not `/api`.
async fn invalid_request() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "invalid request string")
}
