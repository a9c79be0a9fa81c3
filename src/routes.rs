use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::error;

use crate::aggregator::Aggregator;
use crate::config::Config;
use crate::normalize::Item;

pub struct AppState {
    pub aggregator: Aggregator,
    pub config: Config,
}

#[derive(Deserialize)]
pub struct FeedQuery {
    pub limit: Option<String>,
}

#[derive(Serialize)]
pub struct FeedResponse {
    pub items: Vec<FeedItem>,
}

#[derive(Serialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub author: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: String,
    pub summary: String,
    pub source: String,
}

impl From<Item> for FeedItem {
    fn from(item: Item) -> Self {
        Self {
            title: item.title,
            link: item.link,
            author: item.author,
            published_at: item
                .published_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            summary: item.summary,
            source: item.source,
        }
    }
}

// Custom error type. The response body stays generic; the cause only goes
// to the server log.
pub struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Feed aggregation failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "failed to fetch feeds" })),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

/// Clamp a request's raw `limit` parameter into a usable item cap.
/// Absent or unparseable values fall back to the configured default.
pub fn parse_limit(raw: Option<&str>, default_limit: i64, max_limit: i64) -> usize {
    let requested = raw
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(default_limit);
    requested.min(max_limit).max(0) as usize
}

// Route handlers
pub async fn feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = parse_limit(
        query.limit.as_deref(),
        state.config.default_limit,
        state.config.max_limit,
    );

    let urls: Vec<String> = state.config.feeds.iter().map(|f| f.url.clone()).collect();
    let items = state.aggregator.aggregate(&urls, limit).await?;

    Ok(Json(FeedResponse {
        items: items.into_iter().map(FeedItem::from).collect(),
    }))
}

pub async fn health() -> impl IntoResponse {
    "OK"
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/feed", get(feed))
        .route("/health", get(health))
        .fallback_service(ServeDir::new("public"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
