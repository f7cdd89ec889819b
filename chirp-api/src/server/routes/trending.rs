use crate::server::{Result, ServerError, ServerRouter, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use chirp_common::trending::{TRENDING_SCAN_LIMIT, TrendingTerm, trending_terms};
use chirp_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_trending)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/trending", rejection(ServerError))]
struct TrendingPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct TrendingResponse {
    trending: Vec<TrendingTerm>,
}

/// Best-effort view: a storage failure degrades to an empty list rather
/// than surfacing an error.
async fn get_trending(
    TrendingPath(): TrendingPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<TrendingResponse>> {
    let trending = match db.fetch_recent_tweet_bodies(TRENDING_SCAN_LIMIT).await {
        Ok(bodies) => trending_terms(bodies.iter().map(String::as_str)),
        Err(err) => {
            warn!(error = %err, "Trending scan failed, replying with empty list");
            Vec::new()
        }
    };

    Ok(Json(TrendingResponse { trending }))
}
