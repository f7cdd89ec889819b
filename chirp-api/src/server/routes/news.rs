use crate::server::{Result, ServerError, ServerRouter, json::Json, news::NewsProxy};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_news)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/news", rejection(ServerError))]
struct NewsPath();

async fn get_news(
    NewsPath(): NewsPath,
    State(news): State<Arc<NewsProxy>>,
) -> Result<Response> {
    if !news.is_configured() {
        return Ok(Json(news.placeholder_headlines()).into_response());
    }

    match news.fetch_headlines().await {
        Ok(payload) => Ok(Json(payload).into_response()),
        Err(err) => {
            warn!(error = %err, "Fetching upstream news failed");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "articles": [] })),
            )
                .into_response())
        }
    }
}
