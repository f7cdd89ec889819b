use crate::server::{
    MessageResponse, Result, ServerError, ServerRouter,
    auth::{AuthenticatedUser, MaybeUser},
    json::Json,
};
use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use axum_extra::routing::{RouterExt, TypedPath};
use chirp_common::model::{
    Id,
    notification::NotificationKind,
    tweet::{NewTweet, TweetMarker, TweetView},
};
use chirp_db::client::{DbClient, InsertOutcome};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_timeline)
        .typed_post(create_tweet)
        .typed_get(get_tweet)
        .typed_delete(delete_tweet)
        .typed_post(like_tweet)
        .typed_delete(unlike_tweet)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/tweets/timeline", rejection(ServerError))]
struct TimelinePath();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TimelineMode {
    #[default]
    All,
    Following,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct TimelineQuery {
    #[serde(default)]
    mode: TimelineMode,
}

async fn get_timeline(
    TimelinePath(): TimelinePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    query: Result<Query<TimelineQuery>, QueryRejection>,
) -> Result<Json<Vec<TweetView>>> {
    let Query(query) = query?;

    let include_all = match query.mode {
        TimelineMode::All => true,
        TimelineMode::Following => false,
    };
    let timeline = db.fetch_timeline(user.user_id(), include_all).await?;

    Ok(Json(timeline))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/tweets", rejection(ServerError))]
struct CreateTweetPath();

async fn create_tweet(
    CreateTweetPath(): CreateTweetPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(tweet): Json<NewTweet>,
) -> Result<(StatusCode, Json<TweetView>)> {
    let view = db.create_tweet(user.user_id(), &tweet.content).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/tweets/{id}", rejection(ServerError))]
struct TweetPath {
    id: Id<TweetMarker>,
}

async fn get_tweet(
    TweetPath { id }: TweetPath,
    State(db): State<Arc<DbClient>>,
    viewer: MaybeUser,
) -> Result<Json<TweetView>> {
    let view = db
        .fetch_tweet_view(id, viewer.user_id())
        .await?
        .ok_or(ServerError::TweetByIdNotFound(id))?;

    Ok(Json(view))
}

async fn delete_tweet(
    TweetPath { id }: TweetPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>> {
    let author = db
        .fetch_tweet_author(id)
        .await?
        .ok_or(ServerError::TweetByIdNotFound(id))?;

    if author != user.user_id() {
        return Err(ServerError::NotTweetAuthor);
    }

    db.delete_tweet(id).await?;

    Ok(Json(MessageResponse {
        message: "Tweet deleted",
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/tweets/{id}/like", rejection(ServerError))]
struct LikePath {
    id: Id<TweetMarker>,
}

async fn like_tweet(
    LikePath { id }: LikePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>> {
    let author = db
        .fetch_tweet_author(id)
        .await?
        .ok_or(ServerError::TweetByIdNotFound(id))?;

    if db.like_exists(user.user_id(), id).await? {
        return Err(ServerError::AlreadyLiked(id));
    }

    match db.create_like(user.user_id(), id).await? {
        InsertOutcome::Inserted(()) => {}
        InsertOutcome::Duplicate => return Err(ServerError::AlreadyLiked(id)),
    }

    // Liking your own tweet is fine, but telling you about it is not.
    if author != user.user_id() {
        db.create_notification(author, user.user_id(), NotificationKind::Like, Some(id))
            .await?;
    }

    Ok(Json(MessageResponse {
        message: "Tweet liked",
    }))
}

async fn unlike_tweet(
    LikePath { id }: LikePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>> {
    if !db.delete_like(user.user_id(), id).await? {
        return Err(ServerError::NotLiked(id));
    }

    Ok(Json(MessageResponse {
        message: "Tweet unliked",
    }))
}
