use crate::server::{
    MessageResponse, Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use chirp_common::model::{
    Id,
    tweet::{BookmarkedTweet, TweetMarker},
};
use chirp_db::client::{DbClient, InsertOutcome};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_bookmarks)
        .typed_post(create_bookmark)
        .typed_delete(delete_bookmark)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/bookmarks", rejection(ServerError))]
struct BookmarksPath();

async fn get_bookmarks(
    BookmarksPath(): BookmarksPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<BookmarkedTweet>>> {
    let bookmarks = db.fetch_bookmarked_tweets(user.user_id()).await?;

    Ok(Json(bookmarks))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/bookmarks/{tweet_id}", rejection(ServerError))]
struct BookmarkPath {
    tweet_id: Id<TweetMarker>,
}

async fn create_bookmark(
    BookmarkPath { tweet_id }: BookmarkPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>> {
    db.fetch_tweet_author(tweet_id)
        .await?
        .ok_or(ServerError::TweetByIdNotFound(tweet_id))?;

    if db.bookmark_exists(user.user_id(), tweet_id).await? {
        return Err(ServerError::AlreadyBookmarked(tweet_id));
    }

    match db.create_bookmark(user.user_id(), tweet_id).await? {
        InsertOutcome::Inserted(()) => {}
        InsertOutcome::Duplicate => return Err(ServerError::AlreadyBookmarked(tweet_id)),
    }

    Ok(Json(MessageResponse {
        message: "Tweet bookmarked",
    }))
}

async fn delete_bookmark(
    BookmarkPath { tweet_id }: BookmarkPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>> {
    if !db.delete_bookmark(user.user_id(), tweet_id).await? {
        return Err(ServerError::BookmarkNotFound(tweet_id));
    }

    Ok(Json(MessageResponse {
        message: "Bookmark removed",
    }))
}
