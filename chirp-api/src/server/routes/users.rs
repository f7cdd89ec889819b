use crate::server::{
    MessageResponse, Result, ServerError, ServerRouter,
    auth::{AuthenticatedUser, MaybeUser},
    json::Json,
};
use axum::extract::{Query, State, rejection::QueryRejection};
use axum_extra::routing::{RouterExt, TypedPath};
use chirp_common::model::{
    notification::NotificationKind,
    tweet::TweetView,
    user::{Profile, Username},
};
use chirp_db::client::{DbClient, InsertOutcome};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_me)
        .typed_get(search_users)
        .typed_get(get_user)
        .typed_get(get_user_tweets)
        .typed_post(follow_user)
        .typed_delete(unfollow_user)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/me", rejection(ServerError))]
struct MePath();

async fn get_me(
    MePath(): MePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<Profile>> {
    let profile = db
        .fetch_profile(user.user_id())
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    Ok(Json(profile))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/search", rejection(ServerError))]
struct SearchPath();

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn search_users(
    SearchPath(): SearchPath,
    State(db): State<Arc<DbClient>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Profile>>> {
    let Query(SearchQuery { q }) = query?;

    let needle = q.filter(|q| !q.trim().is_empty());
    let Some(needle) = needle else {
        return Err(ServerError::MissingSearchQuery);
    };

    let profiles = db.search_users(&needle).await?;
    Ok(Json(profiles))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{username}", rejection(ServerError))]
struct UserPath {
    username: Username,
}

async fn get_user(
    UserPath { username }: UserPath,
    State(db): State<Arc<DbClient>>,
    viewer: MaybeUser,
) -> Result<Json<Profile>> {
    let profile = db
        .fetch_profile_by_username(&username, viewer.user_id())
        .await?
        .ok_or(ServerError::UserByNameNotFound(username))?;

    Ok(Json(profile))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{username}/tweets", rejection(ServerError))]
struct UserTweetsPath {
    username: Username,
}

async fn get_user_tweets(
    UserTweetsPath { username }: UserTweetsPath,
    State(db): State<Arc<DbClient>>,
    viewer: MaybeUser,
) -> Result<Json<Vec<TweetView>>> {
    let user = db
        .fetch_user_by_username(&username)
        .await?
        .ok_or(ServerError::UserByNameNotFound(username))?;

    let tweets = db.fetch_tweets_by_author(user.id, viewer.user_id()).await?;
    Ok(Json(tweets))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{username}/follow", rejection(ServerError))]
struct FollowPath {
    username: Username,
}

async fn follow_user(
    FollowPath { username }: FollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>> {
    let target = db
        .fetch_user_by_username(&username)
        .await?
        .ok_or_else(|| ServerError::UserByNameNotFound(username.clone()))?;

    if target.id == user.user_id() {
        return Err(ServerError::SelfFollow);
    }

    if db.follow_exists(user.user_id(), target.id).await? {
        return Err(ServerError::AlreadyFollowing(username));
    }

    match db.create_follow(user.user_id(), target.id).await? {
        InsertOutcome::Inserted(()) => {}
        InsertOutcome::Duplicate => return Err(ServerError::AlreadyFollowing(username)),
    }

    db.create_notification(target.id, user.user_id(), NotificationKind::Follow, None)
        .await?;

    Ok(Json(MessageResponse {
        message: "User followed",
    }))
}

async fn unfollow_user(
    FollowPath { username }: FollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>> {
    let target = db
        .fetch_user_by_username(&username)
        .await?
        .ok_or_else(|| ServerError::UserByNameNotFound(username.clone()))?;

    if !db.delete_follow(user.user_id(), target.id).await? {
        return Err(ServerError::NotFollowing(username));
    }

    Ok(Json(MessageResponse {
        message: "User unfollowed",
    }))
}
