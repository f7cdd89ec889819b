use crate::server::{
    MessageResponse, Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use chirp_common::model::{
    Id,
    notification::{Notification, NotificationMarker},
};
use chirp_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_notifications)
        .typed_get(get_unread_count)
        .typed_put(mark_read)
        .typed_put(mark_all_read)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/notifications", rejection(ServerError))]
struct NotificationsPath();

async fn get_notifications(
    NotificationsPath(): NotificationsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Notification>>> {
    let notifications = db.fetch_notifications(user.user_id()).await?;

    Ok(Json(notifications))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/notifications/unread-count", rejection(ServerError))]
struct UnreadCountPath();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct UnreadCountResponse {
    count: i64,
}

async fn get_unread_count(
    UnreadCountPath(): UnreadCountPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<UnreadCountResponse>> {
    let count = db.unread_notification_count(user.user_id()).await?;

    Ok(Json(UnreadCountResponse { count }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/notifications/{id}/read", rejection(ServerError))]
struct MarkReadPath {
    id: Id<NotificationMarker>,
}

async fn mark_read(
    MarkReadPath { id }: MarkReadPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>> {
    if !db.mark_notification_read(id, user.user_id()).await? {
        return Err(ServerError::NotificationByIdNotFound(id));
    }

    Ok(Json(MessageResponse {
        message: "Notification marked as read",
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/notifications/read-all", rejection(ServerError))]
struct MarkAllReadPath();

async fn mark_all_read(
    MarkAllReadPath(): MarkAllReadPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>> {
    db.mark_all_notifications_read(user.user_id()).await?;

    Ok(Json(MessageResponse {
        message: "All notifications marked as read",
    }))
}
