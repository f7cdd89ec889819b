use crate::server::ServerRouter;
use axum::Router;

mod auth;
mod bookmarks;
mod news;
mod notifications;
mod trending;
mod tweets;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(auth::routes())
        .merge(tweets::routes())
        .merge(users::routes())
        .merge(bookmarks::routes())
        .merge(notifications::routes())
        .merge(trending::routes())
        .merge(news::routes())
}
