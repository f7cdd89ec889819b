use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use chirp_common::model::{
    Id, ModelValidationError,
    auth::{CredentialHashError, PasswordHashParseError, SessionKeys, SessionTokenIssueError},
    notification::NotificationMarker,
    tweet::TweetMarker,
    user::{UserMarker, Username},
};
use chirp_db::client::{DbClient, DbError};
use google::{GoogleVerifier, GoogleVerifyError};
use json::Json;
use news::NewsProxy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

pub mod auth;
pub mod google;
pub mod json;
pub mod news;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub session_keys: Arc<SessionKeys>,
    pub google: Arc<GoogleVerifier>,
    pub news: Arc<NewsProxy>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    InvalidAssertion(#[from] GoogleVerifyError),
    #[error("Validation failed: {0}")]
    Validation(#[from] ModelValidationError),
    #[error("Issuing a session token failed: {0}")]
    SessionTokenIssue(#[from] SessionTokenIssueError),
    #[error("Hashing the credential failed: {0}")]
    CredentialHash(#[from] CredentialHashError),
    #[error(transparent)]
    StoredCredential(#[from] PasswordHashParseError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("A user with that username or email already exists")]
    UserAlreadyExists,
    #[error("Tweet with id {0} was not found")]
    TweetByIdNotFound(Id<TweetMarker>),
    #[error("User with id {0} was not found")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("User {0} was not found")]
    UserByNameNotFound(Username),
    #[error("Notification with id {0} was not found")]
    NotificationByIdNotFound(Id<NotificationMarker>),
    #[error("Tweet {0} is not bookmarked")]
    BookmarkNotFound(Id<TweetMarker>),
    #[error("Tweet {0} is already liked")]
    AlreadyLiked(Id<TweetMarker>),
    #[error("Tweet {0} is not liked")]
    NotLiked(Id<TweetMarker>),
    #[error("Tweet {0} is already bookmarked")]
    AlreadyBookmarked(Id<TweetMarker>),
    #[error("Already following {0}")]
    AlreadyFollowing(Username),
    #[error("Not following {0}")]
    NotFollowing(Username),
    #[error("Cannot follow yourself")]
    SelfFollow,
    #[error("Only the author may delete a tweet")]
    NotTweetAuthor,
    #[error("Search query is required")]
    MissingSearchQuery,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::TweetByIdNotFound(_)
            | ServerError::UserByIdNotFound(_)
            | ServerError::UserByNameNotFound(_)
            | ServerError::NotificationByIdNotFound(_)
            | ServerError::BookmarkNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidToken | ServerError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidAssertion(err) => match err {
                GoogleVerifyError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNAUTHORIZED,
            },
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::Validation(_)
            | ServerError::UserAlreadyExists
            | ServerError::AlreadyLiked(_)
            | ServerError::NotLiked(_)
            | ServerError::AlreadyBookmarked(_)
            | ServerError::AlreadyFollowing(_)
            | ServerError::NotFollowing(_)
            | ServerError::SelfFollow
            | ServerError::MissingSearchQuery => StatusCode::BAD_REQUEST,
            ServerError::NotTweetAuthor => StatusCode::FORBIDDEN,
            ServerError::JsonResponse(_)
            | ServerError::SessionTokenIssue(_)
            | ServerError::CredentialHash(_)
            | ServerError::StoredCredential(_)
            | ServerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        // Server-side failures reply with a generic message; the logged
        // error carries the detail.
        let message = if status.is_server_error() {
            "Internal server error".to_owned()
        } else {
            self.to_string()
        };

        let error_response = ErrorResponse {
            status: status.as_u16(),
            error: message,
        };
        (status, Json(error_response)).into_response()
    }
}

/// Body for mutations that have nothing else to report.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use crate::server::ServerError;
    use axum::http::StatusCode;
    use chirp_common::model::Id;

    #[test]
    fn conflict_class_maps_to_bad_request() {
        for err in [
            ServerError::UserAlreadyExists,
            ServerError::AlreadyLiked(Id::new(1)),
            ServerError::NotLiked(Id::new(1)),
            ServerError::AlreadyBookmarked(Id::new(1)),
            ServerError::SelfFollow,
            ServerError::MissingSearchQuery,
        ] {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn absence_maps_to_not_found() {
        for err in [
            ServerError::TweetByIdNotFound(Id::new(1)),
            ServerError::NotificationByIdNotFound(Id::new(1)),
            ServerError::BookmarkNotFound(Id::new(1)),
        ] {
            assert_eq!(err.status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn identity_failures_map_to_unauthorized() {
        assert_eq!(
            ServerError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ServerError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn ownership_violation_maps_to_forbidden() {
        assert_eq!(ServerError::NotTweetAuthor.status(), StatusCode::FORBIDDEN);
    }
}
