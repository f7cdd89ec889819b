use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use chirp_common::model::{Id, auth::SessionKeys, user::UserMarker};
use headers::{Authorization, authorization::Bearer};
use std::{convert::Infallible, sync::Arc};

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The caller on a required-auth route. Extraction fails closed: a missing
/// or unverifiable token rejects the request with 401.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<SessionKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?;

        let id = Arc::<SessionKeys>::from_ref(state)
            .verify(header.token())
            .map_err(|_| ServerError::InvalidToken)?;

        Ok(Self { id })
    }
}

/// The caller on an optional-auth route. Extraction fails open: any
/// missing or unverifiable token reads as anonymous, never as an error.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct MaybeUser {
    id: Option<Id<UserMarker>>,
}

impl MaybeUser {
    #[must_use]
    pub fn user_id(self) -> Option<Id<UserMarker>> {
        self.id
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    Arc<SessionKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let id = match AuthorizationHeader::from_request_parts(parts, state).await {
            Ok(header) => Arc::<SessionKeys>::from_ref(state).verify(header.token()).ok(),
            Err(_) => None,
        };

        Ok(Self { id })
    }
}
