pub mod auth;
pub mod notification;
pub mod tweet;
pub mod user;

use crate::model::{
    auth::PasswordHashParseError,
    notification::InvalidNotificationKindError,
    tweet::InvalidTweetBodyError,
    user::{InvalidDisplayNameError, InvalidEmailError, InvalidPasswordError, InvalidUsernameError},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Username(#[from] InvalidUsernameError),
    #[error(transparent)]
    DisplayName(#[from] InvalidDisplayNameError),
    #[error(transparent)]
    Email(#[from] InvalidEmailError),
    #[error(transparent)]
    Password(#[from] InvalidPasswordError),
    #[error(transparent)]
    TweetBody(#[from] InvalidTweetBodyError),
    #[error(transparent)]
    NotificationKind(#[from] InvalidNotificationKindError),
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashParseError),
}

/// Storage-assigned identifier, tagged with the entity it identifies so a
/// tweet id cannot be passed where a user id is expected.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(i64, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<i64> for Id<Marker> {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for i64 {
    fn from(value: Id<Marker>) -> Self {
        value.get()
    }
}
