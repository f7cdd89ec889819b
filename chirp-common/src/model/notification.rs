use crate::model::{
    Id,
    tweet::{Tweet, TweetMarker},
    user::{User, UserMarker},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct NotificationMarker;

/// The two events that fan out into notification rows.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Follow,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown notification kind: {0}")]
pub struct InvalidNotificationKindError(String);

impl NotificationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Follow => "follow",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = InvalidNotificationKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(NotificationKind::Like),
            "follow" => Ok(NotificationKind::Follow),
            other => Err(InvalidNotificationKindError(other.to_owned())),
        }
    }
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fan-out record as the boundary presents it: the stored row joined
/// with the actor's public profile and, for likes, the related tweet.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Id<NotificationMarker>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub user_id: Id<UserMarker>,
    pub actor_id: Id<UserMarker>,
    pub tweet_id: Option<Id<TweetMarker>>,
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub actor: User,
    pub tweet: Option<Tweet>,
}

#[cfg(test)]
mod tests {
    use crate::model::notification::NotificationKind;
    use std::str::FromStr;

    #[test]
    fn kind_roundtrip() {
        for kind in [NotificationKind::Like, NotificationKind::Follow] {
            assert_eq!(NotificationKind::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(NotificationKind::from_str("mention").is_err());
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&NotificationKind::Like).unwrap(),
            "\"like\""
        );
    }
}
