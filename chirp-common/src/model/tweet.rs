use crate::model::{
    Id,
    user::{User, UserMarker},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::OffsetDateTime;

pub const TWEET_BODY_MAX_LEN: usize = 280;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct TweetMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: Id<TweetMarker>,
    pub content: TweetBody,
    pub user_id: Id<UserMarker>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user: User,
}

/// A tweet as the boundary presents it: the stored row joined with its
/// author and annotated with the viewer-relative engagement state.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetView {
    #[serde(flatten)]
    pub tweet: Tweet,
    pub like_count: i64,
    pub is_liked: bool,
    pub is_bookmarked: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkedTweet {
    #[serde(flatten)]
    pub view: TweetView,
    #[serde(with = "time::serde::rfc3339")]
    pub bookmarked_at: OffsetDateTime,
}

/// Request payload for creating a tweet.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct NewTweet {
    pub content: TweetBody,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct TweetBody(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The tweet body length is out of range")]
pub struct InvalidTweetBodyError(String);

impl TweetBody {
    /// Length is counted in Unicode scalar values, not bytes.
    pub fn new(body: String) -> Result<Self, InvalidTweetBodyError> {
        let len = body.chars().count();
        if (1..=TWEET_BODY_MAX_LEN).contains(&len) {
            Ok(TweetBody(body))
        } else {
            Err(InvalidTweetBodyError(body))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for TweetBody {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        TweetBody::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"TweetBody"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::tweet::TweetBody;

    #[test]
    fn body_bounds() {
        assert!(TweetBody::new(String::new()).is_err());
        assert!(TweetBody::new("x".into()).is_ok());
        assert!(TweetBody::new("x".repeat(280)).is_ok());
        assert!(TweetBody::new("x".repeat(281)).is_err());
    }

    #[test]
    fn body_length_counts_scalars_not_bytes() {
        // 280 three-byte scalars are fine even though the byte count is not.
        assert!(TweetBody::new("あ".repeat(280)).is_ok());
        assert!(TweetBody::new("あ".repeat(281)).is_err());
    }
}
