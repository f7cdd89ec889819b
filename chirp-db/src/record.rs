//! Row shapes as they come back from Postgres, converted into model types
//! on the way out so invalid stored data surfaces as an error instead of
//! leaking through the boundary.

use chirp_common::model::{
    ModelValidationError,
    auth::CredentialHash,
    notification::Notification,
    tweet::{Tweet, TweetBody, TweetView},
    user::{DisplayName, Email, Profile, User, Username},
};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub struct CredentialRecord {
    #[sqlx(flatten)]
    pub user: UserRecord,
    pub password_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub struct ProfileRecord {
    #[sqlx(flatten)]
    pub user: UserRecord,
    pub follower_count: i64,
    pub following_count: i64,
    pub tweet_count: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub struct FollowedProfileRecord {
    #[sqlx(flatten)]
    pub profile: ProfileRecord,
    pub is_following: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub struct TweetViewRecord {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub author_username: String,
    pub author_email: String,
    pub author_display_name: String,
    pub author_bio: Option<String>,
    pub author_avatar: Option<String>,
    pub author_created_at: OffsetDateTime,
    pub like_count: i64,
    pub is_liked: bool,
    pub is_bookmarked: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub struct BookmarkRecord {
    #[sqlx(flatten)]
    pub view: TweetViewRecord,
    pub bookmarked_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub struct NotificationRecord {
    pub id: i64,
    pub kind: String,
    pub user_id: i64,
    pub actor_id: i64,
    pub tweet_id: Option<i64>,
    pub read: bool,
    pub created_at: OffsetDateTime,
    pub actor_username: String,
    pub actor_email: String,
    pub actor_display_name: String,
    pub actor_bio: Option<String>,
    pub actor_avatar: Option<String>,
    pub actor_created_at: OffsetDateTime,
    pub tweet_content: Option<String>,
    pub tweet_user_id: Option<i64>,
    pub tweet_created_at: Option<OffsetDateTime>,
    pub tweet_author_username: Option<String>,
    pub tweet_author_email: Option<String>,
    pub tweet_author_display_name: Option<String>,
    pub tweet_author_bio: Option<String>,
    pub tweet_author_avatar: Option<String>,
    pub tweet_author_created_at: Option<OffsetDateTime>,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            username: Username::new(value.username)?,
            email: Email::new(value.email)?,
            display_name: DisplayName::new(value.display_name)?,
            bio: value.bio,
            avatar: value.avatar,
            created_at: value.created_at,
        })
    }
}

impl TryFrom<CredentialRecord> for (User, CredentialHash) {
    type Error = ModelValidationError;

    fn try_from(value: CredentialRecord) -> Result<Self, Self::Error> {
        let user = User::try_from(value.user)?;
        let credential = CredentialHash::new(value.password_hash)?;
        Ok((user, credential))
    }
}

impl TryFrom<ProfileRecord> for Profile {
    type Error = ModelValidationError;

    fn try_from(value: ProfileRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user.try_into()?,
            follower_count: value.follower_count,
            following_count: value.following_count,
            tweet_count: value.tweet_count,
            is_following: None,
        })
    }
}

impl TryFrom<FollowedProfileRecord> for Profile {
    type Error = ModelValidationError;

    fn try_from(value: FollowedProfileRecord) -> Result<Self, Self::Error> {
        let is_following = value.is_following;
        let mut profile = Profile::try_from(value.profile)?;
        profile.is_following = Some(is_following);
        Ok(profile)
    }
}

impl TryFrom<TweetViewRecord> for TweetView {
    type Error = ModelValidationError;

    fn try_from(value: TweetViewRecord) -> Result<Self, Self::Error> {
        let author = User {
            id: value.user_id.into(),
            username: Username::new(value.author_username)?,
            email: Email::new(value.author_email)?,
            display_name: DisplayName::new(value.author_display_name)?,
            bio: value.author_bio,
            avatar: value.author_avatar,
            created_at: value.author_created_at,
        };

        Ok(Self {
            tweet: Tweet {
                id: value.id.into(),
                content: TweetBody::new(value.content)?,
                user_id: value.user_id.into(),
                created_at: value.created_at,
                user: author,
            },
            like_count: value.like_count,
            is_liked: value.is_liked,
            is_bookmarked: value.is_bookmarked,
        })
    }
}

impl TryFrom<NotificationRecord> for Notification {
    type Error = ModelValidationError;

    fn try_from(value: NotificationRecord) -> Result<Self, Self::Error> {
        let actor = User {
            id: value.actor_id.into(),
            username: Username::new(value.actor_username)?,
            email: Email::new(value.actor_email)?,
            display_name: DisplayName::new(value.actor_display_name)?,
            bio: value.actor_bio,
            avatar: value.actor_avatar,
            created_at: value.actor_created_at,
        };

        // Cascades guarantee a related tweet row exists whenever tweet_id is
        // still set; anything less than the full join is treated as absent.
        let tweet = match (
            value.tweet_id,
            value.tweet_content,
            value.tweet_user_id,
            value.tweet_created_at,
            value.tweet_author_username,
            value.tweet_author_email,
            value.tweet_author_display_name,
            value.tweet_author_created_at,
        ) {
            (
                Some(tweet_id),
                Some(content),
                Some(tweet_user_id),
                Some(tweet_created_at),
                Some(author_username),
                Some(author_email),
                Some(author_display_name),
                Some(author_created_at),
            ) => Some(Tweet {
                id: tweet_id.into(),
                content: TweetBody::new(content)?,
                user_id: tweet_user_id.into(),
                created_at: tweet_created_at,
                user: User {
                    id: tweet_user_id.into(),
                    username: Username::new(author_username)?,
                    email: Email::new(author_email)?,
                    display_name: DisplayName::new(author_display_name)?,
                    bio: value.tweet_author_bio,
                    avatar: value.tweet_author_avatar,
                    created_at: author_created_at,
                },
            }),
            _ => None,
        };

        Ok(Self {
            id: value.id.into(),
            kind: value.kind.parse()?,
            user_id: value.user_id.into(),
            actor_id: value.actor_id.into(),
            tweet_id: value.tweet_id.map(Into::into),
            read: value.read,
            created_at: value.created_at,
            actor,
            tweet,
        })
    }
}
