use crate::record::{
    BookmarkRecord, CredentialRecord, FollowedProfileRecord, NotificationRecord, ProfileRecord,
    TweetViewRecord, UserRecord,
};
use chirp_common::model::{
    Id, ModelValidationError,
    auth::CredentialHash,
    notification::{Notification, NotificationKind, NotificationMarker},
    tweet::{BookmarkedTweet, TweetBody, TweetMarker, TweetView},
    user::{Email, NewUser, Profile, User, UserMarker, Username},
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Outcome of an insert whose uniqueness is enforced by a storage-layer
/// constraint. The constraint, not any pre-check, is the source of truth
/// for duplicates (two racing inserts both pass the pre-check; exactly one
/// of them sees `Duplicate` here).
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum InsertOutcome<T> {
    Inserted(T),
    Duplicate,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and brings the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().connect(database_url).await?;
        sqlx::migrate!().run(&pool).await?;

        Ok(Self { pool })
    }

    // -- users ----------------------------------------------------------

    pub async fn create_user(&self, user: &NewUser) -> Result<InsertOutcome<User>> {
        let result = sqlx::query_as::<_, UserRecord>(
            "
            INSERT INTO users (username, email, password_hash, display_name, avatar)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, display_name, bio, avatar, created_at
            ",
        )
        .bind(user.username.get())
        .bind(user.email.get())
        .bind(user.credential.get())
        .bind(user.display_name.get())
        .bind(user.avatar.as_deref())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(record) => Ok(InsertOutcome::Inserted(record.try_into()?)),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Duplicate),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "
            SELECT id, username, email, display_name, bio, avatar, created_at
            FROM users
            WHERE username = $1
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::try_from).transpose()?)
    }

    pub async fn fetch_user_by_email(&self, email: &Email) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "
            SELECT id, username, email, display_name, bio, avatar, created_at
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::try_from).transpose()?)
    }

    /// The account and stored credential hash for a login attempt.
    pub async fn fetch_credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, CredentialHash)>> {
        let record = sqlx::query_as::<_, CredentialRecord>(
            "
            SELECT id, username, email, display_name, bio, avatar, created_at, password_hash
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(TryInto::try_into).transpose()?)
    }

    pub async fn username_taken(&self, username: &Username) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
        )
        .bind(username.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    pub async fn email_taken(&self, email: &Email) -> Result<bool> {
        let taken =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email.get())
                .fetch_one(&self.pool)
                .await?;

        Ok(taken)
    }

    /// Profile with live relation counts; no viewer-relative annotation.
    pub async fn fetch_profile(&self, user_id: Id<UserMarker>) -> Result<Option<Profile>> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "
            SELECT
                u.id, u.username, u.email, u.display_name, u.bio, u.avatar, u.created_at,
                (SELECT COUNT(*) FROM follows f WHERE f.following_id = u.id) AS follower_count,
                (SELECT COUNT(*) FROM follows f WHERE f.follower_id = u.id) AS following_count,
                (SELECT COUNT(*) FROM tweets t WHERE t.user_id = u.id) AS tweet_count
            FROM users u
            WHERE u.id = $1
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Profile::try_from).transpose()?)
    }

    /// Profile with live counts plus whether `viewer` follows the subject
    /// (false for an anonymous viewer).
    pub async fn fetch_profile_by_username(
        &self,
        username: &Username,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Option<Profile>> {
        let record = sqlx::query_as::<_, FollowedProfileRecord>(
            "
            SELECT
                u.id, u.username, u.email, u.display_name, u.bio, u.avatar, u.created_at,
                (SELECT COUNT(*) FROM follows f WHERE f.following_id = u.id) AS follower_count,
                (SELECT COUNT(*) FROM follows f WHERE f.follower_id = u.id) AS following_count,
                (SELECT COUNT(*) FROM tweets t WHERE t.user_id = u.id) AS tweet_count,
                EXISTS(
                    SELECT 1 FROM follows f
                    WHERE f.follower_id = $2 AND f.following_id = u.id
                ) AS is_following
            FROM users u
            WHERE u.username = $1
            ",
        )
        .bind(username.get())
        .bind(viewer.map(Id::get))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Profile::try_from).transpose()?)
    }

    /// Case-insensitive substring search over handles and display names.
    pub async fn search_users(&self, query: &str) -> Result<Vec<Profile>> {
        let pattern = format!("%{}%", escape_like(query));

        let records = sqlx::query_as::<_, ProfileRecord>(
            r"
            SELECT
                u.id, u.username, u.email, u.display_name, u.bio, u.avatar, u.created_at,
                (SELECT COUNT(*) FROM follows f WHERE f.following_id = u.id) AS follower_count,
                (SELECT COUNT(*) FROM follows f WHERE f.follower_id = u.id) AS following_count,
                (SELECT COUNT(*) FROM tweets t WHERE t.user_id = u.id) AS tweet_count
            FROM users u
            WHERE u.username ILIKE $1 ESCAPE '\' OR u.display_name ILIKE $1 ESCAPE '\'
            ORDER BY u.id
            LIMIT 20
            ",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Profile::try_from(record).map_err(DbError::from))
            .collect()
    }

    // -- tweets ---------------------------------------------------------

    pub async fn create_tweet(
        &self,
        author: Id<UserMarker>,
        body: &TweetBody,
    ) -> Result<TweetView> {
        let record = sqlx::query_as::<_, TweetViewRecord>(
            "
            WITH inserted AS (
                INSERT INTO tweets (content, user_id)
                VALUES ($1, $2)
                RETURNING id, content, user_id, created_at
            )
            SELECT
                i.id, i.content, i.user_id, i.created_at,
                u.username AS author_username,
                u.email AS author_email,
                u.display_name AS author_display_name,
                u.bio AS author_bio,
                u.avatar AS author_avatar,
                u.created_at AS author_created_at,
                0::BIGINT AS like_count,
                FALSE AS is_liked,
                FALSE AS is_bookmarked
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            ",
        )
        .bind(body.get())
        .bind(author.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    pub async fn fetch_tweet_view(
        &self,
        tweet_id: Id<TweetMarker>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Option<TweetView>> {
        let record = sqlx::query_as::<_, TweetViewRecord>(
            "
            SELECT
                t.id, t.content, t.user_id, t.created_at,
                u.username AS author_username,
                u.email AS author_email,
                u.display_name AS author_display_name,
                u.bio AS author_bio,
                u.avatar AS author_avatar,
                u.created_at AS author_created_at,
                (SELECT COUNT(*) FROM likes l WHERE l.tweet_id = t.id) AS like_count,
                EXISTS(
                    SELECT 1 FROM likes l WHERE l.tweet_id = t.id AND l.user_id = $2
                ) AS is_liked,
                EXISTS(
                    SELECT 1 FROM bookmarks b WHERE b.tweet_id = t.id AND b.user_id = $2
                ) AS is_bookmarked
            FROM tweets t
            JOIN users u ON u.id = t.user_id
            WHERE t.id = $1
            ",
        )
        .bind(tweet_id.get())
        .bind(viewer.map(Id::get))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(TweetView::try_from).transpose()?)
    }

    /// The newest 50 tweets the viewer's timeline shows: everyone's when
    /// `include_all`, otherwise the viewer's own and their followees'.
    pub async fn fetch_timeline(
        &self,
        viewer: Id<UserMarker>,
        include_all: bool,
    ) -> Result<Vec<TweetView>> {
        let records = sqlx::query_as::<_, TweetViewRecord>(
            "
            SELECT
                t.id, t.content, t.user_id, t.created_at,
                u.username AS author_username,
                u.email AS author_email,
                u.display_name AS author_display_name,
                u.bio AS author_bio,
                u.avatar AS author_avatar,
                u.created_at AS author_created_at,
                (SELECT COUNT(*) FROM likes l WHERE l.tweet_id = t.id) AS like_count,
                EXISTS(
                    SELECT 1 FROM likes l WHERE l.tweet_id = t.id AND l.user_id = $1
                ) AS is_liked,
                EXISTS(
                    SELECT 1 FROM bookmarks b WHERE b.tweet_id = t.id AND b.user_id = $1
                ) AS is_bookmarked
            FROM tweets t
            JOIN users u ON u.id = t.user_id
            WHERE $2
                OR t.user_id = $1
                OR t.user_id IN (
                    SELECT f.following_id FROM follows f WHERE f.follower_id = $1
                )
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT 50
            ",
        )
        .bind(viewer.get())
        .bind(include_all)
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| TweetView::try_from(record).map_err(DbError::from))
            .collect()
    }

    pub async fn fetch_tweets_by_author(
        &self,
        author: Id<UserMarker>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Vec<TweetView>> {
        let records = sqlx::query_as::<_, TweetViewRecord>(
            "
            SELECT
                t.id, t.content, t.user_id, t.created_at,
                u.username AS author_username,
                u.email AS author_email,
                u.display_name AS author_display_name,
                u.bio AS author_bio,
                u.avatar AS author_avatar,
                u.created_at AS author_created_at,
                (SELECT COUNT(*) FROM likes l WHERE l.tweet_id = t.id) AS like_count,
                EXISTS(
                    SELECT 1 FROM likes l WHERE l.tweet_id = t.id AND l.user_id = $2
                ) AS is_liked,
                EXISTS(
                    SELECT 1 FROM bookmarks b WHERE b.tweet_id = t.id AND b.user_id = $2
                ) AS is_bookmarked
            FROM tweets t
            JOIN users u ON u.id = t.user_id
            WHERE t.user_id = $1
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT 50
            ",
        )
        .bind(author.get())
        .bind(viewer.map(Id::get))
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| TweetView::try_from(record).map_err(DbError::from))
            .collect()
    }

    pub async fn fetch_tweet_author(
        &self,
        tweet_id: Id<TweetMarker>,
    ) -> Result<Option<Id<UserMarker>>> {
        let author = sqlx::query_scalar::<_, i64>("SELECT user_id FROM tweets WHERE id = $1")
            .bind(tweet_id.get())
            .fetch_optional(&self.pool)
            .await?;

        Ok(author.map(Id::new))
    }

    /// Cascades take the tweet's likes, bookmarks and notifications with it.
    pub async fn delete_tweet(&self, tweet_id: Id<TweetMarker>) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tweets WHERE id = $1")
            .bind(tweet_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bodies of the newest tweets, for the trending scan.
    pub async fn fetch_recent_tweet_bodies(&self, limit: i64) -> Result<Vec<String>> {
        let bodies = sqlx::query_scalar::<_, String>(
            "
            SELECT content
            FROM tweets
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(bodies)
    }

    // -- likes ----------------------------------------------------------

    pub async fn like_exists(
        &self,
        user_id: Id<UserMarker>,
        tweet_id: Id<TweetMarker>,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE user_id = $1 AND tweet_id = $2)",
        )
        .bind(user_id.get())
        .bind(tweet_id.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn create_like(
        &self,
        user_id: Id<UserMarker>,
        tweet_id: Id<TweetMarker>,
    ) -> Result<InsertOutcome<()>> {
        let result = sqlx::query("INSERT INTO likes (user_id, tweet_id) VALUES ($1, $2)")
            .bind(user_id.get())
            .bind(tweet_id.get())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted(())),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Duplicate),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_like(
        &self,
        user_id: Id<UserMarker>,
        tweet_id: Id<TweetMarker>,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND tweet_id = $2")
            .bind(user_id.get())
            .bind(tweet_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // -- bookmarks ------------------------------------------------------

    pub async fn bookmark_exists(
        &self,
        user_id: Id<UserMarker>,
        tweet_id: Id<TweetMarker>,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM bookmarks WHERE user_id = $1 AND tweet_id = $2)",
        )
        .bind(user_id.get())
        .bind(tweet_id.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn create_bookmark(
        &self,
        user_id: Id<UserMarker>,
        tweet_id: Id<TweetMarker>,
    ) -> Result<InsertOutcome<()>> {
        let result = sqlx::query("INSERT INTO bookmarks (user_id, tweet_id) VALUES ($1, $2)")
            .bind(user_id.get())
            .bind(tweet_id.get())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted(())),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Duplicate),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_bookmark(
        &self,
        user_id: Id<UserMarker>,
        tweet_id: Id<TweetMarker>,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND tweet_id = $2")
            .bind(user_id.get())
            .bind(tweet_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The viewer's bookmarks, newest bookmark first, each composed as a
    /// full tweet view.
    pub async fn fetch_bookmarked_tweets(
        &self,
        user_id: Id<UserMarker>,
    ) -> Result<Vec<BookmarkedTweet>> {
        let records = sqlx::query_as::<_, BookmarkRecord>(
            "
            SELECT
                t.id, t.content, t.user_id, t.created_at,
                u.username AS author_username,
                u.email AS author_email,
                u.display_name AS author_display_name,
                u.bio AS author_bio,
                u.avatar AS author_avatar,
                u.created_at AS author_created_at,
                (SELECT COUNT(*) FROM likes l WHERE l.tweet_id = t.id) AS like_count,
                EXISTS(
                    SELECT 1 FROM likes l WHERE l.tweet_id = t.id AND l.user_id = $1
                ) AS is_liked,
                TRUE AS is_bookmarked,
                b.created_at AS bookmarked_at
            FROM bookmarks b
            JOIN tweets t ON t.id = b.tweet_id
            JOIN users u ON u.id = t.user_id
            WHERE b.user_id = $1
            ORDER BY b.created_at DESC, b.id DESC
            ",
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| {
                let bookmarked_at = record.bookmarked_at;
                let view = TweetView::try_from(record.view)?;
                Ok(BookmarkedTweet {
                    view,
                    bookmarked_at,
                })
            })
            .collect()
    }

    // -- follows --------------------------------------------------------

    pub async fn follow_exists(
        &self,
        follower: Id<UserMarker>,
        following: Id<UserMarker>,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)",
        )
        .bind(follower.get())
        .bind(following.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn create_follow(
        &self,
        follower: Id<UserMarker>,
        following: Id<UserMarker>,
    ) -> Result<InsertOutcome<()>> {
        let result = sqlx::query("INSERT INTO follows (follower_id, following_id) VALUES ($1, $2)")
            .bind(follower.get())
            .bind(following.get())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted(())),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Duplicate),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_follow(
        &self,
        follower: Id<UserMarker>,
        following: Id<UserMarker>,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
            .bind(follower.get())
            .bind(following.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // -- notifications --------------------------------------------------

    pub async fn create_notification(
        &self,
        recipient: Id<UserMarker>,
        actor: Id<UserMarker>,
        kind: NotificationKind,
        tweet_id: Option<Id<TweetMarker>>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO notifications (kind, user_id, actor_id, tweet_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(kind.as_str())
        .bind(recipient.get())
        .bind(actor.get())
        .bind(tweet_id.map(Id::get))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_notifications(
        &self,
        recipient: Id<UserMarker>,
    ) -> Result<Vec<Notification>> {
        let records = sqlx::query_as::<_, NotificationRecord>(
            "
            SELECT
                n.id, n.kind, n.user_id, n.actor_id, n.tweet_id, n.read, n.created_at,
                a.username AS actor_username,
                a.email AS actor_email,
                a.display_name AS actor_display_name,
                a.bio AS actor_bio,
                a.avatar AS actor_avatar,
                a.created_at AS actor_created_at,
                t.content AS tweet_content,
                t.user_id AS tweet_user_id,
                t.created_at AS tweet_created_at,
                tu.username AS tweet_author_username,
                tu.email AS tweet_author_email,
                tu.display_name AS tweet_author_display_name,
                tu.bio AS tweet_author_bio,
                tu.avatar AS tweet_author_avatar,
                tu.created_at AS tweet_author_created_at
            FROM notifications n
            JOIN users a ON a.id = n.actor_id
            LEFT JOIN tweets t ON t.id = n.tweet_id
            LEFT JOIN users tu ON tu.id = t.user_id
            WHERE n.user_id = $1
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT 50
            ",
        )
        .bind(recipient.get())
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Notification::try_from(record).map_err(DbError::from))
            .collect()
    }

    pub async fn unread_notification_count(&self, recipient: Id<UserMarker>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE",
        )
        .bind(recipient.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Ownership is part of the lookup key: a notification belonging to
    /// someone else reads as absent.
    pub async fn mark_notification_read(
        &self,
        notification_id: Id<NotificationMarker>,
        recipient: Id<UserMarker>,
    ) -> Result<bool> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(notification_id.get())
                .bind(recipient.get())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_notifications_read(&self, recipient: Id<UserMarker>) -> Result<()> {
        sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE")
            .bind(recipient.get())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::client::escape_like;

    #[test]
    fn like_needles_are_escaped() {
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like(r"back\slash"), r"back\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }
}
