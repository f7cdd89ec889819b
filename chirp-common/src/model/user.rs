use crate::model::{Id, auth::CredentialHash};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;
use time::OffsetDateTime;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;
pub const DISPLAY_NAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// Public account fields. The credential hash lives in the storage layer
/// and never enters this type.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: Username,
    pub email: Email,
    pub display_name: DisplayName,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A profile as the boundary presents it: public fields plus live relation
/// counts, and the viewer-relative follow flag where a viewer is known.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    pub follower_count: i64,
    pub following_count: i64,
    pub tweet_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
}

/// Everything the store needs to create an account. Carries the already
/// validated fields and the hashed credential, never the plaintext secret.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub display_name: DisplayName,
    pub credential: CredentialHash,
    pub avatar: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The username is invalid: {0}")]
pub struct InvalidUsernameError(String);

impl Username {
    pub fn new(username: String) -> Result<Self, InvalidUsernameError> {
        let len = username.chars().count();
        if (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
            Ok(Username(username))
        } else {
            Err(InvalidUsernameError(username))
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

    /// Base handle for an auto-provisioned account: the local part of the
    /// address, lowercased and stripped to `[a-z0-9_]`.
    #[must_use]
    pub fn derived_from_email(email: &Email) -> Self {
        let sanitized: String = email
            .local_part()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .take(USERNAME_MAX_LEN)
            .collect();

        if sanitized.chars().count() < USERNAME_MIN_LEN {
            Username("user".to_owned())
        } else {
            Username(sanitized)
        }
    }

    /// The handle with a numeric disambiguation suffix, truncated so the
    /// result still fits the length bound.
    #[must_use]
    pub fn numbered(&self, n: u32) -> Self {
        let suffix = n.to_string();
        let keep = USERNAME_MAX_LEN.saturating_sub(suffix.len());
        let mut handle: String = self.0.chars().take(keep).collect();
        handle.push_str(&suffix);
        Username(handle)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Username::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Username"))
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The display name is invalid: {0}")]
pub struct InvalidDisplayNameError(String);

impl DisplayName {
    pub fn new(name: String) -> Result<Self, InvalidDisplayNameError> {
        let len = name.chars().count();
        if (1..=DISPLAY_NAME_MAX_LEN).contains(&len) {
            Ok(DisplayName(name))
        } else {
            Err(InvalidDisplayNameError(name))
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

impl<'de> Deserialize<'de> for DisplayName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        DisplayName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"DisplayName"))
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The email address is invalid: {0}")]
pub struct InvalidEmailError(String);

impl Email {
    pub fn new(email: String) -> Result<Self, InvalidEmailError> {
        let Some((local, domain)) = email.split_once('@') else {
            return Err(InvalidEmailError(email));
        };

        let local_ok = !local.is_empty() && !local.contains(char::is_whitespace);
        let domain_ok = domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains(char::is_whitespace);

        if local_ok && domain_ok {
            Ok(Email(email))
        } else {
            Err(InvalidEmailError(email))
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

    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or(&*self.0, |(local, _)| local)
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Email::new(inner).map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Email"))
    }
}

/// A plaintext secret in transit. Only ever consumed by hashing or
/// verification, and redacted from Debug output.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Password(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The password does not meet the length requirement")]
pub struct InvalidPasswordError;

impl Password {
    pub fn new(password: String) -> Result<Self, InvalidPasswordError> {
        if password.chars().count() >= PASSWORD_MIN_LEN {
            Ok(Password(password))
        } else {
            Err(InvalidPasswordError)
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Password::new(inner)
            .map_err(|_| Error::invalid_value(Unexpected::Str("[redacted]"), &"Password"))
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::user::{DisplayName, Email, Password, Username};

    #[test]
    fn username_bounds() {
        assert!(Username::new("ab".into()).is_err());
        assert!(Username::new("abc".into()).is_ok());
        assert!(Username::new("a".repeat(20)).is_ok());
        assert!(Username::new("a".repeat(21)).is_err());
    }

    #[test]
    fn display_name_bounds() {
        assert!(DisplayName::new(String::new()).is_err());
        assert!(DisplayName::new("A".into()).is_ok());
        assert!(DisplayName::new("あ".repeat(50)).is_ok());
        assert!(DisplayName::new("a".repeat(51)).is_err());
    }

    #[test]
    fn email_shape() {
        assert!(Email::new("alice@example.com".into()).is_ok());
        assert!(Email::new("alice".into()).is_err());
        assert!(Email::new("@example.com".into()).is_err());
        assert!(Email::new("alice@example".into()).is_err());
        assert!(Email::new("alice@.com".into()).is_err());
        assert!(Email::new("a lice@example.com".into()).is_err());
    }

    #[test]
    fn password_redacted_debug() {
        let password = Password::new("hunter22".into()).unwrap();
        assert!(!format!("{password:?}").contains("hunter22"));
    }

    #[test]
    fn password_min_len() {
        assert!(Password::new("12345".into()).is_err());
        assert!(Password::new("123456".into()).is_ok());
    }

    #[test]
    fn derived_handle_sanitizes_local_part() {
        let email = Email::new("Jane.Doe+spam@example.com".into()).unwrap();
        assert_eq!(Username::derived_from_email(&email).get(), "janedoespam");
    }

    #[test]
    fn derived_handle_falls_back_when_too_short() {
        let email = Email::new("ab@example.com".into()).unwrap();
        assert_eq!(Username::derived_from_email(&email).get(), "user");
    }

    #[test]
    fn derived_handle_respects_max_len() {
        let email = Email::new("a_very_long_local_part_indeed@example.com".into()).unwrap();
        let handle = Username::derived_from_email(&email);
        assert_eq!(handle.get().chars().count(), 20);
    }

    #[test]
    fn numbered_handle_stays_within_bounds() {
        let base = Username::new("a".repeat(20)).unwrap();
        let numbered = base.numbered(42);
        assert_eq!(numbered.get().chars().count(), 20);
        assert!(numbered.get().ends_with("42"));

        let short = Username::new("bob".into()).unwrap();
        assert_eq!(short.numbered(1).get(), "bob1");
    }
}
