use crate::model::{Id, user::Password, user::UserMarker};
use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

pub const SESSION_TOKEN_TTL: Duration = Duration::days(7);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing credential failed: {0}")]
pub struct CredentialHashError(argon2::password_hash::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Stored credential hash is not a valid PHC string: {0}")]
pub struct PasswordHashParseError(argon2::password_hash::Error);

impl std::hash::Hash for PasswordHashParseError {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_string().hash(state);
    }
}

/// One-way credential hash in PHC string form. The plaintext secret is
/// never stored; verification re-hashes against the recorded salt.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Validates that a stored value parses as a PHC string.
    pub fn new(phc: String) -> Result<Self, PasswordHashParseError> {
        PasswordHash::new(&phc).map_err(PasswordHashParseError)?;
        Ok(Self(phc))
    }

    pub fn from_password(password: &Password) -> Result<Self, CredentialHashError> {
        Self::from_secret_bytes(password.get().as_bytes())
    }

    /// An unusable credential for externally-provisioned accounts: a hash
    /// of random bytes nobody knows.
    pub fn random() -> Result<Self, CredentialHashError> {
        let secret: [u8; 32] = rand::random();
        Self::from_secret_bytes(&secret)
    }

    fn from_secret_bytes(secret: &[u8]) -> Result<Self, CredentialHashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(secret, &salt)
            .map_err(CredentialHashError)?;

        Ok(Self(hash.to_string()))
    }

    /// Whether the password matches. A parse failure of the stored hash is
    /// an error, not a mismatch.
    pub fn matches(&self, password: &Password) -> Result<bool, PasswordHashParseError> {
        let parsed = PasswordHash::new(&self.0).map_err(PasswordHashParseError)?;

        match Argon2::default().verify_password(password.get().as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
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

impl Debug for CredentialHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CredentialHash").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Issuing session token failed: {0}")]
pub struct SessionTokenIssueError(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SessionTokenDecodeError {
    #[error("The session token has expired")]
    Expired,
    #[error("The session token is invalid")]
    Invalid,
}

/// A signed, self-contained bearer token. Verification is purely
/// cryptographic and needs no store lookup.
#[derive(Clone, Eq, PartialEq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Debug for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionToken").field(&"[redacted]").finish()
    }
}

#[derive(Serialize, Deserialize)]
struct SessionClaims {
    sub: i64,
    iat: i64,
    exp: i64,
}

/// HS256 signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user_id: Id<UserMarker>) -> Result<SessionToken, SessionTokenIssueError> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        user_id: Id<UserMarker>,
        now: OffsetDateTime,
    ) -> Result<SessionToken, SessionTokenIssueError> {
        let claims = SessionClaims {
            sub: user_id.get(),
            iat: now.unix_timestamp(),
            exp: (now + SESSION_TOKEN_TTL).unix_timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|err| SessionTokenIssueError(err.to_string()))?;

        Ok(SessionToken(token))
    }

    pub fn verify(&self, token: &str) -> Result<Id<UserMarker>, SessionTokenDecodeError> {
        let data =
            jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &Validation::default())
                .map_err(|err| match err.kind() {
                    ErrorKind::ExpiredSignature => SessionTokenDecodeError::Expired,
                    _ => SessionTokenDecodeError::Invalid,
                })?;

        Ok(Id::new(data.claims.sub))
    }
}

impl Debug for SessionKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        Id,
        auth::{CredentialHash, SESSION_TOKEN_TTL, SessionKeys, SessionTokenDecodeError},
        user::Password,
    };
    use time::OffsetDateTime;

    fn keys() -> SessionKeys {
        SessionKeys::new("test-secret-that-is-at-least-32-characters-long")
    }

    #[test]
    fn hash_then_verify() {
        let password = Password::new("correct horse".into()).unwrap();
        let hash = CredentialHash::from_password(&password).unwrap();

        assert!(hash.matches(&password).unwrap());

        let wrong = Password::new("battery staple".into()).unwrap();
        assert!(!hash.matches(&wrong).unwrap());
    }

    #[test]
    fn hash_is_not_the_password() {
        let password = Password::new("secret123".into()).unwrap();
        let hash = CredentialHash::from_password(&password).unwrap();
        assert!(!hash.get().contains("secret123"));
    }

    #[test]
    fn stored_hash_must_parse() {
        assert!(CredentialHash::new("not-a-phc-string".into()).is_err());
    }

    #[test]
    fn random_credential_matches_nothing_typable() {
        let hash = CredentialHash::random().unwrap();
        let guess = Password::new("password".into()).unwrap();
        assert!(!hash.matches(&guess).unwrap());
    }

    #[test]
    fn token_roundtrip() {
        let keys = keys();
        let user_id = Id::new(17);

        let token = keys.issue(user_id).unwrap();
        assert_eq!(keys.verify(token.get()).unwrap(), user_id);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = keys();
        let issued = OffsetDateTime::now_utc() - SESSION_TOKEN_TTL - time::Duration::hours(1);

        let token = keys.issue_at(Id::new(17), issued).unwrap();
        assert_eq!(
            keys.verify(token.get()),
            Err(SessionTokenDecodeError::Expired)
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = keys().issue(Id::new(17)).unwrap();

        let other = SessionKeys::new("a-completely-different-32-char-secret!!");
        assert_eq!(
            other.verify(token.get()),
            Err(SessionTokenDecodeError::Invalid)
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(
            keys().verify("not-a-jwt"),
            Err(SessionTokenDecodeError::Invalid)
        );
    }
}
