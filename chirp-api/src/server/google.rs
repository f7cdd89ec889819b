//! Verification of Google ID tokens for the external sign-in flow.
//!
//! An assertion is accepted only when its RS256 signature checks out
//! against Google's published signing keys, its issuer is one of the two
//! Google issuer forms, and its audience is the configured client id.

use chirp_common::model::user::Email;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

pub const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
pub const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

#[derive(Debug, Error)]
pub enum GoogleVerifyError {
    #[error("Google sign-in is not configured")]
    NotConfigured,
    #[error("Fetching Google signing keys failed: {0}")]
    FetchKeys(#[from] reqwest::Error),
    #[error("The assertion header could not be decoded")]
    MalformedHeader,
    #[error("No Google signing key matches the assertion")]
    UnknownKey,
    #[error("The assertion was rejected")]
    Rejected,
    #[error("The asserted address is not verified by the issuer")]
    UnverifiedEmail,
    #[error("The asserted address is malformed")]
    MalformedEmail,
}

#[derive(Deserialize)]
struct GoogleKey {
    kid: String,
    n: String,
    e: String,
}

#[derive(Deserialize)]
struct GoogleCerts {
    keys: Vec<GoogleKey>,
}

#[derive(Deserialize)]
struct GoogleClaims {
    email: String,
    email_verified: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
}

/// What a successfully verified assertion says about the caller.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct VerifiedIdentity {
    pub email: Email,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug)]
pub struct GoogleVerifier {
    http: reqwest::Client,
    client_id: Option<String>,
}

impl GoogleVerifier {
    #[must_use]
    pub fn new(http: reqwest::Client, client_id: Option<String>) -> Self {
        Self { http, client_id }
    }

    pub async fn verify(&self, assertion: &str) -> Result<VerifiedIdentity, GoogleVerifyError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(GoogleVerifyError::NotConfigured)?;

        let header = jsonwebtoken::decode_header(assertion)
            .map_err(|_| GoogleVerifyError::MalformedHeader)?;
        let kid = header.kid.ok_or(GoogleVerifyError::MalformedHeader)?;

        let certs: GoogleCerts = self
            .http
            .get(GOOGLE_CERTS_URL)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let key = certs
            .keys
            .iter()
            .find(|key| key.kid == kid)
            .ok_or(GoogleVerifyError::UnknownKey)?;
        let decoding_key = DecodingKey::from_rsa_components(&key.n, &key.e)
            .map_err(|_| GoogleVerifyError::UnknownKey)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[client_id]);
        validation.set_issuer(&GOOGLE_ISSUERS);

        let data = jsonwebtoken::decode::<GoogleClaims>(assertion, &decoding_key, &validation)
            .map_err(|_| GoogleVerifyError::Rejected)?;

        if !data.claims.email_verified.unwrap_or(false) {
            return Err(GoogleVerifyError::UnverifiedEmail);
        }

        let email =
            Email::new(data.claims.email).map_err(|_| GoogleVerifyError::MalformedEmail)?;

        Ok(VerifiedIdentity {
            email,
            name: data.claims.name,
            picture: data.claims.picture,
        })
    }
}
