use crate::server::{Result, ServerError, ServerRouter, google::GoogleVerifier, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use chirp_common::model::{
    ModelValidationError,
    auth::{CredentialHash, SessionKeys, SessionToken},
    user::{DISPLAY_NAME_MAX_LEN, DisplayName, Email, NewUser, Password, User, Username},
};
use chirp_db::client::{DbClient, InsertOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(signup)
        .typed_post(login)
        .typed_post(google)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: SessionToken,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/signup", rejection(ServerError))]
struct SignupPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest {
    username: Username,
    email: Email,
    password: Password,
    display_name: DisplayName,
}

async fn signup(
    SignupPath(): SignupPath,
    State(db): State<Arc<DbClient>>,
    State(keys): State<Arc<SessionKeys>>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<AuthResponse>> {
    // Friendlier error up front; the unique constraints still decide.
    if db.username_taken(&request.username).await? || db.email_taken(&request.email).await? {
        return Err(ServerError::UserAlreadyExists);
    }

    let new_user = NewUser {
        username: request.username,
        email: request.email,
        display_name: request.display_name,
        credential: CredentialHash::from_password(&request.password)?,
        avatar: None,
    };

    let user = match db.create_user(&new_user).await? {
        InsertOutcome::Inserted(user) => user,
        InsertOutcome::Duplicate => return Err(ServerError::UserAlreadyExists),
    };

    let token = keys.issue(user.id)?;
    Ok(Json(AuthResponse { user, token }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/login", rejection(ServerError))]
struct LoginPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct LoginRequest {
    email: Email,
    // Deliberately not `Password`: a too-short secret must read as bad
    // credentials, not as a validation failure.
    password: String,
}

async fn login(
    LoginPath(): LoginPath,
    State(db): State<Arc<DbClient>>,
    State(keys): State<Arc<SessionKeys>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let password =
        Password::new(request.password).map_err(|_| ServerError::InvalidCredentials)?;

    let (user, credential) = db
        .fetch_credentials_by_email(&request.email)
        .await?
        .ok_or(ServerError::InvalidCredentials)?;

    if !credential.matches(&password)? {
        return Err(ServerError::InvalidCredentials);
    }

    let token = keys.issue(user.id)?;
    Ok(Json(AuthResponse { user, token }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/google", rejection(ServerError))]
struct GooglePath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct GoogleRequest {
    credential: String,
}

async fn google(
    GooglePath(): GooglePath,
    State(db): State<Arc<DbClient>>,
    State(keys): State<Arc<SessionKeys>>,
    State(verifier): State<Arc<GoogleVerifier>>,
    Json(request): Json<GoogleRequest>,
) -> Result<Json<AuthResponse>> {
    let identity = verifier.verify(&request.credential).await?;

    let user = match db.fetch_user_by_email(&identity.email).await? {
        Some(user) => user,
        None => provision_user(&db, identity.email, identity.name, identity.picture).await?,
    };

    let token = keys.issue(user.id)?;
    Ok(Json(AuthResponse { user, token }))
}

/// First sight of a verified external address: derive a free handle from
/// its local part and create the account with an unusable credential.
async fn provision_user(
    db: &DbClient,
    email: Email,
    name: Option<String>,
    picture: Option<String>,
) -> Result<User> {
    let base = Username::derived_from_email(&email);
    let mut candidate = base.clone();
    let mut suffix = 1u32;
    while db.username_taken(&candidate).await? {
        candidate = base.numbered(suffix);
        suffix += 1;
    }

    let display_name = match name.and_then(|name| DisplayName::new(name).ok()) {
        Some(display_name) => display_name,
        None => DisplayName::new(email.local_part().chars().take(DISPLAY_NAME_MAX_LEN).collect())
            .map_err(ModelValidationError::from)?,
    };

    let new_user = NewUser {
        username: candidate,
        email,
        display_name,
        credential: CredentialHash::random()?,
        avatar: picture,
    };

    match db.create_user(&new_user).await? {
        InsertOutcome::Inserted(user) => Ok(user),
        // Lost a race against a concurrent sign-in for the same address.
        InsertOutcome::Duplicate => db
            .fetch_user_by_email(&new_user.email)
            .await?
            .ok_or(ServerError::UserAlreadyExists),
    }
}
