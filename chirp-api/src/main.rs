use crate::server::{ServerState, google::GoogleVerifier, news::NewsProxy};
use axum::http::{HeaderValue, Method, header};
use chirp_common::model::auth::SessionKeys;
use chirp_db::client::{DbClient, DbError};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

const DEFAULT_CLIENT_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error connecting to the database: {0}")]
    Db(#[from] DbError),
    #[error("The configured client origin is not a valid header value: {0}")]
    ClientOrigin(axum::http::header::InvalidHeaderValue),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    jwt_secret: String,
    client_origin: Option<String>,
    google_client_id: Option<String>,
    news_api_key: Option<String>,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "chirp_api=debug,chirp_common=debug,chirp_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

fn cors_layer(client_origin: Option<&str>) -> Result<CorsLayer, InitError> {
    let origin = client_origin
        .unwrap_or(DEFAULT_CLIENT_ORIGIN)
        .parse::<HeaderValue>()
        .map_err(InitError::ClientOrigin)?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let db_client = Arc::new(DbClient::connect(&env.database_url).await?);
    let http = reqwest::Client::new();
    let state = ServerState {
        db_client,
        session_keys: Arc::new(SessionKeys::new(&env.jwt_secret)),
        google: Arc::new(GoogleVerifier::new(http.clone(), env.google_client_id)),
        news: Arc::new(NewsProxy::new(http, env.news_api_key)),
    };

    let app = server::routes()
        .with_state(state)
        .layer(cors_layer(env.client_origin.as_deref())?)
        .layer(TraceLayer::new_for_http());

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    axum::serve(listener, app)
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
