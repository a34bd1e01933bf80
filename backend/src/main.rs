//! Backend entry-point: environment-driven wiring of the auth service.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::cookie::{Key, SameSite};
use actix_web::web;
use mockable::DefaultClock;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};
use url::Url;

use backend::domain::Platform;
use backend::inbound::http::health::HealthState;
use backend::inbound::http::state::AppState;
use backend::outbound::identity::RestIdentityProvider;
use backend::outbound::store::RestAccountStore;
use backend::server::{ServerConfig, create_server};

fn session_key() -> std::io::Result<Key> {
    let key_path =
        env::var("SESSION_KEY_FILE").unwrap_or_else(|_| "/var/run/secrets/session_key".into());
    match std::fs::read(&key_path) {
        Ok(bytes) => Ok(Key::derive_from(&bytes)),
        Err(e) => {
            let allow_dev = env::var("SESSION_ALLOW_EPHEMERAL").ok().as_deref() == Some("1");
            if cfg!(debug_assertions) || allow_dev {
                warn!(path = %key_path, error = %e, "using temporary session key (dev only)");
                Ok(Key::generate())
            } else {
                Err(std::io::Error::other(format!(
                    "failed to read session key at {key_path}: {e}"
                )))
            }
        }
    }
}

fn required_url(var: &str) -> std::io::Result<Url> {
    let raw = env::var(var)
        .map_err(|_| std::io::Error::other(format!("{var} must be set")))?;
    Url::parse(&raw).map_err(|e| std::io::Error::other(format!("{var} is not a valid URL: {e}")))
}

fn bind_addr() -> std::io::Result<SocketAddr> {
    if let Ok(raw) = env::var("BIND_ADDR") {
        return raw
            .parse()
            .map_err(|e| std::io::Error::other(format!("BIND_ADDR is not a socket address: {e}")));
    }
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()
        .map_err(|e| std::io::Error::other(format!("PORT is not a port number: {e}")))?;
    Ok(SocketAddr::from(([0, 0, 0, 0], port)))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let key = session_key()?;
    let cookie_secure = env::var("SESSION_COOKIE_SECURE")
        .map(|v| v != "0")
        .unwrap_or(true);

    let identity_api_url = required_url("IDENTITY_API_URL")?;
    let identity_api_key = env::var("IDENTITY_API_KEY")
        .map_err(|_| std::io::Error::other("IDENTITY_API_KEY must be set"))?;
    let store_url = required_url("ACCOUNT_STORE_URL")?;
    let store_auth = env::var("ACCOUNT_STORE_AUTH").ok();
    let public_url = required_url("SERVER_URL")?;

    let provider = RestIdentityProvider::new(identity_api_url, identity_api_key)
        .map_err(|e| std::io::Error::other(format!("identity client failed to build: {e}")))?;
    let store = RestAccountStore::new(store_url, store_auth)
        .map_err(|e| std::io::Error::other(format!("store client failed to build: {e}")))?;

    let app_state = AppState::new(
        Arc::new(provider),
        Arc::new(store),
        Platform::Web,
        Arc::new(DefaultClock),
        public_url,
    );

    let health_state = web::Data::new(HealthState::new());
    let config = ServerConfig::new(key, cookie_secure, SameSite::Lax, bind_addr()?);
    let server = create_server(health_state, app_state, config)?;
    server.await
}
