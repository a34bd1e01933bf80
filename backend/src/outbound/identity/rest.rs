//! Reqwest-backed identity provider adapter.
//!
//! Owns transport only: request serialisation, timeout and HTTP error
//! mapping, and decoding responses into domain identities. The adapter
//! also tracks the current session locally so `auth_state_changes`
//! observers see signup, sign-in, and sign-out as they happen; the hosted
//! API has no server-side session to consult.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use reqwest::{Client, Url};
use serde_json::json;
use tokio::sync::watch;

use super::dto::{LookupDto, SessionDto, map_error_body};
use crate::domain::identity::{DisplayName, Identity, IdentityId};
use crate::domain::ports::{
    AuthStateEvent, IdentityProvider, IdentityProviderError, VerificationLinkConfig,
    watch_auth_stream,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

struct CurrentSession {
    identity: Identity,
    id_token: String,
}

/// Identity provider adapter speaking the hosted REST API.
pub struct RestIdentityProvider {
    client: Client,
    base: Url,
    api_key: String,
    session: Mutex<Option<CurrentSession>>,
    state: watch::Sender<Option<Identity>>,
}

impl RestIdentityProvider {
    /// Build an adapter with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url, api_key: String) -> Result<Self, reqwest::Error> {
        Self::with_timeout(base, api_key, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build an adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_timeout(
        base: Url,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        let (state, _) = watch::channel(None);
        Ok(Self {
            client,
            base,
            api_key,
            session: Mutex::new(None),
            state,
        })
    }

    fn endpoint(&self, operation: &str) -> Result<Url, IdentityProviderError> {
        self.base.join(&format!("accounts:{operation}")).map_err(|err| {
            IdentityProviderError::unavailable(format!("malformed endpoint URL: {err}"))
        })
    }

    async fn post_json(
        &self,
        operation: &str,
        payload: serde_json::Value,
    ) -> Result<Vec<u8>, IdentityProviderError> {
        let url = self.endpoint(operation)?;
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_error_body(status.as_u16(), body.as_ref()));
        }
        Ok(body.to_vec())
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<CurrentSession>> {
        self.session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn open_session(&self, identity: Identity, id_token: String) {
        *self.lock_session() = Some(CurrentSession {
            identity: identity.clone(),
            id_token,
        });
        self.state.send_replace(Some(identity));
    }

    fn session_token_for(&self, id: &IdentityId) -> Result<String, IdentityProviderError> {
        let session = self.lock_session();
        match session.as_ref() {
            Some(current) if current.identity.id == *id => Ok(current.id_token.clone()),
            _ => Err(IdentityProviderError::unavailable(format!(
                "no authenticated session for identity {id}"
            ))),
        }
    }

    async fn lookup(&self, id_token: &str) -> Result<Identity, IdentityProviderError> {
        let body = self
            .post_json("lookup", json!({ "idToken": id_token }))
            .await?;
        let decoded: LookupDto = decode(&body)?;
        decoded
            .users
            .into_iter()
            .next()
            .ok_or_else(|| {
                IdentityProviderError::unavailable("lookup returned no users for a live token")
            })?
            .into_identity()
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, IdentityProviderError> {
    serde_json::from_slice(body).map_err(|err| {
        IdentityProviderError::unavailable(format!("invalid JSON in provider response: {err}"))
    })
}

fn map_transport_error(error: reqwest::Error) -> IdentityProviderError {
    IdentityProviderError::unavailable(error.to_string())
}

/// Build the `sendOobCode` request body.
///
/// The landing URL goes on the wire as `continueUrl`; when the link config
/// names a separate continuation target, that one wins.
fn verification_payload(
    id_token: &str,
    link: Option<VerificationLinkConfig>,
) -> serde_json::Value {
    let mut payload = json!({
        "requestType": "VERIFY_EMAIL",
        "idToken": id_token,
    });
    if let Some(link) = link {
        payload["continueUrl"] = json!(link.continue_url.unwrap_or(link.url));
        payload["canHandleCodeInApp"] = json!(link.handle_code_in_app);
    }
    payload
}


#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn create_identity(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, IdentityProviderError> {
        let body = self
            .post_json(
                "signUp",
                json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;
        let session: SessionDto = decode(&body)?;
        let id_token = session.id_token.clone();
        let identity = session.into_identity()?;
        self.open_session(identity.clone(), id_token);
        Ok(identity)
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, IdentityProviderError> {
        let body = self
            .post_json(
                "signInWithPassword",
                json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;
        let session: SessionDto = decode(&body)?;
        let id_token = session.id_token.clone();

        // Sign-in responses omit the verified flag; a lookup fills it in.
        let identity = match self.lookup(&id_token).await {
            Ok(identity) => identity,
            Err(_) => session.into_identity()?,
        };
        self.open_session(identity.clone(), id_token);
        Ok(identity)
    }

    async fn deauthenticate(&self) -> Result<(), IdentityProviderError> {
        // The hosted API issues bearer tokens with no server-side session,
        // so sign-out is local: drop the token and notify observers.
        *self.lock_session() = None;
        self.state.send_replace(None);
        Ok(())
    }

    async fn update_display_name(
        &self,
        id: &IdentityId,
        display_name: &DisplayName,
    ) -> Result<(), IdentityProviderError> {
        let id_token = self.session_token_for(id)?;
        self.post_json(
            "update",
            json!({
                "idToken": id_token,
                "displayName": display_name.as_ref(),
                "returnSecureToken": false,
            }),
        )
        .await?;

        let updated = {
            let mut session = self.lock_session();
            match session.as_mut() {
                Some(current) if current.identity.id == *id => {
                    current.identity.display_name = Some(display_name.clone());
                    Some(current.identity.clone())
                }
                _ => None,
            }
        };
        if let Some(updated) = updated {
            self.state.send_replace(Some(updated));
        }
        Ok(())
    }

    async fn send_verification_email(
        &self,
        id: &IdentityId,
        link: Option<VerificationLinkConfig>,
    ) -> Result<(), IdentityProviderError> {
        let id_token = self.session_token_for(id)?;
        let payload = verification_payload(&id_token, link);
        self.post_json("sendOobCode", payload).await?;
        Ok(())
    }

    fn auth_state_changes(&self) -> BoxStream<'static, AuthStateEvent> {
        watch_auth_stream(self.state.subscribe())
    }
}
