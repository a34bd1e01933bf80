//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! Provides a thin wrapper around Actix sessions so handlers only deal with
//! domain-friendly operations such as persisting or clearing the admitted
//! identity.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;

use crate::domain::{Error, IdentityId};

pub(crate) const IDENTITY_ID_KEY: &str = "identity_id";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the admitted identity's id in the session cookie.
    pub fn persist_identity(&self, id: &IdentityId) -> Result<(), Error> {
        self.0
            .insert(IDENTITY_ID_KEY, id.as_ref())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Fetch the admitted identity id from the session, if present.
    pub fn identity_id(&self) -> Result<Option<IdentityId>, Error> {
        let id = self
            .0
            .get::<String>(IDENTITY_ID_KEY)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))?;
        match id {
            Some(raw) => match IdentityId::new(raw) {
                Ok(id) => Ok(Some(id)),
                Err(error) => {
                    tracing::warn!("invalid identity id in session cookie: {error}");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Require an admitted identity id or return `401 Unauthorized`.
    pub fn require_identity_id(&self) -> Result<IdentityId, Error> {
        self.identity_id()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Rotate the session key material after a successful admission.
    pub fn renew(&self) {
        self.0.renew();
    }

    /// Drop all session state, e.g. at logout.
    pub fn purge(&self) {
        self.0.purge();
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
