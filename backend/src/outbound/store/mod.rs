//! Reqwest-backed account store adapter.
//!
//! Talks to the hosted document store's JSON-over-HTTP surface: one
//! document per identity at `accounts/{id}.json`, where a `GET` of an
//! absent document returns the literal `null`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, Url};
use serde_json::json;

use crate::domain::account::AccountRecord;
use crate::domain::identity::IdentityId;
use crate::domain::ports::{AccountStore, AccountStoreError};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Account store adapter speaking the hosted document store's REST API.
pub struct RestAccountStore {
    client: Client,
    base: Url,
    auth_token: Option<String>,
}

impl RestAccountStore {
    /// Build an adapter with the default request timeout.
    ///
    /// `auth_token`, when present, is sent as the store's `auth` query
    /// parameter on every request.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url, auth_token: Option<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(base, auth_token, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build an adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_timeout(
        base: Url,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            auth_token,
        })
    }

    fn document_url(&self, id: &IdentityId) -> Result<Url, AccountStoreError> {
        self.base
            .join(&format!("accounts/{id}.json"))
            .map_err(|err| AccountStoreError::unavailable(format!("malformed document URL: {err}")))
    }

    async fn send(
        &self,
        method: Method,
        id: &IdentityId,
        payload: Option<serde_json::Value>,
    ) -> Result<Vec<u8>, AccountStoreError> {
        let url = self.document_url(id)?;
        let mut request = self.client.request(method, url);
        if let Some(token) = self.auth_token.as_deref() {
            request = request.query(&[("auth", token)]);
        }
        if let Some(payload) = payload {
            request = request.json(&payload);
        }

        let response = request
            .send()
            .await
            .map_err(|err| AccountStoreError::unavailable(err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| AccountStoreError::unavailable(err.to_string()))?;
        if !status.is_success() {
            return Err(AccountStoreError::unavailable(format!(
                "status {}",
                status.as_u16()
            )));
        }
        Ok(body.to_vec())
    }
}

/// Decode a document body, where the literal `null` means absent.
fn decode_record(body: &[u8]) -> Result<Option<AccountRecord>, AccountStoreError> {
    serde_json::from_slice(body).map_err(|err| {
        AccountStoreError::malformed(format!("invalid account document: {err}"))
    })
}

#[async_trait]
impl AccountStore for RestAccountStore {
    async fn fetch_account(
        &self,
        id: &IdentityId,
    ) -> Result<Option<AccountRecord>, AccountStoreError> {
        let body = self.send(Method::GET, id, None).await?;
        decode_record(&body)
    }

    async fn create_account(
        &self,
        id: &IdentityId,
        record: &AccountRecord,
    ) -> Result<(), AccountStoreError> {
        let payload = serde_json::to_value(record)
            .map_err(|err| AccountStoreError::malformed(format!("unencodable record: {err}")))?;
        self.send(Method::PUT, id, Some(payload)).await?;
        Ok(())
    }

    async fn update_verification_token(
        &self,
        id: &IdentityId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AccountStoreError> {
        // PATCH merges into the existing document rather than replacing it.
        let payload = json!({
            "verificationToken": token,
            "tokenExpiration": expires_at.timestamp_millis(),
        });
        self.send(Method::PATCH, id, Some(payload)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network decoding helpers.
    use super::*;

    #[test]
    fn null_documents_read_as_absent() {
        assert_eq!(decode_record(b"null").expect("decode"), None);
    }

    #[test]
    fn documents_decode_into_records() {
        let body = br#"{
            "email": "club@example.com",
            "displayName": "Village CC",
            "platform": "web",
            "paid": true,
            "closed": false
        }"#;
        let record = decode_record(body).expect("decode").expect("present");
        assert_eq!(record.email, "club@example.com");
        assert!(record.paid);
        assert_eq!(record.trial_start, None);
    }

    #[test]
    fn unparseable_documents_read_as_malformed() {
        let err = decode_record(b"<html></html>").expect_err("decode must fail");
        assert!(matches!(err, AccountStoreError::Malformed { .. }));
    }
}
