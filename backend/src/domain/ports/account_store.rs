//! Driven port for the hosted document store holding account records.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;
use crate::domain::account::AccountRecord;
use crate::domain::identity::IdentityId;

define_port_error! {
    /// Failure reported by the account store.
    pub enum AccountStoreError {
        /// The store could not be reached.
        Unavailable { message: String } => "account store unreachable: {message}",
        /// The store answered with a document this build cannot decode.
        Malformed { message: String } => "account store returned a malformed document: {message}",
    }
}

/// Driven port for point reads and writes of account records.
///
/// The admission policy only needs `fetch_account`; the signup and
/// resend-verification flows add the two write operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Read the account record for an identity, `None` when absent.
    async fn fetch_account(
        &self,
        id: &IdentityId,
    ) -> Result<Option<AccountRecord>, AccountStoreError>;

    /// Write the initial account record at signup.
    async fn create_account(
        &self,
        id: &IdentityId,
        record: &AccountRecord,
    ) -> Result<(), AccountStoreError>;

    /// Replace the outstanding verification token and its expiry.
    async fn update_verification_token(
        &self,
        id: &IdentityId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AccountStoreError>;
}

/// In-memory account store for tests and local development.
#[derive(Default)]
pub struct FixtureAccountStore {
    records: Mutex<HashMap<IdentityId, AccountRecord>>,
}

impl FixtureAccountStore {
    /// Create an empty fixture store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, replacing any existing one for the identity.
    pub fn seed(&self, id: IdentityId, record: AccountRecord) {
        self.lock().insert(id, record);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<IdentityId, AccountRecord>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl AccountStore for FixtureAccountStore {
    async fn fetch_account(
        &self,
        id: &IdentityId,
    ) -> Result<Option<AccountRecord>, AccountStoreError> {
        Ok(self.lock().get(id).cloned())
    }

    async fn create_account(
        &self,
        id: &IdentityId,
        record: &AccountRecord,
    ) -> Result<(), AccountStoreError> {
        self.lock().insert(id.clone(), record.clone());
        Ok(())
    }

    async fn update_verification_token(
        &self,
        id: &IdentityId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AccountStoreError> {
        let mut records = self.lock();
        let Some(record) = records.get_mut(id) else {
            return Err(AccountStoreError::malformed(format!(
                "no account record for identity {id}"
            )));
        };
        record.verification_token = Some(token.to_owned());
        record.token_expiration = Some(expires_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::account::Platform;

    fn record() -> AccountRecord {
        AccountRecord {
            email: "club@example.com".into(),
            display_name: None,
            platform: Platform::Web,
            paid: false,
            trial_start: Some(Utc::now()),
            closed: false,
            verified: false,
            verification_token: None,
            token_expiration: None,
        }
    }

    #[tokio::test]
    async fn absent_records_read_as_none() {
        let store = FixtureAccountStore::new();
        let id = IdentityId::new("missing").expect("id");
        assert_eq!(store.fetch_account(&id).await.expect("fetch"), None);
    }

    #[tokio::test]
    async fn created_records_round_trip() {
        let store = FixtureAccountStore::new();
        let id = IdentityId::new("abc123").expect("id");
        store.create_account(&id, &record()).await.expect("create");
        let fetched = store
            .fetch_account(&id)
            .await
            .expect("fetch")
            .expect("record present");
        assert_eq!(fetched.email, "club@example.com");
    }

    #[tokio::test]
    async fn token_updates_require_an_existing_record() {
        let store = FixtureAccountStore::new();
        let id = IdentityId::new("abc123").expect("id");
        let err = store
            .update_verification_token(&id, "tok", Utc::now())
            .await
            .expect_err("update without record must fail");
        assert!(matches!(err, AccountStoreError::Malformed { .. }));
    }
}
