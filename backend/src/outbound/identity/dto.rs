//! Wire DTOs for the hosted identity API.
//!
//! The hosted API reports failures as an error envelope whose `message`
//! field is a SCREAMING_SNAKE code, sometimes suffixed with detail text
//! (`WEAK_PASSWORD : Password should be at least 6 characters`). Mapping
//! into [`ProviderErrorCode`] happens here so the adapter proper only deals
//! with transport.

use serde::Deserialize;

use crate::domain::classify::ProviderErrorCode;
use crate::domain::identity::{DisplayName, Identity, IdentityId};
use crate::domain::ports::IdentityProviderError;

/// Response to `accounts:signUp` and `accounts:signInWithPassword`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SessionDto {
    pub local_id: String,
    pub email: String,
    pub id_token: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Response to `accounts:lookup`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LookupDto {
    #[serde(default)]
    pub users: Vec<LookupUserDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LookupUserDto {
    pub local_id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelopeDto {
    error: ErrorBodyDto,
}

#[derive(Debug, Deserialize)]
struct ErrorBodyDto {
    message: String,
}

impl SessionDto {
    pub(super) fn into_identity(self) -> Result<Identity, IdentityProviderError> {
        build_identity(self.local_id, self.email, self.display_name, false)
    }
}

impl LookupUserDto {
    pub(super) fn into_identity(self) -> Result<Identity, IdentityProviderError> {
        build_identity(
            self.local_id,
            self.email,
            self.display_name,
            self.email_verified,
        )
    }
}

fn build_identity(
    local_id: String,
    email: String,
    display_name: Option<String>,
    email_verified: bool,
) -> Result<Identity, IdentityProviderError> {
    let id = IdentityId::new(local_id)
        .map_err(|err| IdentityProviderError::unavailable(format!("malformed identity id: {err}")))?;
    let mut identity = Identity::new(id, email);
    // Profile names set outside this service may not pass local validation;
    // an undecodable name reads as absent rather than failing the sign-in.
    identity.display_name = display_name.and_then(|name| DisplayName::new(name).ok());
    identity.email_verified = email_verified;
    Ok(identity)
}

/// Map an error-status response body to a provider error.
///
/// Unparseable bodies map to [`IdentityProviderError::Unavailable`]; a
/// decoded envelope always reads as a rejection, with unrecognised codes
/// preserved in [`ProviderErrorCode::Other`].
pub(super) fn map_error_body(status: u16, body: &[u8]) -> IdentityProviderError {
    let Ok(envelope) = serde_json::from_slice::<ErrorEnvelopeDto>(body) else {
        return IdentityProviderError::unavailable(format!(
            "status {status} with undecodable error body"
        ));
    };
    IdentityProviderError::rejected(map_rest_code(&envelope.error.message))
}

/// Translate the hosted API's SCREAMING_SNAKE error codes to the normalised
/// code set.
pub(super) fn map_rest_code(message: &str) -> ProviderErrorCode {
    // Detail suffixes follow the code after " : ".
    let code = message.split(" : ").next().unwrap_or(message).trim();
    match code {
        "INVALID_EMAIL" | "MISSING_EMAIL" => ProviderErrorCode::InvalidEmail,
        "MISSING_PASSWORD" => ProviderErrorCode::MissingPassword,
        "WEAK_PASSWORD" => ProviderErrorCode::WeakPassword,
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" => ProviderErrorCode::InvalidCredential,
        "EMAIL_EXISTS" => ProviderErrorCode::EmailAlreadyInUse,
        "EMAIL_NOT_FOUND" => ProviderErrorCode::UserNotFound,
        "USER_DISABLED" => ProviderErrorCode::UserDisabled,
        "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => ProviderErrorCode::RequiresRecentLogin,
        other => ProviderErrorCode::Other(other.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("EMAIL_EXISTS", ProviderErrorCode::EmailAlreadyInUse)]
    #[case("INVALID_EMAIL", ProviderErrorCode::InvalidEmail)]
    #[case("MISSING_PASSWORD", ProviderErrorCode::MissingPassword)]
    #[case(
        "WEAK_PASSWORD : Password should be at least 6 characters",
        ProviderErrorCode::WeakPassword
    )]
    #[case("INVALID_LOGIN_CREDENTIALS", ProviderErrorCode::InvalidCredential)]
    #[case("INVALID_PASSWORD", ProviderErrorCode::InvalidCredential)]
    #[case("EMAIL_NOT_FOUND", ProviderErrorCode::UserNotFound)]
    #[case("USER_DISABLED", ProviderErrorCode::UserDisabled)]
    #[case("CREDENTIAL_TOO_OLD_LOGIN_AGAIN", ProviderErrorCode::RequiresRecentLogin)]
    #[case("TOO_MANY_ATTEMPTS_TRY_LATER", ProviderErrorCode::Other("TOO_MANY_ATTEMPTS_TRY_LATER".into()))]
    fn rest_codes_map_to_normalised_codes(
        #[case] message: &str,
        #[case] expected: ProviderErrorCode,
    ) {
        assert_eq!(map_rest_code(message), expected);
    }

    #[test]
    fn error_envelopes_decode_as_rejections() {
        let body = br#"{"error":{"code":400,"message":"EMAIL_EXISTS"}}"#;
        let err = map_error_body(400, body);
        assert!(matches!(
            err,
            IdentityProviderError::Rejected {
                code: ProviderErrorCode::EmailAlreadyInUse
            }
        ));
    }

    #[test]
    fn undecodable_error_bodies_read_as_unavailable() {
        let err = map_error_body(502, b"<html>Bad Gateway</html>");
        assert!(matches!(err, IdentityProviderError::Unavailable { .. }));
    }

    #[test]
    fn session_dto_decodes_into_an_identity() {
        let dto: SessionDto = serde_json::from_str(
            r#"{"localId":"kX2mP9qL7aB4","email":"club@example.com","idToken":"tok","displayName":"Village CC"}"#,
        )
        .expect("decode session");
        let identity = dto.into_identity().expect("valid identity");
        assert_eq!(identity.email, "club@example.com");
        assert_eq!(
            identity.display_name.map(|name| name.to_string()),
            Some("Village CC".to_owned())
        );
        assert!(!identity.email_verified);
    }

    #[test]
    fn undecodable_profile_names_read_as_absent() {
        let dto: SessionDto = serde_json::from_str(
            r#"{"localId":"abc123","email":"club@example.com","idToken":"tok","displayName":"<script>"}"#,
        )
        .expect("decode session");
        let identity = dto.into_identity().expect("valid identity");
        assert_eq!(identity.display_name, None);
    }

    #[test]
    fn lookup_carries_the_verified_flag() {
        let dto: LookupDto = serde_json::from_str(
            r#"{"users":[{"localId":"abc123","email":"club@example.com","emailVerified":true}]}"#,
        )
        .expect("decode lookup");
        let identity = dto
            .users
            .into_iter()
            .next()
            .expect("one user")
            .into_identity()
            .expect("valid identity");
        assert!(identity.email_verified);
    }
}
