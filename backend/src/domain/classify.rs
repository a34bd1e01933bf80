//! Error classification: provider error codes to user-facing messages.
//!
//! The mapping is a closed table keyed by the credential operation being
//! attempted. Unrecognised codes inside a known operation fall back to a
//! generic message so raw provider detail never reaches a client.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Message returned for any provider code the table does not list.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Credential operation being attempted when the provider failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Creating a new identity.
    SignUp,
    /// Authenticating an existing identity.
    Login,
    /// Terminating the current session.
    Logout,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SignUp => "signUp",
            Self::Login => "login",
            Self::Logout => "logout",
        };
        f.write_str(label)
    }
}

/// Normalised error code reported by the identity provider.
///
/// Providers prefix codes with a scheme tag (`auth/invalid-email`);
/// [`ProviderErrorCode::parse`] strips it. Codes outside the known set are
/// preserved in [`ProviderErrorCode::Other`] for logging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderErrorCode {
    /// The email address failed the provider's format check.
    InvalidEmail,
    /// No password was supplied.
    MissingPassword,
    /// The password failed the provider's strength check.
    WeakPassword,
    /// The email/password combination was rejected.
    InvalidCredential,
    /// An identity already exists for this email.
    EmailAlreadyInUse,
    /// No identity exists for this email.
    UserNotFound,
    /// The identity has been administratively disabled.
    UserDisabled,
    /// The operation needs a fresher authentication than the session holds.
    RequiresRecentLogin,
    /// Any code outside the recognised set.
    #[serde(untagged)]
    Other(String),
}

impl ProviderErrorCode {
    /// Parse a raw provider code, tolerating an `auth/` scheme prefix.
    pub fn parse(raw: &str) -> Self {
        let code = raw.strip_prefix("auth/").unwrap_or(raw);
        match code {
            "invalid-email" => Self::InvalidEmail,
            "missing-password" => Self::MissingPassword,
            "weak-password" => Self::WeakPassword,
            "invalid-credential" => Self::InvalidCredential,
            "email-already-in-use" => Self::EmailAlreadyInUse,
            "user-not-found" => Self::UserNotFound,
            "user-disabled" => Self::UserDisabled,
            "requires-recent-login" => Self::RequiresRecentLogin,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Kebab-case representation used in logs.
    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidEmail => "invalid-email",
            Self::MissingPassword => "missing-password",
            Self::WeakPassword => "weak-password",
            Self::InvalidCredential => "invalid-credential",
            Self::EmailAlreadyInUse => "email-already-in-use",
            Self::UserNotFound => "user-not-found",
            Self::UserDisabled => "user-disabled",
            Self::RequiresRecentLogin => "requires-recent-login",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a provider error to the user-facing message for the given operation.
pub fn classify(kind: OperationKind, code: &ProviderErrorCode) -> &'static str {
    use ProviderErrorCode as Code;

    match kind {
        OperationKind::SignUp => match code {
            Code::InvalidEmail => "Invalid email address",
            Code::MissingPassword => "You must enter a password",
            Code::WeakPassword => "Your password must be at least 6 characters long",
            Code::InvalidCredential => "Incorrect email & password combination",
            Code::EmailAlreadyInUse => "You already have an account",
            _ => UNKNOWN_ERROR_MESSAGE,
        },
        OperationKind::Login => match code {
            Code::InvalidEmail => "Invalid email address",
            Code::MissingPassword => "You must enter a password",
            Code::InvalidCredential => "Incorrect email & password combination",
            Code::UserNotFound => "User not found",
            // Password sign-in does not emit this code; the entry is almost
            // certainly a copy-over from the signup table. Kept so the
            // user-facing text stays unchanged.
            Code::EmailAlreadyInUse => "Incorrect password",
            _ => UNKNOWN_ERROR_MESSAGE,
        },
        OperationKind::Logout => match code {
            Code::UserDisabled => "Your account has been disabled",
            Code::RequiresRecentLogin => "You must sign in recently to perform this action",
            _ => UNKNOWN_ERROR_MESSAGE,
        },
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(OperationKind::SignUp, ProviderErrorCode::InvalidEmail, "Invalid email address")]
    #[case(OperationKind::SignUp, ProviderErrorCode::MissingPassword, "You must enter a password")]
    #[case(
        OperationKind::SignUp,
        ProviderErrorCode::WeakPassword,
        "Your password must be at least 6 characters long"
    )]
    #[case(
        OperationKind::SignUp,
        ProviderErrorCode::InvalidCredential,
        "Incorrect email & password combination"
    )]
    #[case(
        OperationKind::SignUp,
        ProviderErrorCode::EmailAlreadyInUse,
        "You already have an account"
    )]
    #[case(OperationKind::Login, ProviderErrorCode::InvalidEmail, "Invalid email address")]
    #[case(OperationKind::Login, ProviderErrorCode::MissingPassword, "You must enter a password")]
    #[case(
        OperationKind::Login,
        ProviderErrorCode::InvalidCredential,
        "Incorrect email & password combination"
    )]
    #[case(OperationKind::Login, ProviderErrorCode::UserNotFound, "User not found")]
    #[case(OperationKind::Login, ProviderErrorCode::EmailAlreadyInUse, "Incorrect password")]
    #[case(
        OperationKind::Logout,
        ProviderErrorCode::UserDisabled,
        "Your account has been disabled"
    )]
    #[case(
        OperationKind::Logout,
        ProviderErrorCode::RequiresRecentLogin,
        "You must sign in recently to perform this action"
    )]
    fn listed_pairs_map_to_exact_messages(
        #[case] kind: OperationKind,
        #[case] code: ProviderErrorCode,
        #[case] expected: &str,
    ) {
        assert_eq!(classify(kind, &code), expected);
    }

    #[rstest]
    #[case(OperationKind::SignUp, ProviderErrorCode::UserDisabled)]
    #[case(OperationKind::SignUp, ProviderErrorCode::Other("network-request-failed".into()))]
    #[case(OperationKind::Login, ProviderErrorCode::WeakPassword)]
    #[case(OperationKind::Login, ProviderErrorCode::RequiresRecentLogin)]
    #[case(OperationKind::Logout, ProviderErrorCode::InvalidEmail)]
    #[case(OperationKind::Logout, ProviderErrorCode::Other("internal-error".into()))]
    fn unlisted_codes_fall_back_to_the_generic_message(
        #[case] kind: OperationKind,
        #[case] code: ProviderErrorCode,
    ) {
        assert_eq!(classify(kind, &code), UNKNOWN_ERROR_MESSAGE);
    }

    #[rstest]
    #[case("auth/invalid-email", ProviderErrorCode::InvalidEmail)]
    #[case("invalid-email", ProviderErrorCode::InvalidEmail)]
    #[case("auth/email-already-in-use", ProviderErrorCode::EmailAlreadyInUse)]
    #[case("auth/too-many-requests", ProviderErrorCode::Other("too-many-requests".into()))]
    fn parse_strips_the_scheme_prefix(#[case] raw: &str, #[case] expected: ProviderErrorCode) {
        assert_eq!(ProviderErrorCode::parse(raw), expected);
    }
}
