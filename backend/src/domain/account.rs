//! Business-level account state held in the external document store.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Length of the free trial granted at signup.
pub const TRIAL_DAYS: i64 = 30;

/// Validity window for an email verification token.
pub const VERIFICATION_TOKEN_DAYS: i64 = 7;

/// Client surface an account is entitled to use.
///
/// Unrecognised tags decode to [`Platform::Unknown`], which never matches a
/// serving surface and therefore fails the admission platform check rather
/// than crashing deserialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// The public web application.
    Web,
    /// The director-facing companion client.
    Director,
    /// Any tag this build does not recognise.
    #[serde(other)]
    Unknown,
}

/// Account record stored per identity under `accounts/{id}`.
///
/// Timestamps are epoch milliseconds on the wire, matching the hosted
/// store's number-typed fields. Every flag defaults to its safe value so a
/// sparse record still decodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    /// Email address the account signed up with.
    pub email: String,
    /// Organisation or club name shown in the application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Client surface the account may use.
    pub platform: Platform,
    /// Whether the account has an active paid subscription.
    #[serde(default)]
    pub paid: bool,
    /// Start of the free trial. Absent behaves as an expired trial.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub trial_start: Option<DateTime<Utc>>,
    /// Suspension flag set when invoices stay unpaid.
    #[serde(default)]
    pub closed: bool,
    /// Whether the email verification flow completed.
    #[serde(default)]
    pub verified: bool,
    /// Outstanding email verification token, if one was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
    /// Expiry of the outstanding verification token.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub token_expiration: Option<DateTime<Utc>>,
}

impl AccountRecord {
    /// Whether the free trial has lapsed at `now`.
    ///
    /// A missing `trial_start` counts as expired: the store historically
    /// coerced the absent value to epoch zero.
    pub fn trial_expired(&self, now: DateTime<Utc>) -> bool {
        match self.trial_start {
            Some(start) => now > start + TimeDelta::days(TRIAL_DAYS),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn record(trial_start: Option<DateTime<Utc>>) -> AccountRecord {
        AccountRecord {
            email: "club@example.com".into(),
            display_name: Some("Village CC".into()),
            platform: Platform::Web,
            paid: false,
            trial_start,
            closed: false,
            verified: false,
            verification_token: None,
            token_expiration: None,
        }
    }

    #[rstest]
    #[case(29, false)]
    #[case(30, false)]
    #[case(31, true)]
    fn trial_expiry_is_a_strict_thirty_day_window(#[case] age_days: i64, #[case] expired: bool) {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("timestamp");
        let started = now - TimeDelta::days(age_days);
        assert_eq!(record(Some(started)).trial_expired(now), expired);
    }

    #[test]
    fn missing_trial_start_counts_as_expired() {
        assert!(record(None).trial_expired(Utc::now()));
    }

    #[test]
    fn sparse_store_documents_decode_with_defaults() {
        let decoded: AccountRecord = serde_json::from_value(serde_json::json!({
            "email": "club@example.com",
            "platform": "web",
        }))
        .expect("decode sparse record");
        assert!(!decoded.paid);
        assert!(!decoded.closed);
        assert!(decoded.trial_start.is_none());
    }

    #[test]
    fn unrecognised_platform_tags_decode_to_unknown() {
        let decoded: AccountRecord = serde_json::from_value(serde_json::json!({
            "email": "club@example.com",
            "platform": "kiosk",
        }))
        .expect("decode record");
        assert_eq!(decoded.platform, Platform::Unknown);
    }

    #[test]
    fn timestamps_round_trip_as_epoch_millis() {
        let start = Utc.timestamp_millis_opt(1_764_950_400_000).single().expect("timestamp");
        let encoded = serde_json::to_value(record(Some(start))).expect("serialise record");
        assert_eq!(encoded["trialStart"], 1_764_950_400_000_i64);
    }
}
