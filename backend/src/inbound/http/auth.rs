//! Authentication API handlers.
//!
//! ```text
//! POST /api/signup {"email":"club@example.com","password":"…","name":"Village CC"}
//! POST /api/login  {"email":"club@example.com","password":"…"}
//! POST /api/logout
//! POST /api/resend
//! ```
//!
//! Error bodies are plain text carrying the classified message; successful
//! responses are small JSON envelopes telling the front end where to go
//! next.

use actix_web::{HttpResponse, post, web};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::domain::account::{AccountRecord, VERIFICATION_TOKEN_DAYS};
use crate::domain::ports::VerificationLinkConfig;
use crate::domain::{
    AdmissionDecision, AdmissionRejection, CredentialValidationError, Credentials, DisplayName,
    Error, Identity,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::AppState;

/// Signup request body for `POST /api/signup`.
#[derive(Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    /// Email address to register.
    pub email: String,
    /// Password; strength is the provider's call.
    pub password: String,
    /// Organisation or club name shown in the application.
    pub name: String,
}

/// Login request body for `POST /api/login`.
#[derive(Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Email address of an existing account.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Redirect envelope returned by the auth handlers on success.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct RedirectResponse {
    /// Path the front end should navigate to.
    pub redirect: String,
}

fn redirect_to(path: &str) -> HttpResponse {
    HttpResponse::Ok().json(RedirectResponse {
        redirect: path.to_owned(),
    })
}

fn plain_text(builder: &mut actix_web::HttpResponseBuilder, message: &str) -> HttpResponse {
    builder
        .content_type("text/plain; charset=utf-8")
        .body(message.to_owned())
}

/// Classified message for payload validation failures, matching what the
/// provider would have said about the same input.
fn validation_message(err: &CredentialValidationError) -> &'static str {
    match err {
        CredentialValidationError::EmptyEmail => "Invalid email address",
        CredentialValidationError::EmptyPassword => "You must enter a password",
    }
}

fn verification_link(state: &AppState, token: &str) -> VerificationLinkConfig {
    let mut url = state.public_url.clone();
    url.set_path("verify");
    url.set_query(Some(&format!("token={token}")));
    let url = url.to_string();
    VerificationLinkConfig {
        url: url.clone(),
        handle_code_in_app: true,
        continue_url: Some(url),
    }
}

/// Register a new account.
///
/// Creates the identity, attaches the display name, sends the verification
/// email, and writes the initial account record with a fresh trial.
#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Account created", body = RedirectResponse),
        (status = 400, description = "Classified signup error", content_type = "text/plain"),
        (status = 500, description = "Internal server error")
    ),
    tags = ["auth"],
    operation_id = "signup",
    security([])
)]
#[post("/signup")]
pub async fn signup(
    state: web::Data<AppState>,
    payload: web::Json<SignupRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let credentials = match Credentials::try_from_parts(&payload.email, &payload.password) {
        Ok(credentials) => credentials,
        Err(err) => {
            return Ok(plain_text(
                &mut HttpResponse::BadRequest(),
                validation_message(&err),
            ));
        }
    };
    let display_name = match DisplayName::new(payload.name) {
        Ok(name) => name,
        Err(err) => {
            return Ok(plain_text(
                &mut HttpResponse::BadRequest(),
                &err.to_string(),
            ));
        }
    };

    let token = Uuid::new_v4().simple().to_string();
    let link = verification_link(&state, &token);
    if let Some(message) = state
        .gateway
        .sign_up(&credentials, &display_name, Some(&link))
        .await
    {
        return Ok(plain_text(&mut HttpResponse::BadRequest(), &message));
    }

    // Signup signs the identity in; the record write is keyed by its id.
    let identity = state.gateway.current_identity().await?.ok_or_else(|| {
        Error::internal("signup completed without an active authentication state")
    })?;

    let now = state.clock.utc();
    let record = AccountRecord {
        email: identity.email.clone(),
        display_name: Some(display_name.to_string()),
        platform: state.platform,
        paid: false,
        trial_start: Some(now),
        closed: false,
        verified: false,
        verification_token: Some(token),
        token_expiration: Some(now + TimeDelta::days(VERIFICATION_TOKEN_DAYS)),
    };
    state
        .store
        .create_account(&identity.id, &record)
        .await
        .map_err(|err| {
            error!(error = %err, identity = %identity.id, "account record write failed");
            Error::internal("could not create account record")
        })?;

    Ok(redirect_to("/"))
}

/// Authenticate and admit a session.
///
/// The gateway authenticates; the admission policy then reads the account
/// record and decides between the application, the billing flow, or a
/// rejection. Rejections have already been signed out by the policy.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Admitted; body tells the front end where to go", body = RedirectResponse),
        (status = 400, description = "Classified credential error", content_type = "text/plain"),
        (status = 403, description = "Suspended or wrong platform", content_type = "text/plain"),
        (status = 404, description = "No account record", content_type = "text/plain"),
        (status = 500, description = "Error logging in")
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let credentials = match Credentials::try_from_parts(&payload.email, &payload.password) {
        Ok(credentials) => credentials,
        Err(err) => {
            return Ok(plain_text(
                &mut HttpResponse::BadRequest(),
                validation_message(&err),
            ));
        }
    };

    if let Some(message) = state.gateway.sign_in(&credentials).await {
        return Ok(plain_text(&mut HttpResponse::BadRequest(), &message));
    }

    let identity: Identity = match state.gateway.current_identity().await {
        Ok(Some(identity)) => identity,
        Ok(None) | Err(_) => {
            return Ok(plain_text(
                &mut HttpResponse::InternalServerError(),
                "Error logging in",
            ));
        }
    };

    match state.policy.admit(&identity).await {
        Ok(AdmissionDecision::Application) => {
            session.renew();
            session.persist_identity(&identity.id)?;
            Ok(redirect_to("/account"))
        }
        Ok(AdmissionDecision::Billing) => {
            session.renew();
            session.persist_identity(&identity.id)?;
            Ok(redirect_to("/payment"))
        }
        Ok(AdmissionDecision::Rejected(rejection)) => {
            let mut builder = match rejection {
                AdmissionRejection::AccountNotFound => HttpResponse::NotFound(),
                AdmissionRejection::AccountSuspended
                | AdmissionRejection::PlatformRestricted => HttpResponse::Forbidden(),
            };
            Ok(plain_text(&mut builder, rejection.message()))
        }
        Err(err) => {
            error!(error = %err, "admission policy failed");
            Ok(plain_text(
                &mut HttpResponse::InternalServerError(),
                "Error logging in",
            ))
        }
    }
}

/// Terminate the current session.
///
/// Sign-out is fire-and-forget; the response always sends the caller back
/// to the landing page.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Session terminated", body = RedirectResponse)
    ),
    tags = ["auth"],
    operation_id = "logout"
)]
#[post("/logout")]
pub async fn logout(state: web::Data<AppState>, session: SessionContext) -> HttpResponse {
    state.gateway.sign_out().await;
    session.purge();
    redirect_to("/")
}

/// Resend the verification email for the current identity.
#[utoipa::path(
    post,
    path = "/api/resend",
    responses(
        (status = 200, description = "Verification email sent"),
        (status = 401, description = "No active session", body = Error),
        (status = 500, description = "Internal server error")
    ),
    tags = ["auth"],
    operation_id = "resendVerification"
)]
#[post("/resend")]
pub async fn resend_verification(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let identity = state
        .gateway
        .current_identity()
        .await?
        .ok_or_else(|| Error::unauthorized("Unauthorized"))?;

    let token = Uuid::new_v4().simple().to_string();
    let expires_at = state.clock.utc() + TimeDelta::days(VERIFICATION_TOKEN_DAYS);
    state
        .store
        .update_verification_token(&identity.id, &token, expires_at)
        .await
        .map_err(|err| {
            error!(error = %err, identity = %identity.id, "verification token update failed");
            Error::internal("could not refresh verification token")
        })?;

    let link = verification_link(&state, &token);
    state
        .provider
        .send_verification_email(&identity.id, Some(link))
        .await
        .map_err(|err| {
            error!(error = %err, identity = %identity.id, "verification email dispatch failed");
            Error::internal("could not send verification email")
        })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Verification email sent" })))
}
