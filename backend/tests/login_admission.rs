//! End-to-end behaviour of the signup, login, and logout endpoints over the
//! HTTP surface, with in-memory fixture adapters behind the ports.

use std::sync::Arc;

use actix_http::Request;
use actix_web::{
    body::BoxBody,
    cookie::{Key, SameSite},
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test::{self, TestRequest},
    web,
};
use chrono::{TimeDelta, Utc};
use futures_util::StreamExt;
use serde_json::{Value, json};
use url::Url;

use backend::domain::ports::{
    AccountStore, FixtureAccountStore, FixtureIdentityProvider, IdentityProvider,
};
use backend::domain::{AccountRecord, Identity, IdentityId, Platform};
use backend::inbound::http::health::HealthState;
use backend::inbound::http::state::AppState;
use backend::server::{AppDependencies, build_app};

struct Fixture {
    provider: Arc<FixtureIdentityProvider>,
    store: Arc<FixtureAccountStore>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            provider: Arc::new(FixtureIdentityProvider::new()),
            store: Arc::new(FixtureAccountStore::new()),
        }
    }

    /// Identity currently signed in at the provider, if any.
    async fn current_identity(&self) -> Option<Identity> {
        self.provider
            .auth_state_changes()
            .next()
            .await
            .expect("auth state resolves")
            .expect("no observer error")
    }
}

async fn init_app(
    fixture: &Fixture,
) -> impl Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error> {
    let app_state = AppState::new(
        fixture.provider.clone(),
        fixture.store.clone(),
        Platform::Web,
        Arc::new(mockable::DefaultClock),
        Url::parse("https://crease.example/").expect("valid base URL"),
    );
    test::init_service(build_app(AppDependencies {
        health_state: web::Data::new(HealthState::new()),
        app_state: web::Data::new(app_state),
        key: Key::generate(),
        cookie_secure: false,
        same_site: SameSite::Lax,
    }))
    .await
}

fn signup_request() -> Request {
    TestRequest::post()
        .uri("/api/signup")
        .set_json(json!({
            "email": "club@example.com",
            "password": "secret-pw",
            "name": "Village CC",
        }))
        .to_request()
}

fn login_request() -> Request {
    TestRequest::post()
        .uri("/api/login")
        .set_json(json!({
            "email": "club@example.com",
            "password": "secret-pw",
        }))
        .to_request()
}

async fn signed_up_identity(
    fixture: &Fixture,
    app: &impl Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
) -> IdentityId {
    let res = test::call_service(app, signup_request()).await;
    assert_eq!(res.status(), StatusCode::OK, "signup must succeed");
    fixture
        .current_identity()
        .await
        .expect("signup leaves the identity signed in")
        .id
}

#[actix_web::test]
async fn signup_writes_the_record_and_sends_a_verification_email() {
    let fixture = Fixture::new();
    let app = init_app(&fixture).await;

    let res = test::call_service(&app, signup_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["redirect"], "/");

    let id = fixture
        .current_identity()
        .await
        .expect("identity signed in")
        .id;
    let record = fixture
        .store
        .fetch_account(&id)
        .await
        .expect("store reachable")
        .expect("record written at signup");
    assert_eq!(record.email, "club@example.com");
    assert_eq!(record.display_name.as_deref(), Some("Village CC"));
    assert!(!record.paid);
    assert!(record.trial_start.is_some(), "trial starts at signup");
    assert!(record.verification_token.is_some());

    let sent = fixture.provider.verification_emails_sent();
    assert_eq!(sent.len(), 1);
    let link = sent[0].1.as_ref().expect("link config attached");
    assert!(link.url.starts_with("https://crease.example/verify?token="));
}

#[actix_web::test]
async fn weak_passwords_are_refused_with_the_classified_message() {
    let fixture = Fixture::new();
    let app = init_app(&fixture).await;

    let res = test::call_service(
        &app,
        TestRequest::post()
            .uri("/api/signup")
            .set_json(json!({
                "email": "club@example.com",
                "password": "short",
                "name": "Village CC",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = test::read_body(res).await;
    assert_eq!(body, "Your password must be at least 6 characters long");
    assert_eq!(fixture.provider.identity_count(), 0);
}

#[actix_web::test]
async fn active_trial_logins_are_admitted_to_the_application() {
    let fixture = Fixture::new();
    let app = init_app(&fixture).await;
    signed_up_identity(&fixture, &app).await;

    let res = test::call_service(&app, login_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(
        res.response()
            .cookies()
            .any(|cookie| cookie.name() == "session"),
        "admission must issue a session cookie",
    );
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["redirect"], "/account");
}

#[actix_web::test]
async fn lapsed_unpaid_trials_are_routed_to_billing() {
    let fixture = Fixture::new();
    let app = init_app(&fixture).await;
    let id = signed_up_identity(&fixture, &app).await;

    let stale = fixture
        .store
        .fetch_account(&id)
        .await
        .expect("store reachable")
        .expect("record written at signup");
    fixture.store.seed(
        id,
        AccountRecord {
            trial_start: Some(Utc::now() - TimeDelta::days(31)),
            ..stale
        },
    );

    let res = test::call_service(&app, login_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["redirect"], "/payment");
}

#[actix_web::test]
async fn logins_without_a_record_are_rejected_and_signed_out() {
    let fixture = Fixture::new();
    let app = init_app(&fixture).await;
    // Identity exists at the provider, but no record was ever written.
    fixture
        .provider
        .create_identity("club@example.com", "secret-pw")
        .await
        .expect("identity created");

    let res = test::call_service(&app, login_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = test::read_body(res).await;
    assert_eq!(body, "Account not found");
    assert_eq!(
        fixture.current_identity().await,
        None,
        "rejection must sign the identity back out",
    );
}

#[actix_web::test]
async fn suspended_accounts_are_refused_with_the_suspension_notice() {
    let fixture = Fixture::new();
    let app = init_app(&fixture).await;
    let id = signed_up_identity(&fixture, &app).await;

    let record = fixture
        .store
        .fetch_account(&id)
        .await
        .expect("store reachable")
        .expect("record written at signup");
    fixture.store.seed(
        id,
        AccountRecord {
            closed: true,
            ..record
        },
    );

    let res = test::call_service(&app, login_request()).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = test::read_body(res).await;
    assert!(
        body.starts_with(b"Your account has been suspended"),
        "body must carry the suspension notice",
    );
    assert_eq!(fixture.current_identity().await, None);
}

#[actix_web::test]
async fn director_accounts_cannot_use_the_web_surface() {
    let fixture = Fixture::new();
    let app = init_app(&fixture).await;
    let id = signed_up_identity(&fixture, &app).await;

    let record = fixture
        .store
        .fetch_account(&id)
        .await
        .expect("store reachable")
        .expect("record written at signup");
    fixture.store.seed(
        id,
        AccountRecord {
            platform: Platform::Director,
            ..record
        },
    );

    let res = test::call_service(&app, login_request()).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = test::read_body(res).await;
    assert_eq!(body, "Access to web app restricted");
}

#[actix_web::test]
async fn wrong_passwords_get_the_classified_credential_message() {
    let fixture = Fixture::new();
    let app = init_app(&fixture).await;
    signed_up_identity(&fixture, &app).await;

    let res = test::call_service(
        &app,
        TestRequest::post()
            .uri("/api/login")
            .set_json(json!({
                "email": "club@example.com",
                "password": "not-the-password",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = test::read_body(res).await;
    assert_eq!(body, "Incorrect email & password combination");
}

#[actix_web::test]
async fn logout_clears_the_provider_session() {
    let fixture = Fixture::new();
    let app = init_app(&fixture).await;
    signed_up_identity(&fixture, &app).await;

    let res = test::call_service(
        &app,
        TestRequest::post().uri("/api/logout").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["redirect"], "/");
    assert_eq!(fixture.current_identity().await, None);
}
