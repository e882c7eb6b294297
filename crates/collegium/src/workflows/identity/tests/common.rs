use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::config::AuthConfig;
use crate::workflows::identity::mailer::{MailerError, VerificationMailer};
use crate::workflows::identity::memory::{InMemoryDirectory, InMemoryTokenVault};
use crate::workflows::identity::service::{
    BootstrapInput, IdentityService, RegisterUserInput, SessionView,
};
use crate::workflows::identity::token::{AuthPrincipal, TokenKeys};
use crate::workflows::identity::{identity_router, PrincipalKind, Role};

pub(super) type TestIdentityService =
    IdentityService<InMemoryDirectory, InMemoryTokenVault, RecordingMailer>;

pub(super) fn test_keys() -> TokenKeys {
    TokenKeys::new(&AuthConfig {
        token_secret: "unit-test-secret".to_string(),
        token_ttl_minutes: 60,
    })
}

/// Captures outgoing verification mail so tests can redeem the tokens.
#[derive(Default)]
pub(super) struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub(super) fn last_token(&self) -> Option<String> {
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .last()
            .map(|(_, token)| token.clone())
    }

    pub(super) fn sent_count(&self) -> usize {
        self.sent.lock().expect("mailer mutex poisoned").len()
    }
}

impl VerificationMailer for RecordingMailer {
    fn send_verification(&self, email: &str, token: &str) -> Result<(), MailerError> {
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push((email.to_string(), token.to_string()));
        Ok(())
    }
}

pub(super) struct FailingMailer;

impl VerificationMailer for FailingMailer {
    fn send_verification(&self, _email: &str, _token: &str) -> Result<(), MailerError> {
        Err(MailerError("smtp relay offline".to_string()))
    }
}

pub(super) fn build_identity() -> (
    TestIdentityService,
    Arc<InMemoryDirectory>,
    Arc<InMemoryTokenVault>,
    Arc<RecordingMailer>,
) {
    let directory = Arc::new(InMemoryDirectory::default());
    let vault = Arc::new(InMemoryTokenVault::default());
    let mailer = Arc::new(RecordingMailer::default());
    let service = IdentityService::new(
        directory.clone(),
        vault.clone(),
        mailer.clone(),
        test_keys(),
    );
    (service, directory, vault, mailer)
}

pub(super) fn register_input(email: &str) -> RegisterUserInput {
    RegisterUserInput {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: email.to_string(),
        password: "supersecret".to_string(),
        role: None,
    }
}

pub(super) fn institution_input(email: &str) -> RegisterUserInput {
    RegisterUserInput {
        role: Some(Role::Institutions),
        ..register_input(email)
    }
}

pub(super) fn bootstrap_input() -> BootstrapInput {
    BootstrapInput {
        admin_id: "root-admin".to_string(),
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        password: "correct-horse-battery".to_string(),
    }
}

/// Register and verify an account, returning its user id.
pub(super) fn registered_verified_user(
    service: &TestIdentityService,
    mailer: &RecordingMailer,
    email: &str,
) -> String {
    let receipt = service
        .register_user(register_input(email))
        .expect("registration succeeds");
    let token = mailer.last_token().expect("verification mail sent");
    service.verify_email(&token).expect("verification succeeds");
    receipt.user_id
}

pub(super) fn admin_session(service: &TestIdentityService) -> SessionView {
    service
        .bootstrap_admin(bootstrap_input())
        .expect("bootstrap succeeds")
}

pub(super) fn principal(id: &str, kind: PrincipalKind, role: Role) -> AuthPrincipal {
    AuthPrincipal {
        id: id.to_string(),
        kind,
        role,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn identity_router_with_service(service: TestIdentityService) -> axum::Router {
    identity_router(Arc::new(service))
}
