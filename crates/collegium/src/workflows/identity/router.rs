use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::AccountStanding;
use super::mailer::VerificationMailer;
use super::repository::{PrincipalDirectory, TokenVault};
use super::service::{
    AdminLoginInput, BootstrapInput, DirectoryQuery, IdentityError, IdentityService,
    ProfileUpdate, RegisterAdminInput, RegisterStaffInput, RegisterUserInput,
    ResendVerificationInput, StaffLoginInput, UserLoginInput,
};

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": self.to_string(),
        });
        (self.fault().status(), axum::Json(payload)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct StandingUpdate {
    standing: AccountStanding,
}

/// Router builder exposing the account, login, and administration endpoints.
pub fn identity_router<D, V, M>(service: Arc<IdentityService<D, V, M>>) -> Router
where
    D: PrincipalDirectory + 'static,
    V: TokenVault + 'static,
    M: VerificationMailer + 'static,
{
    Router::new()
        .route("/api/v1/auth/register", post(register_handler::<D, V, M>))
        .route("/api/v1/auth/login", post(login_handler::<D, V, M>))
        .route(
            "/api/v1/auth/verify/:token",
            get(verify_handler::<D, V, M>),
        )
        .route(
            "/api/v1/auth/resend-verification",
            post(resend_handler::<D, V, M>),
        )
        .route("/api/v1/auth/profile", put(profile_handler::<D, V, M>))
        .route("/api/v1/staff/login", post(staff_login_handler::<D, V, M>))
        .route(
            "/api/v1/staff/register",
            post(staff_register_handler::<D, V, M>),
        )
        .route("/api/v1/admin/login", post(admin_login_handler::<D, V, M>))
        .route(
            "/api/v1/admin/register",
            post(admin_register_handler::<D, V, M>),
        )
        .route(
            "/api/v1/admin/bootstrap",
            post(bootstrap_handler::<D, V, M>),
        )
        .route("/api/v1/admin/users", get(directory_handler::<D, V, M>))
        .route(
            "/api/v1/admin/users/:user_id/standing",
            put(standing_handler::<D, V, M>),
        )
        .with_state(service)
}

pub(crate) async fn register_handler<D, V, M>(
    State(service): State<Arc<IdentityService<D, V, M>>>,
    axum::Json(input): axum::Json<RegisterUserInput>,
) -> Response
where
    D: PrincipalDirectory + 'static,
    V: TokenVault + 'static,
    M: VerificationMailer + 'static,
{
    match service.register_user(input) {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn login_handler<D, V, M>(
    State(service): State<Arc<IdentityService<D, V, M>>>,
    axum::Json(input): axum::Json<UserLoginInput>,
) -> Response
where
    D: PrincipalDirectory + 'static,
    V: TokenVault + 'static,
    M: VerificationMailer + 'static,
{
    match service.login_user(input) {
        Ok(session) => (StatusCode::OK, axum::Json(session)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn verify_handler<D, V, M>(
    State(service): State<Arc<IdentityService<D, V, M>>>,
    Path(token): Path<String>,
) -> Response
where
    D: PrincipalDirectory + 'static,
    V: TokenVault + 'static,
    M: VerificationMailer + 'static,
{
    match service.verify_email(&token) {
        Ok(()) => {
            let payload = json!({
                "status": "verified",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn resend_handler<D, V, M>(
    State(service): State<Arc<IdentityService<D, V, M>>>,
    axum::Json(input): axum::Json<ResendVerificationInput>,
) -> Response
where
    D: PrincipalDirectory + 'static,
    V: TokenVault + 'static,
    M: VerificationMailer + 'static,
{
    match service.resend_verification(input) {
        Ok(()) => {
            let payload = json!({
                "status": "sent",
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn profile_handler<D, V, M>(
    State(service): State<Arc<IdentityService<D, V, M>>>,
    headers: HeaderMap,
    axum::Json(update): axum::Json<ProfileUpdate>,
) -> Response
where
    D: PrincipalDirectory + 'static,
    V: TokenVault + 'static,
    M: VerificationMailer + 'static,
{
    let result = service
        .keys()
        .authenticate(&headers)
        .map_err(IdentityError::from)
        .and_then(|actor| service.update_profile(&actor, update));
    match result {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn staff_login_handler<D, V, M>(
    State(service): State<Arc<IdentityService<D, V, M>>>,
    axum::Json(input): axum::Json<StaffLoginInput>,
) -> Response
where
    D: PrincipalDirectory + 'static,
    V: TokenVault + 'static,
    M: VerificationMailer + 'static,
{
    match service.login_staff(input) {
        Ok(session) => (StatusCode::OK, axum::Json(session)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn staff_register_handler<D, V, M>(
    State(service): State<Arc<IdentityService<D, V, M>>>,
    headers: HeaderMap,
    axum::Json(input): axum::Json<RegisterStaffInput>,
) -> Response
where
    D: PrincipalDirectory + 'static,
    V: TokenVault + 'static,
    M: VerificationMailer + 'static,
{
    let result = service
        .keys()
        .authenticate(&headers)
        .map_err(IdentityError::from)
        .and_then(|actor| service.register_staff(&actor, input));
    match result {
        Ok(summary) => (StatusCode::CREATED, axum::Json(summary)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn admin_login_handler<D, V, M>(
    State(service): State<Arc<IdentityService<D, V, M>>>,
    axum::Json(input): axum::Json<AdminLoginInput>,
) -> Response
where
    D: PrincipalDirectory + 'static,
    V: TokenVault + 'static,
    M: VerificationMailer + 'static,
{
    match service.login_admin(input) {
        Ok(session) => (StatusCode::OK, axum::Json(session)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn admin_register_handler<D, V, M>(
    State(service): State<Arc<IdentityService<D, V, M>>>,
    headers: HeaderMap,
    axum::Json(input): axum::Json<RegisterAdminInput>,
) -> Response
where
    D: PrincipalDirectory + 'static,
    V: TokenVault + 'static,
    M: VerificationMailer + 'static,
{
    let result = service
        .keys()
        .authenticate(&headers)
        .map_err(IdentityError::from)
        .and_then(|actor| service.register_admin(&actor, input));
    match result {
        Ok(summary) => (StatusCode::CREATED, axum::Json(summary)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn bootstrap_handler<D, V, M>(
    State(service): State<Arc<IdentityService<D, V, M>>>,
    axum::Json(input): axum::Json<BootstrapInput>,
) -> Response
where
    D: PrincipalDirectory + 'static,
    V: TokenVault + 'static,
    M: VerificationMailer + 'static,
{
    match service.bootstrap_admin(input) {
        Ok(session) => (StatusCode::CREATED, axum::Json(session)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn directory_handler<D, V, M>(
    State(service): State<Arc<IdentityService<D, V, M>>>,
    headers: HeaderMap,
    Query(query): Query<DirectoryQuery>,
) -> Response
where
    D: PrincipalDirectory + 'static,
    V: TokenVault + 'static,
    M: VerificationMailer + 'static,
{
    let result = service
        .keys()
        .authenticate(&headers)
        .map_err(IdentityError::from)
        .and_then(|actor| service.user_directory(&actor, query));
    match result {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn standing_handler<D, V, M>(
    State(service): State<Arc<IdentityService<D, V, M>>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    axum::Json(update): axum::Json<StandingUpdate>,
) -> Response
where
    D: PrincipalDirectory + 'static,
    V: TokenVault + 'static,
    M: VerificationMailer + 'static,
{
    let result = service
        .keys()
        .authenticate(&headers)
        .map_err(IdentityError::from)
        .and_then(|actor| service.set_user_standing(&actor, &user_id, update.standing));
    match result {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(error) => error.into_response(),
    }
}
