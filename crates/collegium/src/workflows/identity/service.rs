use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::domain::{
    email_shape_ok, role_set_valid, AccountStanding, AdminAccount, EmailVerification, PersonName,
    PrincipalKind, PrincipalRef, PrincipalSummary, Role, StaffAccount, UserAccount,
};
use super::mailer::{MailerError, VerificationMailer};
use super::password::{hash_password, verify_password};
use super::repository::{
    BootstrapClaim, DirectoryError, EmailToken, PrincipalDirectory, StandingTally, TokenVault,
    UserFilter,
};
use super::token::{AuthPrincipal, TokenError, TokenKeys};
use crate::workflows::{Fault, Page, PageOf};

/// Free mail providers refused for institution accounts. An institution is
/// expected to register under its own domain.
const PUBLIC_MAIL_DOMAINS: [&str; 8] = [
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "aol.com",
    "icloud.com",
    "protonmail.com",
    "mail.com",
];

const EMAIL_TOKEN_TTL_HOURS: i64 = 24;
const DIRECTORY_PAGE_SIZE: usize = 10;

/// Service composing the principal directory, the email-token vault, and the
/// mailer boundary. Issues access tokens on successful logins.
pub struct IdentityService<D, V, M> {
    directory: Arc<D>,
    vault: Arc<V>,
    mailer: Arc<M>,
    keys: TokenKeys,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserLoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResendVerificationInput {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaffLoginInput {
    pub staff_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminLoginInput {
    pub admin_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapInput {
    pub admin_id: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterStaffInput {
    pub staff_id: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    #[serde(default)]
    pub roles: Option<Vec<Role>>,
    #[serde(default)]
    pub primary_role: Option<Role>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterAdminInput {
    pub admin_id: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    #[serde(default)]
    pub roles: Option<Vec<Role>>,
    #[serde(default)]
    pub primary_role: Option<Role>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryQuery {
    #[serde(default)]
    pub standing: Option<AccountStanding>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationReceipt {
    pub user_id: String,
    pub email: String,
}

/// Login result: the signed token plus the principal it authenticates.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub token: String,
    pub principal: PrincipalSummary,
}

/// Directory row shown to administrators.
#[derive(Debug, Clone, Serialize)]
pub struct UserOverview {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub primary_role: Role,
    pub email_status: EmailVerification,
    pub standing: AccountStanding,
    pub created_at: DateTime<Utc>,
}

impl From<UserAccount> for UserOverview {
    fn from(account: UserAccount) -> Self {
        Self {
            user_id: account.user_id,
            name: account.name.full(),
            email: account.email,
            primary_role: account.primary_role,
            email_status: account.email_status,
            standing: account.standing,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDirectoryView {
    pub tally: StandingTally,
    pub users: PageOf<UserOverview>,
}

impl<D, V, M> IdentityService<D, V, M>
where
    D: PrincipalDirectory + 'static,
    V: TokenVault + 'static,
    M: VerificationMailer + 'static,
{
    pub fn new(directory: Arc<D>, vault: Arc<V>, mailer: Arc<M>, keys: TokenKeys) -> Self {
        Self {
            directory,
            vault,
            mailer,
            keys,
        }
    }

    /// Signing material shared with the routers for bearer authentication.
    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    /// Register a user or institution account and mail a verification token.
    /// No access token is issued until the address is verified.
    pub fn register_user(
        &self,
        input: RegisterUserInput,
    ) -> Result<RegistrationReceipt, IdentityError> {
        let role = input.role.unwrap_or(Role::Users);
        if role.kind() != PrincipalKind::User {
            return Err(IdentityError::Invalid {
                field: "role",
                message: "only user roles may self-register",
            });
        }

        let name = validated_name(&input.first_name, &input.last_name)?;
        let email = normalized_email(&input.email)?;
        let password = validated_password(&input.password)?;

        if role == Role::Institutions && has_public_mail_domain(&email) {
            return Err(IdentityError::Invalid {
                field: "email",
                message: "institution accounts require an institutional mail domain",
            });
        }

        let now = Utc::now();
        let account = self.directory.insert_user(UserAccount {
            user_id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash: hash_password(password)?,
            roles: vec![role],
            primary_role: role,
            email_status: EmailVerification::Pending,
            standing: AccountStanding::Active,
            created_at: now,
            updated_at: now,
        })?;

        self.issue_email_token(&account)?;
        info!(user_id = %account.user_id, role = role.label(), "user account registered");

        Ok(RegistrationReceipt {
            user_id: account.user_id,
            email: account.email,
        })
    }

    /// Redeem a verification token. Tokens are single-use and expire after
    /// 24 hours; expired and already-redeemed ones are removed on contact.
    pub fn verify_email(&self, token: &str) -> Result<(), IdentityError> {
        let Some(record) = self.vault.find(token)? else {
            return Err(IdentityError::NotFound);
        };

        if record.expires_at < Utc::now() {
            self.vault.remove(token)?;
            return Err(IdentityError::Invalid {
                field: "token",
                message: "verification link expired, request a new one",
            });
        }

        let Some(mut account) = self.directory.user_by_id(&record.user_id)? else {
            self.vault.remove(token)?;
            return Err(IdentityError::NotFound);
        };

        if account.email_status == EmailVerification::Verified {
            self.vault.remove(token)?;
            return Err(IdentityError::Invalid {
                field: "token",
                message: "email already verified",
            });
        }

        account.email_status = EmailVerification::Verified;
        account.updated_at = Utc::now();
        self.directory.update_user(account)?;
        self.vault.remove(token)?;
        Ok(())
    }

    /// Mint a fresh verification token, replacing any outstanding one.
    pub fn resend_verification(
        &self,
        input: ResendVerificationInput,
    ) -> Result<(), IdentityError> {
        let email = normalized_email(&input.email)?;
        let Some(account) = self.directory.user_by_email(&email)? else {
            return Err(IdentityError::NotFound);
        };
        if account.email_status == EmailVerification::Verified {
            return Err(IdentityError::Invalid {
                field: "email",
                message: "email already verified",
            });
        }
        self.issue_email_token(&account)
    }

    /// Authenticate a user account. Pending verification and non-Active
    /// standing are refused after the credential check, with distinct reasons.
    pub fn login_user(&self, input: UserLoginInput) -> Result<SessionView, IdentityError> {
        let email = input.email.trim().to_lowercase();
        let Some(account) = self.directory.user_by_email(&email)? else {
            return Err(IdentityError::Unauthorized);
        };
        if !verify_password(&input.password, &account.password_hash) {
            return Err(IdentityError::Unauthorized);
        }
        if account.email_status == EmailVerification::Pending {
            return Err(IdentityError::Forbidden("email not verified".to_string()));
        }
        match account.standing {
            AccountStanding::Active => {}
            AccountStanding::Hold => {
                return Err(IdentityError::Forbidden(
                    "account on hold pending review".to_string(),
                ));
            }
            AccountStanding::Banned => {
                return Err(IdentityError::Forbidden("account banned".to_string()));
            }
        }
        self.open_session(account.summary())
    }

    pub fn login_staff(&self, input: StaffLoginInput) -> Result<SessionView, IdentityError> {
        let Some(account) = self.directory.staff_by_id(input.staff_id.trim())? else {
            return Err(IdentityError::Unauthorized);
        };
        if !verify_password(&input.password, &account.password_hash) {
            return Err(IdentityError::Unauthorized);
        }
        self.open_session(account.summary())
    }

    pub fn login_admin(&self, input: AdminLoginInput) -> Result<SessionView, IdentityError> {
        let Some(account) = self.directory.admin_by_id(input.admin_id.trim())? else {
            return Err(IdentityError::Unauthorized);
        };
        if !verify_password(&input.password, &account.password_hash) {
            return Err(IdentityError::Unauthorized);
        }
        self.open_session(account.summary())
    }

    /// Create the very first admin account. The claim is atomic in the
    /// directory, so exactly one caller ever succeeds; everyone after gets
    /// Forbidden.
    pub fn bootstrap_admin(&self, input: BootstrapInput) -> Result<SessionView, IdentityError> {
        let admin_id = validated_principal_id(&input.admin_id, "admin_id")?;
        let name = validated_name(&input.first_name, &input.last_name)?;
        let password = validated_password(&input.password)?;

        let now = Utc::now();
        let claim = self.directory.claim_bootstrap(AdminAccount {
            admin_id,
            name,
            password_hash: hash_password(password)?,
            roles: vec![Role::Admin],
            primary_role: Role::Admin,
            created_at: now,
            updated_at: now,
        })?;

        match claim {
            BootstrapClaim::Claimed(account) => {
                info!(admin_id = %account.admin_id, "admin bootstrap claimed");
                self.open_session(account.summary())
            }
            BootstrapClaim::AlreadyCompleted => Err(IdentityError::Forbidden(
                "admin bootstrap already completed".to_string(),
            )),
        }
    }

    /// Provision a staff account. Requires the Admin primary role.
    pub fn register_staff(
        &self,
        actor: &AuthPrincipal,
        input: RegisterStaffInput,
    ) -> Result<PrincipalSummary, IdentityError> {
        require_admin(actor)?;

        let staff_id = validated_principal_id(&input.staff_id, "staff_id")?;
        let name = validated_name(&input.first_name, &input.last_name)?;
        let password = validated_password(&input.password)?;
        let (roles, primary_role) =
            validated_role_set(PrincipalKind::Staff, input.roles, input.primary_role, Role::Staff)?;

        let now = Utc::now();
        let account = self.directory.insert_staff(StaffAccount {
            staff_id,
            name,
            password_hash: hash_password(password)?,
            roles,
            primary_role,
            created_at: now,
            updated_at: now,
        })?;

        info!(staff_id = %account.staff_id, by = %actor.id, "staff account registered");
        Ok(account.summary())
    }

    /// Provision a further admin account. Requires the Admin primary role;
    /// new accounts default to Co-Admin.
    pub fn register_admin(
        &self,
        actor: &AuthPrincipal,
        input: RegisterAdminInput,
    ) -> Result<PrincipalSummary, IdentityError> {
        require_admin(actor)?;

        let admin_id = validated_principal_id(&input.admin_id, "admin_id")?;
        let name = validated_name(&input.first_name, &input.last_name)?;
        let password = validated_password(&input.password)?;
        let (roles, primary_role) = validated_role_set(
            PrincipalKind::Admin,
            input.roles,
            input.primary_role,
            Role::CoAdmin,
        )?;

        let now = Utc::now();
        let account = self.directory.insert_admin(AdminAccount {
            admin_id,
            name,
            password_hash: hash_password(password)?,
            roles,
            primary_role,
            created_at: now,
            updated_at: now,
        })?;

        info!(admin_id = %account.admin_id, by = %actor.id, "admin account registered");
        Ok(account.summary())
    }

    /// Update the caller's own name or password, whichever kind of account
    /// they hold.
    pub fn update_profile(
        &self,
        actor: &AuthPrincipal,
        update: ProfileUpdate,
    ) -> Result<PrincipalSummary, IdentityError> {
        let password_hash = match update.password.as_deref() {
            Some(raw) => Some(hash_password(validated_password(raw)?)?),
            None => None,
        };

        match actor.kind {
            PrincipalKind::User => {
                let Some(mut account) = self.directory.user_by_id(&actor.id)? else {
                    return Err(IdentityError::NotFound);
                };
                account.name =
                    updated_name(account.name, &update.first_name, &update.last_name)?;
                if let Some(hash) = password_hash {
                    account.password_hash = hash;
                }
                account.updated_at = Utc::now();
                let summary = account.summary();
                self.directory.update_user(account)?;
                Ok(summary)
            }
            PrincipalKind::Staff => {
                let Some(mut account) = self.directory.staff_by_id(&actor.id)? else {
                    return Err(IdentityError::NotFound);
                };
                account.name =
                    updated_name(account.name, &update.first_name, &update.last_name)?;
                if let Some(hash) = password_hash {
                    account.password_hash = hash;
                }
                account.updated_at = Utc::now();
                let summary = account.summary();
                self.directory.update_staff(account)?;
                Ok(summary)
            }
            PrincipalKind::Admin => {
                let Some(mut account) = self.directory.admin_by_id(&actor.id)? else {
                    return Err(IdentityError::NotFound);
                };
                account.name =
                    updated_name(account.name, &update.first_name, &update.last_name)?;
                if let Some(hash) = password_hash {
                    account.password_hash = hash;
                }
                account.updated_at = Utc::now();
                let summary = account.summary();
                self.directory.update_admin(account)?;
                Ok(summary)
            }
        }
    }

    /// Place a user account on hold, ban it, or restore it. Admin roles only.
    pub fn set_user_standing(
        &self,
        actor: &AuthPrincipal,
        user_id: &str,
        standing: AccountStanding,
    ) -> Result<UserOverview, IdentityError> {
        require_dashboard(actor)?;

        let Some(mut account) = self.directory.user_by_id(user_id)? else {
            return Err(IdentityError::NotFound);
        };
        account.standing = standing;
        account.updated_at = Utc::now();
        self.directory.update_user(account.clone())?;

        info!(%user_id, standing = standing.label(), by = %actor.id, "user standing changed");
        Ok(UserOverview::from(account))
    }

    /// Administrative user listing with standing tallies, an optional
    /// standing filter, and case-insensitive name/email search.
    pub fn user_directory(
        &self,
        actor: &AuthPrincipal,
        query: DirectoryQuery,
    ) -> Result<UserDirectoryView, IdentityError> {
        require_dashboard(actor)?;

        let filter = UserFilter {
            standing: query.standing,
            search: query.q,
        };
        let page = Page::of_size(query.page, DIRECTORY_PAGE_SIZE);
        let users = self
            .directory
            .users(&filter, page)?
            .map(UserOverview::from);
        let tally = self.directory.standing_tally()?;

        Ok(UserDirectoryView { tally, users })
    }

    /// Display lookup for a tagged reference.
    pub fn resolve(
        &self,
        reference: &PrincipalRef,
    ) -> Result<Option<PrincipalSummary>, IdentityError> {
        Ok(self.directory.resolve(reference)?)
    }

    fn issue_email_token(&self, account: &UserAccount) -> Result<(), IdentityError> {
        let token = EmailToken {
            user_id: account.user_id.clone(),
            token: Uuid::new_v4().to_string(),
            expires_at: Utc::now() + Duration::hours(EMAIL_TOKEN_TTL_HOURS),
        };
        self.vault.put(token.clone())?;
        self.mailer.send_verification(&account.email, &token.token)?;
        Ok(())
    }

    fn open_session(&self, summary: PrincipalSummary) -> Result<SessionView, IdentityError> {
        let principal = AuthPrincipal {
            id: summary.id.clone(),
            kind: summary.kind,
            role: summary.primary_role,
        };
        let token = self.keys.issue(&principal)?;
        Ok(SessionView {
            token,
            principal: summary,
        })
    }
}

fn require_admin(actor: &AuthPrincipal) -> Result<(), IdentityError> {
    if actor.role == Role::Admin {
        Ok(())
    } else {
        Err(IdentityError::Forbidden(
            "admin primary role required".to_string(),
        ))
    }
}

fn require_dashboard(actor: &AuthPrincipal) -> Result<(), IdentityError> {
    if matches!(actor.role, Role::Admin | Role::CoAdmin) {
        Ok(())
    } else {
        Err(IdentityError::Forbidden(
            "admin roles required".to_string(),
        ))
    }
}

fn validated_name(first: &str, last: &str) -> Result<PersonName, IdentityError> {
    let first = first.trim();
    let last = last.trim();
    if first.chars().count() < 2 || last.chars().count() < 2 {
        return Err(IdentityError::Invalid {
            field: "name",
            message: "first and last name must each be at least 2 characters",
        });
    }
    Ok(PersonName {
        first: first.to_string(),
        last: last.to_string(),
    })
}

fn updated_name(
    current: PersonName,
    first: &Option<String>,
    last: &Option<String>,
) -> Result<PersonName, IdentityError> {
    match (first, last) {
        (None, None) => Ok(current),
        _ => validated_name(
            first.as_deref().unwrap_or(&current.first),
            last.as_deref().unwrap_or(&current.last),
        ),
    }
}

fn normalized_email(raw: &str) -> Result<String, IdentityError> {
    let email = raw.trim().to_lowercase();
    if email_shape_ok(&email) {
        Ok(email)
    } else {
        Err(IdentityError::Invalid {
            field: "email",
            message: "not a valid email address",
        })
    }
}

fn validated_password(raw: &str) -> Result<&str, IdentityError> {
    if raw.chars().count() < 8 {
        return Err(IdentityError::Invalid {
            field: "password",
            message: "password must be at least 8 characters",
        });
    }
    Ok(raw)
}

fn validated_principal_id(raw: &str, field: &'static str) -> Result<String, IdentityError> {
    let id = raw.trim();
    if id.chars().count() < 4 {
        return Err(IdentityError::Invalid {
            field,
            message: "identifier must be at least 4 characters",
        });
    }
    Ok(id.to_string())
}

fn validated_role_set(
    kind: PrincipalKind,
    roles: Option<Vec<Role>>,
    primary: Option<Role>,
    default_role: Role,
) -> Result<(Vec<Role>, Role), IdentityError> {
    let roles = roles.unwrap_or_else(|| vec![default_role]);
    let primary = match primary {
        Some(role) => role,
        None => *roles.first().ok_or(IdentityError::Invalid {
            field: "roles",
            message: "at least one role is required",
        })?,
    };
    if !role_set_valid(kind, &roles, primary) {
        return Err(IdentityError::Invalid {
            field: "roles",
            message: "roles must match the account kind and include the primary role",
        });
    }
    Ok((roles, primary))
}

fn has_public_mail_domain(email: &str) -> bool {
    email
        .rsplit_once('@')
        .is_some_and(|(_, domain)| PUBLIC_MAIL_DOMAINS.contains(&domain))
}

/// Error raised by the identity service.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: &'static str,
    },
    #[error("{field} already registered")]
    Duplicate { field: &'static str },
    #[error("account not found")]
    NotFound,
    #[error("invalid credentials")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("identity store unavailable: {0}")]
    Upstream(String),
}

impl IdentityError {
    pub fn fault(&self) -> Fault {
        match self {
            Self::Invalid { .. } => Fault::Validation,
            Self::Duplicate { .. } => Fault::Conflict,
            Self::NotFound => Fault::NotFound,
            Self::Unauthorized => Fault::Unauthorized,
            Self::Forbidden(_) => Fault::Forbidden,
            Self::Upstream(_) => Fault::Upstream,
        }
    }
}

impl From<DirectoryError> for IdentityError {
    fn from(error: DirectoryError) -> Self {
        match error {
            DirectoryError::Duplicate { field } => Self::Duplicate { field },
            DirectoryError::NotFound => Self::NotFound,
            DirectoryError::Unavailable(message) => Self::Upstream(message),
        }
    }
}

impl From<MailerError> for IdentityError {
    fn from(error: MailerError) -> Self {
        Self::Upstream(error.to_string())
    }
}

impl From<TokenError> for IdentityError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Missing | TokenError::Invalid => Self::Unauthorized,
            TokenError::Signing => Self::Upstream("token signing failed".to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for IdentityError {
    fn from(error: bcrypt::BcryptError) -> Self {
        Self::Upstream(error.to_string())
    }
}
