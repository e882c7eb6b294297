//! Principals, credentials, and access tokens.
//!
//! Three account stores (users, staff, admins) sit behind one directory
//! trait with per-kind dispatch for tagged references. Credentials are
//! bcrypt hashes, email ownership is proven through single-use mailed
//! tokens, and logins issue HS256 bearer tokens carrying the
//! `{sub, kind, role}` triple the other workflows trust.

pub mod domain;
pub mod mailer;
pub mod memory;
pub(crate) mod password;
pub mod repository;
pub mod router;
pub mod service;
pub mod token;

#[cfg(test)]
mod tests;

pub use domain::{
    email_shape_ok, role_set_valid, AccountStanding, AdminAccount, EmailVerification, PersonName,
    PrincipalKind, PrincipalRef, PrincipalSummary, Role, StaffAccount, UserAccount,
};
pub use mailer::{ConsoleMailer, MailerError, VerificationMailer};
pub use memory::{InMemoryDirectory, InMemoryTokenVault};
pub use repository::{
    BootstrapClaim, DirectoryError, EmailToken, PrincipalDirectory, StandingTally, TokenVault,
    UserFilter,
};
pub use router::identity_router;
pub use service::{
    AdminLoginInput, BootstrapInput, DirectoryQuery, IdentityError, IdentityService,
    ProfileUpdate, RegisterAdminInput, RegisterStaffInput, RegisterUserInput,
    RegistrationReceipt, ResendVerificationInput, SessionView, StaffLoginInput,
    UserDirectoryView, UserLoginInput, UserOverview,
};
pub use token::{AccessClaims, AuthPrincipal, TokenError, TokenKeys};
