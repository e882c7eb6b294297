use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    AccountStanding, AdminAccount, PrincipalKind, PrincipalRef, PrincipalSummary, StaffAccount,
    UserAccount,
};
use crate::workflows::{Page, PageOf};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{field} already exists")]
    Duplicate { field: &'static str },
    #[error("record not found")]
    NotFound,
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Filter for the administrative user listing.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub standing: Option<AccountStanding>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StandingTally {
    pub active: usize,
    pub hold: usize,
    pub banned: usize,
}

/// Outcome of attempting to claim the one-shot bootstrap slot.
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapClaim {
    Claimed(AdminAccount),
    AlreadyCompleted,
}

/// Ephemeral email-confirmation token, at most one per user.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailToken {
    pub user_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Store boundary for the three principal collections. Implementations must
/// enforce uniqueness on ids and user emails, and make `claim_bootstrap`
/// atomic with respect to concurrent callers.
pub trait PrincipalDirectory: Send + Sync {
    fn insert_user(&self, account: UserAccount) -> Result<UserAccount, DirectoryError>;
    fn update_user(&self, account: UserAccount) -> Result<(), DirectoryError>;
    fn user_by_id(&self, id: &str) -> Result<Option<UserAccount>, DirectoryError>;
    fn user_by_email(&self, email: &str) -> Result<Option<UserAccount>, DirectoryError>;
    fn users(&self, filter: &UserFilter, page: Page) -> Result<PageOf<UserAccount>, DirectoryError>;
    fn standing_tally(&self) -> Result<StandingTally, DirectoryError>;

    fn insert_staff(&self, account: StaffAccount) -> Result<StaffAccount, DirectoryError>;
    fn update_staff(&self, account: StaffAccount) -> Result<(), DirectoryError>;
    fn staff_by_id(&self, id: &str) -> Result<Option<StaffAccount>, DirectoryError>;

    fn insert_admin(&self, account: AdminAccount) -> Result<AdminAccount, DirectoryError>;
    fn update_admin(&self, account: AdminAccount) -> Result<(), DirectoryError>;
    fn admin_by_id(&self, id: &str) -> Result<Option<AdminAccount>, DirectoryError>;

    /// Claims the bootstrap slot and creates the first admin in one step.
    /// Succeeds at most once over the lifetime of the directory, restarts
    /// included for durable implementations.
    fn claim_bootstrap(&self, account: AdminAccount) -> Result<BootstrapClaim, DirectoryError>;

    /// Per-kind dispatch for tagged references.
    fn resolve(
        &self,
        reference: &PrincipalRef,
    ) -> Result<Option<PrincipalSummary>, DirectoryError> {
        match reference.kind {
            PrincipalKind::User => Ok(self
                .user_by_id(&reference.id)?
                .map(|account| account.summary())),
            PrincipalKind::Staff => Ok(self
                .staff_by_id(&reference.id)?
                .map(|account| account.summary())),
            PrincipalKind::Admin => Ok(self
                .admin_by_id(&reference.id)?
                .map(|account| account.summary())),
        }
    }
}

/// Store boundary for email-confirmation tokens.
pub trait TokenVault: Send + Sync {
    /// Inserts the token, replacing any existing token for the same user.
    fn put(&self, token: EmailToken) -> Result<(), DirectoryError>;
    fn find(&self, token: &str) -> Result<Option<EmailToken>, DirectoryError>;
    fn remove(&self, token: &str) -> Result<(), DirectoryError>;
}
