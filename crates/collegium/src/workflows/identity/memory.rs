use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::domain::{AccountStanding, AdminAccount, StaffAccount, UserAccount};
use super::repository::{
    BootstrapClaim, DirectoryError, EmailToken, PrincipalDirectory, StandingTally, TokenVault,
    UserFilter,
};
use crate::workflows::{Page, PageOf};

#[derive(Default)]
struct DirectoryState {
    users: HashMap<String, UserAccount>,
    staff: HashMap<String, StaffAccount>,
    admins: HashMap<String, AdminAccount>,
    bootstrap_complete: bool,
}

/// Directory backed by process memory. The single mutex makes the bootstrap
/// claim and the uniqueness checks atomic.
#[derive(Default)]
pub struct InMemoryDirectory {
    state: Mutex<DirectoryState>,
}

impl InMemoryDirectory {
    fn state(&self) -> Result<MutexGuard<'_, DirectoryState>, DirectoryError> {
        self.state
            .lock()
            .map_err(|_| DirectoryError::Unavailable("directory mutex poisoned".to_string()))
    }
}

fn matches_filter(account: &UserAccount, filter: &UserFilter) -> bool {
    if let Some(standing) = filter.standing {
        if account.standing != standing {
            return false;
        }
    }
    match &filter.search {
        Some(needle) if !needle.trim().is_empty() => {
            let needle = needle.trim().to_lowercase();
            account.name.full().to_lowercase().contains(&needle)
                || account.email.to_lowercase().contains(&needle)
        }
        _ => true,
    }
}

impl PrincipalDirectory for InMemoryDirectory {
    fn insert_user(&self, account: UserAccount) -> Result<UserAccount, DirectoryError> {
        let mut state = self.state()?;
        if state.users.contains_key(&account.user_id) {
            return Err(DirectoryError::Duplicate { field: "user_id" });
        }
        if state
            .users
            .values()
            .any(|existing| existing.email == account.email)
        {
            return Err(DirectoryError::Duplicate { field: "email" });
        }
        state.users.insert(account.user_id.clone(), account.clone());
        Ok(account)
    }

    fn update_user(&self, account: UserAccount) -> Result<(), DirectoryError> {
        let mut state = self.state()?;
        if !state.users.contains_key(&account.user_id) {
            return Err(DirectoryError::NotFound);
        }
        if state
            .users
            .values()
            .any(|existing| existing.email == account.email && existing.user_id != account.user_id)
        {
            return Err(DirectoryError::Duplicate { field: "email" });
        }
        state.users.insert(account.user_id.clone(), account);
        Ok(())
    }

    fn user_by_id(&self, id: &str) -> Result<Option<UserAccount>, DirectoryError> {
        Ok(self.state()?.users.get(id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<UserAccount>, DirectoryError> {
        Ok(self
            .state()?
            .users
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    fn users(
        &self,
        filter: &UserFilter,
        page: Page,
    ) -> Result<PageOf<UserAccount>, DirectoryError> {
        let state = self.state()?;
        let mut matched: Vec<UserAccount> = state
            .users
            .values()
            .filter(|account| matches_filter(account, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(PageOf::slice(matched, page))
    }

    fn standing_tally(&self) -> Result<StandingTally, DirectoryError> {
        let state = self.state()?;
        let mut tally = StandingTally::default();
        for account in state.users.values() {
            match account.standing {
                AccountStanding::Active => tally.active += 1,
                AccountStanding::Hold => tally.hold += 1,
                AccountStanding::Banned => tally.banned += 1,
            }
        }
        Ok(tally)
    }

    fn insert_staff(&self, account: StaffAccount) -> Result<StaffAccount, DirectoryError> {
        let mut state = self.state()?;
        if state.staff.contains_key(&account.staff_id) {
            return Err(DirectoryError::Duplicate { field: "staff_id" });
        }
        state
            .staff
            .insert(account.staff_id.clone(), account.clone());
        Ok(account)
    }

    fn update_staff(&self, account: StaffAccount) -> Result<(), DirectoryError> {
        let mut state = self.state()?;
        if !state.staff.contains_key(&account.staff_id) {
            return Err(DirectoryError::NotFound);
        }
        state.staff.insert(account.staff_id.clone(), account);
        Ok(())
    }

    fn staff_by_id(&self, id: &str) -> Result<Option<StaffAccount>, DirectoryError> {
        Ok(self.state()?.staff.get(id).cloned())
    }

    fn insert_admin(&self, account: AdminAccount) -> Result<AdminAccount, DirectoryError> {
        let mut state = self.state()?;
        if state.admins.contains_key(&account.admin_id) {
            return Err(DirectoryError::Duplicate { field: "admin_id" });
        }
        state
            .admins
            .insert(account.admin_id.clone(), account.clone());
        Ok(account)
    }

    fn update_admin(&self, account: AdminAccount) -> Result<(), DirectoryError> {
        let mut state = self.state()?;
        if !state.admins.contains_key(&account.admin_id) {
            return Err(DirectoryError::NotFound);
        }
        state.admins.insert(account.admin_id.clone(), account);
        Ok(())
    }

    fn admin_by_id(&self, id: &str) -> Result<Option<AdminAccount>, DirectoryError> {
        Ok(self.state()?.admins.get(id).cloned())
    }

    fn claim_bootstrap(&self, account: AdminAccount) -> Result<BootstrapClaim, DirectoryError> {
        let mut state = self.state()?;
        if state.bootstrap_complete {
            return Ok(BootstrapClaim::AlreadyCompleted);
        }
        if state.admins.contains_key(&account.admin_id) {
            return Err(DirectoryError::Duplicate { field: "admin_id" });
        }
        state
            .admins
            .insert(account.admin_id.clone(), account.clone());
        state.bootstrap_complete = true;
        Ok(BootstrapClaim::Claimed(account))
    }
}

/// Token vault backed by process memory, keyed by token value with the
/// one-per-user rule enforced on insert.
#[derive(Default)]
pub struct InMemoryTokenVault {
    tokens: Mutex<HashMap<String, EmailToken>>,
}

impl InMemoryTokenVault {
    fn tokens(&self) -> Result<MutexGuard<'_, HashMap<String, EmailToken>>, DirectoryError> {
        self.tokens
            .lock()
            .map_err(|_| DirectoryError::Unavailable("token vault mutex poisoned".to_string()))
    }
}

impl TokenVault for InMemoryTokenVault {
    fn put(&self, token: EmailToken) -> Result<(), DirectoryError> {
        let mut tokens = self.tokens()?;
        tokens.retain(|_, existing| existing.user_id != token.user_id);
        tokens.insert(token.token.clone(), token);
        Ok(())
    }

    fn find(&self, token: &str) -> Result<Option<EmailToken>, DirectoryError> {
        Ok(self.tokens()?.get(token).cloned())
    }

    fn remove(&self, token: &str) -> Result<(), DirectoryError> {
        self.tokens()?.remove(token);
        Ok(())
    }
}
