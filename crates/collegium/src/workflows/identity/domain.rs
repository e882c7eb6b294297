use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three principal stores. A reference is only meaningful together with
/// its kind, since ids are unique per store rather than globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    User,
    Staff,
    Admin,
}

impl PrincipalKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Staff => "Staff",
            Self::Admin => "Admin",
        }
    }

    /// Roles a principal of this kind may hold.
    pub const fn allowed_roles(self) -> [Role; 2] {
        match self {
            Self::User => [Role::Users, Role::Institutions],
            Self::Staff => [Role::Staff, Role::Agents],
            Self::Admin => [Role::CoAdmin, Role::Admin],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Users,
    Institutions,
    Staff,
    Agents,
    CoAdmin,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Users => "Users",
            Self::Institutions => "Institutions",
            Self::Staff => "Staff",
            Self::Agents => "Agents",
            Self::CoAdmin => "Co-Admin",
            Self::Admin => "Admin",
        }
    }

    pub const fn kind(self) -> PrincipalKind {
        match self {
            Self::Users | Self::Institutions => PrincipalKind::User,
            Self::Staff | Self::Agents => PrincipalKind::Staff,
            Self::CoAdmin | Self::Admin => PrincipalKind::Admin,
        }
    }
}

/// Checks the role-set invariant: non-empty, every role drawn from the
/// kind's allowed subset, and the primary role contained in the set.
pub fn role_set_valid(kind: PrincipalKind, roles: &[Role], primary: Role) -> bool {
    !roles.is_empty()
        && roles.iter().all(|role| role.kind() == kind)
        && roles.contains(&primary)
}

/// Tagged reference to a principal, resolved through the directory's
/// per-kind dispatch rather than string comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalRef {
    pub kind: PrincipalKind,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub first: String,
    pub last: String,
}

impl PersonName {
    pub fn full(&self) -> String {
        format!("{} {}", self.first, self.last)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailVerification {
    Pending,
    Verified,
}

impl EmailVerification {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Verified => "Verified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStanding {
    Active,
    Hold,
    Banned,
}

impl AccountStanding {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Hold => "Hold",
            Self::Banned => "Banned",
        }
    }
}

/// Self-registered account: end users and institutions.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub user_id: String,
    pub name: PersonName,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub primary_role: Role,
    pub email_status: EmailVerification,
    pub standing: AccountStanding,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn summary(&self) -> PrincipalSummary {
        PrincipalSummary {
            id: self.user_id.clone(),
            kind: PrincipalKind::User,
            name: self.name.full(),
            primary_role: self.primary_role,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaffAccount {
    pub staff_id: String,
    pub name: PersonName,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub primary_role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StaffAccount {
    pub fn summary(&self) -> PrincipalSummary {
        PrincipalSummary {
            id: self.staff_id.clone(),
            kind: PrincipalKind::Staff,
            name: self.name.full(),
            primary_role: self.primary_role,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminAccount {
    pub admin_id: String,
    pub name: PersonName,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub primary_role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminAccount {
    pub fn summary(&self) -> PrincipalSummary {
        PrincipalSummary {
            id: self.admin_id.clone(),
            kind: PrincipalKind::Admin,
            name: self.name.full(),
            primary_role: self.primary_role,
        }
    }
}

/// Display projection of any principal, regardless of kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrincipalSummary {
    pub id: String,
    pub kind: PrincipalKind,
    pub name: String,
    pub primary_role: Role,
}

/// Shape check shared by account registration and listing contact fields:
/// something before the @, a dot somewhere in the domain, no whitespace.
pub fn email_shape_ok(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    match domain.split_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_sets_are_validated_per_kind() {
        assert!(role_set_valid(
            PrincipalKind::User,
            &[Role::Users, Role::Institutions],
            Role::Users
        ));
        assert!(!role_set_valid(PrincipalKind::User, &[], Role::Users));
        assert!(!role_set_valid(
            PrincipalKind::User,
            &[Role::Staff],
            Role::Staff
        ));
        assert!(!role_set_valid(
            PrincipalKind::Staff,
            &[Role::Staff],
            Role::Agents
        ));
        assert!(role_set_valid(
            PrincipalKind::Admin,
            &[Role::CoAdmin, Role::Admin],
            Role::Admin
        ));
    }

    #[test]
    fn email_shapes() {
        assert!(email_shape_ok("dean@alpha.edu"));
        assert!(email_shape_ok("a.b@sub.domain.org"));
        assert!(!email_shape_ok("no-at-sign.edu"));
        assert!(!email_shape_ok("@alpha.edu"));
        assert!(!email_shape_ok("dean@alpha"));
        assert!(!email_shape_ok("dean@.edu"));
        assert!(!email_shape_ok("dean @alpha.edu"));
        assert!(!email_shape_ok(""));
    }
}
