use crate::workflows::identity::Role;

/// Roles allowed to submit new colleges and edit their own.
pub const SUBMIT_ROLES: [Role; 5] = [
    Role::Institutions,
    Role::Agents,
    Role::Staff,
    Role::Admin,
    Role::CoAdmin,
];

/// Roles allowed to work the review queue and moderate submissions.
pub const REVIEW_ROLES: [Role; 4] = [Role::Staff, Role::Agents, Role::Admin, Role::CoAdmin];

/// Roles with a personal submission history worth listing.
pub const OWN_SUBMISSION_ROLES: [Role; 2] = [Role::Agents, Role::Institutions];

/// Roles allowed to read the activity dashboard.
pub const DASHBOARD_ROLES: [Role; 2] = [Role::Admin, Role::CoAdmin];

/// The guarded entry points of the listings workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingAction {
    Submit,
    Review,
    OwnSubmissions,
    Dashboard,
}

pub fn allowed(role: Role, action: ListingAction) -> bool {
    let roles: &[Role] = match action {
        ListingAction::Submit => &SUBMIT_ROLES,
        ListingAction::Review => &REVIEW_ROLES,
        ListingAction::OwnSubmissions => &OWN_SUBMISSION_ROLES,
        ListingAction::Dashboard => &DASHBOARD_ROLES,
    };
    roles.contains(&role)
}
