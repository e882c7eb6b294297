use crate::workflows::identity::Role;
use crate::workflows::listings::access::{allowed, ListingAction};

#[test]
fn submit_covers_every_content_role() {
    for role in [
        Role::Institutions,
        Role::Agents,
        Role::Staff,
        Role::Admin,
        Role::CoAdmin,
    ] {
        assert!(allowed(role, ListingAction::Submit), "{role:?} may submit");
    }
    assert!(!allowed(Role::Users, ListingAction::Submit));
}

#[test]
fn review_excludes_end_users_and_institutions() {
    for role in [Role::Staff, Role::Agents, Role::Admin, Role::CoAdmin] {
        assert!(allowed(role, ListingAction::Review), "{role:?} may review");
    }
    assert!(!allowed(Role::Users, ListingAction::Review));
    assert!(!allowed(Role::Institutions, ListingAction::Review));
}

#[test]
fn own_submission_history_is_for_submitting_principals() {
    assert!(allowed(Role::Agents, ListingAction::OwnSubmissions));
    assert!(allowed(Role::Institutions, ListingAction::OwnSubmissions));
    for role in [Role::Users, Role::Staff, Role::Admin, Role::CoAdmin] {
        assert!(
            !allowed(role, ListingAction::OwnSubmissions),
            "{role:?} has no submission history view"
        );
    }
}

#[test]
fn dashboard_is_admin_only() {
    assert!(allowed(Role::Admin, ListingAction::Dashboard));
    assert!(allowed(Role::CoAdmin, ListingAction::Dashboard));
    for role in [Role::Users, Role::Institutions, Role::Staff, Role::Agents] {
        assert!(!allowed(role, ListingAction::Dashboard), "{role:?} is out");
    }
}
