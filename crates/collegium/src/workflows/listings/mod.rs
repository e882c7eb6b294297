//! College submissions, moderation, and the public catalogue.
//!
//! Every college record travels with a 1:1 review ticket. The ticket's
//! status gates public visibility (Approved only), owner edits send a
//! record back to Pending with reviewer traces cleared, and a revision
//! counter on the ticket anchors optimistic concurrency for edits and
//! verdicts. Reviewers work a paginated Pending queue; admins read a
//! tally-plus-activity dashboard.

pub mod access;
pub mod domain;
pub mod memory;
pub mod repository;
pub mod router;
pub mod search;
pub mod service;
pub mod validate;

#[cfg(test)]
mod tests;

pub use access::{
    allowed, ListingAction, DASHBOARD_ROLES, OWN_SUBMISSION_ROLES, REVIEW_ROLES, SUBMIT_ROLES,
};
pub use domain::{
    Address, CollegeChanges, CollegeDraft, CollegeId, CollegeRecord, Course, ModerationDecision,
    ReviewStatus, ReviewTicket,
};
pub use memory::InMemoryListingStore;
pub use repository::{ListingStore, StatusTally, StoreError};
pub use router::listing_router;
pub use search::{search_approved, SearchHit, PLACEHOLDER_IMAGE, SEARCH_LIMIT};
pub use service::{
    ActivityEntry, ActivityReport, CollegeCard, ListingError, ListingService, ModerationInput,
    MySubmissionView, QueueEntry, SubmissionView,
};
pub use validate::ValidationError;
