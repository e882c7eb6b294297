use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{CollegeId, CollegeRecord, ReviewTicket};
use crate::workflows::identity::PrincipalRef;

/// Count of tickets per review state, for the moderation dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTally {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

/// Persistence seam for college records and their review tickets.
///
/// The two always travel together under one [`CollegeId`]; the paired
/// operations keep a backend from ever holding one without the other.
/// Listing methods return fully sorted snapshots so callers can slice
/// pages without re-sorting.
pub trait ListingStore: Send + Sync {
    /// Insert a fresh submission. Fails with [`StoreError::Conflict`] if
    /// either half already exists under the id.
    fn create_pair(
        &self,
        record: CollegeRecord,
        ticket: ReviewTicket,
    ) -> Result<(), StoreError>;

    /// Replace both halves of an existing pair.
    fn update_pair(
        &self,
        record: CollegeRecord,
        ticket: ReviewTicket,
    ) -> Result<(), StoreError>;

    /// Replace the ticket alone, used by moderation which never touches
    /// the content payload.
    fn update_ticket(&self, ticket: ReviewTicket) -> Result<(), StoreError>;

    /// Remove the pair, returning what was removed so the caller can
    /// release attached media.
    fn delete_pair(&self, id: &CollegeId) -> Result<(CollegeRecord, ReviewTicket), StoreError>;

    fn pair(&self, id: &CollegeId) -> Result<Option<(CollegeRecord, ReviewTicket)>, StoreError>;

    /// Pending submissions, newest first.
    fn pending(&self) -> Result<Vec<(CollegeRecord, ReviewTicket)>, StoreError>;

    /// Everything a given principal has submitted, newest first.
    fn by_submitter(
        &self,
        submitter: &PrincipalRef,
    ) -> Result<Vec<(CollegeRecord, ReviewTicket)>, StoreError>;

    /// Approved records only, newest submission first. This is the public
    /// catalogue; the ordering fixes search and listing determinism.
    fn approved(&self) -> Result<Vec<CollegeRecord>, StoreError>;

    /// Pairs whose ticket was last touched at or after `since`, newest
    /// first.
    fn recent(&self, since: DateTime<Utc>) -> Result<Vec<(CollegeRecord, ReviewTicket)>, StoreError>;

    fn status_tally(&self) -> Result<StatusTally, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a college already exists under that id")]
    Conflict,
    #[error("no college under that id")]
    NotFound,
    #[error("listing store unavailable: {0}")]
    Unavailable(String),
}
