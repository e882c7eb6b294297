use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::access::{allowed, ListingAction};
use super::domain::{
    CollegeChanges, CollegeDraft, CollegeId, CollegeRecord, ModerationDecision, ReviewStatus,
    ReviewTicket,
};
use super::repository::{ListingStore, StatusTally, StoreError};
use super::search::{search_approved, SearchHit, PLACEHOLDER_IMAGE};
use super::validate::{apply_changes, invalid, record_from_draft, ValidationError};
use crate::config::ReviewConfig;
use crate::workflows::identity::{
    AuthPrincipal, DirectoryError, PrincipalDirectory, PrincipalRef, PrincipalSummary, TokenError,
};
use crate::workflows::media::{ingest, scrub, ImageStore, ImageUpload, MediaError};
use crate::workflows::{Fault, Page, PageOf};

/// Review queue and dashboard pages are fixed at ten rows.
const QUEUE_PAGE_SIZE: usize = 10;

/// The activity report looks back this many days.
const ACTIVITY_WINDOW_DAYS: i64 = 30;

/// Service tying the listing store, the principal directory, and the image
/// store together behind the submission and moderation operations.
pub struct ListingService<S, D, I> {
    store: Arc<S>,
    directory: Arc<D>,
    images: Arc<I>,
    policy: ReviewConfig,
}

/// Moderation request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationInput {
    pub decision: ModerationDecision,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub expected_revision: Option<u64>,
}

/// Full owner or reviewer view of a submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionView {
    pub record: CollegeRecord,
    pub ticket: ReviewTicket,
}

/// One row of the review queue.
#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    pub college_id: CollegeId,
    pub name: String,
    pub heading: Option<String>,
    pub submitted_by: PrincipalRef,
    pub submitted_at: DateTime<Utc>,
}

/// One row of a submitter's own history, with the moderation outcome.
#[derive(Debug, Clone, Serialize)]
pub struct MySubmissionView {
    pub college_id: CollegeId,
    pub name: String,
    pub heading: Option<String>,
    pub first_image: Option<String>,
    pub status: ReviewStatus,
    pub rejection_reason: Option<String>,
}

/// Public catalogue card.
#[derive(Debug, Clone, Serialize)]
pub struct CollegeCard {
    pub college_id: CollegeId,
    pub name: String,
    pub heading: Option<String>,
    pub image: String,
    pub rating: f32,
}

/// One row of the dashboard's recent-activity feed.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub college_id: CollegeId,
    pub name: String,
    pub status: ReviewStatus,
    pub submitted_at: DateTime<Utc>,
    pub submitter: Option<PrincipalSummary>,
}

/// Dashboard payload: per-status tallies plus the last month of activity.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityReport {
    pub tallies: StatusTally,
    pub recent: PageOf<ActivityEntry>,
}

impl<S, D, I> ListingService<S, D, I>
where
    S: ListingStore + 'static,
    D: PrincipalDirectory + 'static,
    I: ImageStore + 'static,
{
    pub fn new(store: Arc<S>, directory: Arc<D>, images: Arc<I>, policy: ReviewConfig) -> Self {
        Self {
            store,
            directory,
            images,
            policy,
        }
    }

    /// Accepts a new submission: validates the draft, runs the image
    /// pipeline, and stores the record with a fresh Pending ticket.
    pub fn submit(
        &self,
        actor: &AuthPrincipal,
        draft: CollegeDraft,
        campus: Vec<ImageUpload>,
        accommodation: Vec<ImageUpload>,
    ) -> Result<SubmissionView, ListingError> {
        require(actor, ListingAction::Submit)?;

        let now = Utc::now();
        let college_id = CollegeId::generate();
        let mut record = record_from_draft(college_id.clone(), draft, now)?;

        let stored = ingest(self.images.as_ref(), campus, accommodation)?;
        record.images = stored.images;
        record.accommodation_images = stored.accommodation_images;

        let ticket = ReviewTicket::open(college_id.clone(), actor.reference(), now);
        if let Err(error) = self.store.create_pair(record.clone(), ticket.clone()) {
            self.release_images(&record);
            return Err(error.into());
        }

        info!(college_id = %college_id.0, by = %actor.id, "college submitted for review");
        Ok(SubmissionView { record, ticket })
    }

    /// Applies an owner's changes and sends the record back to the review
    /// queue. New images are appended to the existing groups.
    pub fn edit(
        &self,
        actor: &AuthPrincipal,
        id: &CollegeId,
        changes: CollegeChanges,
        campus: Vec<ImageUpload>,
        accommodation: Vec<ImageUpload>,
    ) -> Result<SubmissionView, ListingError> {
        require(actor, ListingAction::Submit)?;

        let (mut record, mut ticket) =
            self.store.pair(id)?.ok_or(ListingError::NotFound)?;
        if ticket.submitted_by != actor.reference() {
            return Err(ListingError::Forbidden(
                "only the original submitter may edit a college".to_string(),
            ));
        }
        if let Some(expected) = changes.expected_revision {
            if expected != ticket.revision {
                return Err(ListingError::StaleRevision {
                    expected,
                    found: ticket.revision,
                });
            }
        }

        apply_changes(&mut record, changes)?;

        let stored = ingest(self.images.as_ref(), campus, accommodation)?;
        let added: Vec<String> = stored
            .images
            .iter()
            .chain(stored.accommodation_images.iter())
            .cloned()
            .collect();
        record.images.extend(stored.images);
        record
            .accommodation_images
            .extend(stored.accommodation_images);

        let now = Utc::now();
        record.updated_at = now;
        ticket.reopen(now);

        if let Err(error) = self.store.update_pair(record.clone(), ticket.clone()) {
            scrub(self.images.as_ref(), &added);
            return Err(error.into());
        }

        info!(college_id = %id.0, by = %actor.id, revision = ticket.revision, "college edited, back to review");
        Ok(SubmissionView { record, ticket })
    }

    /// Records a moderation verdict on a Pending submission.
    ///
    /// Replaying the verdict already on the ticket is a read: the ticket
    /// comes back unchanged, revision included, before any staleness check
    /// so retried requests never conflict with themselves.
    pub fn moderate(
        &self,
        actor: &AuthPrincipal,
        id: &CollegeId,
        input: ModerationInput,
    ) -> Result<ReviewTicket, ListingError> {
        require(actor, ListingAction::Review)?;

        let (_, mut ticket) = self.store.pair(id)?.ok_or(ListingError::NotFound)?;
        if !self.policy.allow_self_review && ticket.submitted_by == actor.reference() {
            return Err(ListingError::Forbidden(
                "reviewing your own submission is not allowed".to_string(),
            ));
        }

        let reason = input
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .map(str::to_string);
        let target = input.decision.status();

        let replay = ticket.status == target
            && ticket.reviewed_by.as_ref() == Some(&actor.reference())
            && ticket.rejection_reason == reason;
        if replay {
            return Ok(ticket);
        }

        if let Some(expected) = input.expected_revision {
            if expected != ticket.revision {
                return Err(ListingError::StaleRevision {
                    expected,
                    found: ticket.revision,
                });
            }
        }

        if input.decision == ModerationDecision::Rejected && reason.is_none() {
            return Err(invalid("reason", "a rejection needs a reason").into());
        }

        ticket.status = target;
        ticket.reviewed_by = Some(actor.reference());
        ticket.rejection_reason = match input.decision {
            ModerationDecision::Approved => None,
            ModerationDecision::Rejected => reason,
        };
        ticket.revision += 1;
        ticket.updated_at = Utc::now();

        self.store.update_ticket(ticket.clone())?;
        info!(college_id = %id.0, by = %actor.id, verdict = target.label(), "college moderated");
        Ok(ticket)
    }

    /// Removes a submission and its stored images. Owners and reviewers
    /// may delete; already-deleted images are not an error.
    pub fn delete(&self, actor: &AuthPrincipal, id: &CollegeId) -> Result<(), ListingError> {
        let (_, ticket) = self.store.pair(id)?.ok_or(ListingError::NotFound)?;
        let owner = ticket.submitted_by == actor.reference();
        if !owner && !allowed(actor.role, ListingAction::Review) {
            return Err(ListingError::Forbidden(
                "only the submitter or a reviewer may delete a college".to_string(),
            ));
        }

        let (record, _) = self.store.delete_pair(id)?;
        self.release_images(&record);
        info!(college_id = %id.0, by = %actor.id, "college deleted");
        Ok(())
    }

    /// One page of the Pending queue, newest submissions first.
    pub fn review_queue(
        &self,
        actor: &AuthPrincipal,
        page: Option<usize>,
    ) -> Result<PageOf<QueueEntry>, ListingError> {
        require(actor, ListingAction::Review)?;
        let entries: Vec<QueueEntry> = self
            .store
            .pending()?
            .into_iter()
            .map(|(record, ticket)| QueueEntry {
                college_id: record.college_id,
                name: record.name,
                heading: record.heading,
                submitted_by: ticket.submitted_by,
                submitted_at: ticket.submitted_at,
            })
            .collect();
        Ok(PageOf::slice(entries, Page::of_size(page, QUEUE_PAGE_SIZE)))
    }

    /// Everything the actor has submitted, with moderation outcomes.
    pub fn my_submissions(
        &self,
        actor: &AuthPrincipal,
    ) -> Result<Vec<MySubmissionView>, ListingError> {
        require(actor, ListingAction::OwnSubmissions)?;
        let views = self
            .store
            .by_submitter(&actor.reference())?
            .into_iter()
            .map(|(record, ticket)| MySubmissionView {
                first_image: record.first_image().map(str::to_string),
                college_id: record.college_id,
                name: record.name,
                heading: record.heading,
                status: ticket.status,
                rejection_reason: ticket.rejection_reason,
            })
            .collect();
        Ok(views)
    }

    /// Full record by id, visible only once approved.
    pub fn public_detail(&self, id: &CollegeId) -> Result<CollegeRecord, ListingError> {
        let (record, ticket) = self.store.pair(id)?.ok_or(ListingError::NotFound)?;
        if ticket.status != ReviewStatus::Approved {
            return Err(ListingError::NotFound);
        }
        Ok(record)
    }

    /// The approved catalogue as cards, newest first.
    pub fn public_list(&self) -> Result<Vec<CollegeCard>, ListingError> {
        let cards = self
            .store
            .approved()?
            .into_iter()
            .map(|record| CollegeCard {
                image: record
                    .first_image()
                    .unwrap_or(PLACEHOLDER_IMAGE)
                    .to_string(),
                college_id: record.college_id,
                name: record.name,
                heading: record.heading,
                rating: record.rating,
            })
            .collect();
        Ok(cards)
    }

    /// Public search over the approved catalogue. A blank query is a
    /// validation error rather than a full dump.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>, ListingError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(invalid("q", "search query must not be blank").into());
        }
        Ok(search_approved(&self.store.approved()?, query))
    }

    /// Dashboard report: status tallies plus a page of the last thirty
    /// days of ticket activity with submitters resolved to display names.
    pub fn activity_report(
        &self,
        actor: &AuthPrincipal,
        page: Option<usize>,
    ) -> Result<ActivityReport, ListingError> {
        require(actor, ListingAction::Dashboard)?;

        let tallies = self.store.status_tally()?;
        let since = Utc::now() - Duration::days(ACTIVITY_WINDOW_DAYS);
        let mut entries = Vec::new();
        for (record, ticket) in self.store.recent(since)? {
            let submitter = self.directory.resolve(&ticket.submitted_by)?;
            entries.push(ActivityEntry {
                college_id: record.college_id,
                name: record.name,
                status: ticket.status,
                submitted_at: ticket.submitted_at,
                submitter,
            });
        }

        Ok(ActivityReport {
            tallies,
            recent: PageOf::slice(entries, Page::of_size(page, QUEUE_PAGE_SIZE)),
        })
    }

    fn release_images(&self, record: &CollegeRecord) {
        scrub(self.images.as_ref(), &record.images);
        scrub(self.images.as_ref(), &record.accommodation_images);
    }
}

fn require(actor: &AuthPrincipal, action: ListingAction) -> Result<(), ListingError> {
    if allowed(actor.role, action) {
        Ok(())
    } else {
        Err(ListingError::Forbidden(format!(
            "role {} may not perform this action",
            actor.role.label()
        )))
    }
}

/// Error raised by the listings workflow.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("college not found")]
    NotFound,
    #[error("{0}")]
    Forbidden(String),
    #[error("stale revision: expected {expected}, found {found}")]
    StaleRevision { expected: u64, found: u64 },
    #[error("missing or invalid credentials")]
    Unauthorized,
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("{0}")]
    Upstream(String),
}

impl ListingError {
    pub fn fault(&self) -> Fault {
        match self {
            Self::Invalid(_) => Fault::Validation,
            Self::NotFound => Fault::NotFound,
            Self::Forbidden(_) => Fault::Forbidden,
            Self::StaleRevision { .. } => Fault::Conflict,
            Self::Unauthorized => Fault::Unauthorized,
            Self::Media(inner) => inner.fault(),
            Self::Upstream(_) => Fault::Upstream,
        }
    }
}

impl From<StoreError> for ListingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict => Self::Upstream("college id already exists".to_string()),
            StoreError::NotFound => Self::NotFound,
            StoreError::Unavailable(message) => Self::Upstream(message),
        }
    }
}

impl From<DirectoryError> for ListingError {
    fn from(error: DirectoryError) -> Self {
        Self::Upstream(error.to_string())
    }
}

impl From<TokenError> for ListingError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Missing | TokenError::Invalid => Self::Unauthorized,
            TokenError::Signing => Self::Upstream("failed to sign token".to_string()),
        }
    }
}
