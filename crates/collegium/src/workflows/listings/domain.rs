use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::identity::PrincipalRef;

/// Immutable key assigned at submission, shared by the record and its ticket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollegeId(pub String);

impl CollegeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    #[serde(default)]
    pub syllabus: String,
}

/// Postal details, every part optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// The content payload: everything an institution publishes about itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollegeRecord {
    pub college_id: CollegeId,
    pub name: String,
    pub heading: Option<String>,
    pub about: Vec<String>,
    pub courses: Vec<Course>,
    pub departments: Vec<String>,
    pub rating: f32,
    pub accommodations: Vec<String>,
    pub accommodation_images: Vec<String>,
    pub images: Vec<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub address: Option<Address>,
    pub address_url: Option<String>,
    pub founded_year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CollegeRecord {
    pub fn first_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

/// Moderation verdict carried by a review request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationDecision {
    Approved,
    Rejected,
}

impl ModerationDecision {
    pub const fn status(self) -> ReviewStatus {
        match self {
            Self::Approved => ReviewStatus::Approved,
            Self::Rejected => ReviewStatus::Rejected,
        }
    }
}

/// Submission tracking entry, 1:1 with a [`CollegeRecord`]. A record is
/// publicly visible exactly when its ticket is Approved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewTicket {
    pub college_id: CollegeId,
    pub submitted_by: PrincipalRef,
    pub status: ReviewStatus,
    pub reviewed_by: Option<PrincipalRef>,
    pub rejection_reason: Option<String>,
    /// Bumped on every accepted mutation; optimistic-concurrency anchor.
    pub revision: u64,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewTicket {
    pub fn open(college_id: CollegeId, submitted_by: PrincipalRef, at: DateTime<Utc>) -> Self {
        Self {
            college_id,
            submitted_by,
            status: ReviewStatus::Pending,
            reviewed_by: None,
            rejection_reason: None,
            revision: 0,
            submitted_at: at,
            updated_at: at,
        }
    }

    /// The edit transition: back to Pending with reviewer traces cleared,
    /// whatever the previous state was.
    pub fn reopen(&mut self, at: DateTime<Utc>) {
        self.status = ReviewStatus::Pending;
        self.reviewed_by = None;
        self.rejection_reason = None;
        self.revision += 1;
        self.updated_at = at;
    }
}

/// Submission payload. Lists default to empty so sparse JSON bodies work.
#[derive(Debug, Clone, Deserialize)]
pub struct CollegeDraft {
    pub name: String,
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub about: Vec<String>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub accommodations: Vec<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub address_url: Option<String>,
    #[serde(default)]
    pub founded_year: Option<i32>,
}

/// Partial update: provided scalars replace, provided lists replace
/// wholesale (image lists are separate and append instead).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollegeChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub about: Option<Vec<String>>,
    #[serde(default)]
    pub courses: Option<Vec<Course>>,
    #[serde(default)]
    pub departments: Option<Vec<String>>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub accommodations: Option<Vec<String>>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub address_url: Option<String>,
    #[serde(default)]
    pub founded_year: Option<i32>,
    #[serde(default)]
    pub expected_revision: Option<u64>,
}
