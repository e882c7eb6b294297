use std::io::Cursor;
use std::sync::Arc;

use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::config::{AuthConfig, ReviewConfig};
use crate::workflows::identity::memory::InMemoryDirectory;
use crate::workflows::identity::token::{AuthPrincipal, TokenKeys};
use crate::workflows::identity::{
    AccountStanding, EmailVerification, PersonName, PrincipalDirectory, PrincipalKind, Role,
    UserAccount,
};
use crate::workflows::listings::domain::{CollegeDraft, ModerationDecision};
use crate::workflows::listings::memory::InMemoryListingStore;
use crate::workflows::listings::router::listing_router;
use crate::workflows::listings::service::{
    ListingService, ModerationInput, SubmissionView,
};
use crate::workflows::media::{ImageUpload, InMemoryImageStore};

pub(super) type TestListingService =
    ListingService<InMemoryListingStore, InMemoryDirectory, InMemoryImageStore>;

pub(super) fn test_keys() -> TokenKeys {
    TokenKeys::new(&AuthConfig {
        token_secret: "unit-test-secret".to_string(),
        token_ttl_minutes: 60,
    })
}

pub(super) fn build_listings() -> (
    TestListingService,
    Arc<InMemoryListingStore>,
    Arc<InMemoryDirectory>,
    Arc<InMemoryImageStore>,
) {
    build_listings_with_policy(ReviewConfig {
        allow_self_review: false,
    })
}

pub(super) fn build_listings_with_policy(
    policy: ReviewConfig,
) -> (
    TestListingService,
    Arc<InMemoryListingStore>,
    Arc<InMemoryDirectory>,
    Arc<InMemoryImageStore>,
) {
    let store = Arc::new(InMemoryListingStore::default());
    let directory = Arc::new(InMemoryDirectory::default());
    let images = Arc::new(InMemoryImageStore::default());
    let service = ListingService::new(
        store.clone(),
        directory.clone(),
        images.clone(),
        policy,
    );
    (service, store, directory, images)
}

pub(super) fn draft(name: &str) -> CollegeDraft {
    CollegeDraft {
        name: name.to_string(),
        heading: Some("A fine place to study".to_string()),
        about: vec!["Founded on a hill.".to_string()],
        courses: Vec::new(),
        departments: Vec::new(),
        rating: Some(4.0),
        accommodations: Vec::new(),
        contact: None,
        email: None,
        address: None,
        address_url: None,
        founded_year: Some(1900),
    }
}

pub(super) fn principal(id: &str, kind: PrincipalKind, role: Role) -> AuthPrincipal {
    AuthPrincipal {
        id: id.to_string(),
        kind,
        role,
    }
}

pub(super) fn institution() -> AuthPrincipal {
    principal("inst-1", PrincipalKind::User, Role::Institutions)
}

pub(super) fn agent() -> AuthPrincipal {
    principal("agent-1", PrincipalKind::Staff, Role::Agents)
}

pub(super) fn staff() -> AuthPrincipal {
    principal("staff-1", PrincipalKind::Staff, Role::Staff)
}

pub(super) fn admin() -> AuthPrincipal {
    principal("admin-1", PrincipalKind::Admin, Role::Admin)
}

pub(super) fn plain_user() -> AuthPrincipal {
    principal("user-1", PrincipalKind::User, Role::Users)
}

/// A tiny valid PNG for exercising the upload path.
pub(super) fn png_upload(filename: &str) -> ImageUpload {
    let mut bytes = Vec::new();
    let pixels = image::RgbImage::from_pixel(4, 4, image::Rgb([40, 80, 120]));
    image::DynamicImage::ImageRgb8(pixels)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode test png");
    ImageUpload {
        filename: filename.to_string(),
        content_type: "image/png".to_string(),
        bytes,
    }
}

pub(super) fn approve_input() -> ModerationInput {
    ModerationInput {
        decision: ModerationDecision::Approved,
        reason: None,
        expected_revision: None,
    }
}

pub(super) fn reject_input(reason: &str) -> ModerationInput {
    ModerationInput {
        decision: ModerationDecision::Rejected,
        reason: Some(reason.to_string()),
        expected_revision: None,
    }
}

pub(super) fn submitted_college(
    service: &TestListingService,
    actor: &AuthPrincipal,
    name: &str,
) -> SubmissionView {
    service
        .submit(actor, draft(name), Vec::new(), Vec::new())
        .expect("submission accepted")
}

/// Submit as the institution and approve as staff, returning the view.
pub(super) fn approved_college(service: &TestListingService, name: &str) -> SubmissionView {
    let view = submitted_college(service, &institution(), name);
    service
        .moderate(&staff(), &view.record.college_id, approve_input())
        .expect("approval accepted");
    view
}

/// Directory entry matching the [`institution`] principal, so activity
/// reports can resolve the submitter.
pub(super) fn seeded_institution_account(directory: &InMemoryDirectory) {
    let now = Utc::now();
    directory
        .insert_user(UserAccount {
            user_id: "inst-1".to_string(),
            name: PersonName {
                first: "Alpha".to_string(),
                last: "Registrar".to_string(),
            },
            email: "registrar@alpha.edu".to_string(),
            password_hash: "not-a-real-hash".to_string(),
            roles: vec![Role::Institutions],
            primary_role: Role::Institutions,
            email_status: EmailVerification::Verified,
            standing: AccountStanding::Active,
            created_at: now,
            updated_at: now,
        })
        .expect("account seeds");
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn listing_router_with_service(service: TestListingService) -> axum::Router {
    listing_router(Arc::new(service), test_keys())
}

pub(super) const TEST_BOUNDARY: &str = "test-boundary";

pub(super) fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={TEST_BOUNDARY}")
}

/// Hand-rolled multipart body for router tests.
pub(super) struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub(super) fn new() -> Self {
        Self { body: Vec::new() }
    }

    pub(super) fn json_part(mut self, name: &str, value: &Value) -> Self {
        self.body
            .extend_from_slice(format!("--{TEST_BOUNDARY}\r\n").as_bytes());
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        self.body.extend_from_slice(value.to_string().as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub(super) fn file_part(mut self, name: &str, upload: &ImageUpload) -> Self {
        self.body
            .extend_from_slice(format!("--{TEST_BOUNDARY}\r\n").as_bytes());
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{}\"\r\n",
                upload.filename
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(
            format!("Content-Type: {}\r\n\r\n", upload.content_type).as_bytes(),
        );
        self.body.extend_from_slice(&upload.bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub(super) fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{TEST_BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}
