use chrono::{Duration, Utc};

use super::common::*;
use crate::config::ReviewConfig;
use crate::workflows::listings::domain::{
    CollegeChanges, CollegeId, CollegeRecord, ReviewStatus, ReviewTicket,
};
use crate::workflows::listings::repository::ListingStore;
use crate::workflows::listings::service::{ListingError, ModerationInput};
use crate::workflows::media::ImageUpload;

fn renamed(name: &str) -> CollegeChanges {
    CollegeChanges {
        name: Some(name.to_string()),
        ..CollegeChanges::default()
    }
}

fn corrupt_jpg(filename: &str) -> ImageUpload {
    ImageUpload {
        filename: filename.to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: vec![0xde, 0xad, 0xbe, 0xef],
    }
}

#[test]
fn submission_opens_a_pending_ticket() {
    let (service, store, _, images) = build_listings();

    let view = service
        .submit(
            &institution(),
            draft("Alpha College"),
            vec![png_upload("campus.png")],
            vec![png_upload("dorm.png")],
        )
        .expect("submission accepted");

    assert_eq!(view.ticket.college_id, view.record.college_id);
    assert_eq!(view.ticket.status, ReviewStatus::Pending);
    assert_eq!(view.ticket.revision, 0);
    assert_eq!(view.ticket.submitted_by, institution().reference());
    assert_eq!(view.record.images.len(), 1);
    assert_eq!(view.record.accommodation_images.len(), 1);
    assert_eq!(images.stored_count(), 2);

    let (_, ticket) = store
        .pair(&view.record.college_id)
        .expect("store reachable")
        .expect("pair persisted");
    assert_eq!(ticket.status, ReviewStatus::Pending);
}

#[test]
fn users_without_a_content_role_may_not_submit() {
    let (service, _, _, _) = build_listings();
    match service.submit(&plain_user(), draft("Alpha College"), Vec::new(), Vec::new()) {
        Err(ListingError::Forbidden(_)) => {}
        other => panic!("expected forbidden submission, got {other:?}"),
    }
}

#[test]
fn approval_gates_public_visibility() {
    let (service, _, _, _) = build_listings();

    let view = submitted_college(&service, &institution(), "Alpha College");
    let id = view.record.college_id.clone();

    match service.public_detail(&id) {
        Err(ListingError::NotFound) => {}
        other => panic!("expected hidden pending record, got {other:?}"),
    }
    assert!(service.public_list().expect("list succeeds").is_empty());

    let ticket = service
        .moderate(&staff(), &id, approve_input())
        .expect("approval accepted");
    assert_eq!(ticket.status, ReviewStatus::Approved);
    assert_eq!(ticket.reviewed_by, Some(staff().reference()));
    assert_eq!(ticket.revision, 1);

    let record = service.public_detail(&id).expect("approved record visible");
    assert_eq!(record.name, "Alpha College");

    let cards = service.public_list().expect("list succeeds");
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].rating, 4.0);
}

#[test]
fn edits_reset_tickets_to_pending() {
    let (service, _, _, _) = build_listings();
    let submitter = institution();

    let view = submitted_college(&service, &submitter, "Alpha College");
    let id = view.record.college_id.clone();

    service
        .moderate(&staff(), &id, reject_input("blurry photos"))
        .expect("rejection accepted");

    let edited = service
        .edit(&submitter, &id, renamed("Alpha College of Arts"), Vec::new(), Vec::new())
        .expect("edit accepted");
    assert_eq!(edited.ticket.status, ReviewStatus::Pending);
    assert_eq!(edited.ticket.reviewed_by, None);
    assert_eq!(edited.ticket.rejection_reason, None);
    assert_eq!(edited.ticket.revision, 2);
    assert_eq!(edited.record.name, "Alpha College of Arts");

    service
        .moderate(&staff(), &id, approve_input())
        .expect("approval accepted");
    let edited = service
        .edit(&submitter, &id, renamed("Alpha College of Sciences"), Vec::new(), Vec::new())
        .expect("edit of approved record accepted");
    assert_eq!(edited.ticket.status, ReviewStatus::Pending);
    assert_eq!(edited.ticket.revision, 4);

    match service.public_detail(&id) {
        Err(ListingError::NotFound) => {}
        other => panic!("edited record should be hidden again, got {other:?}"),
    }
}

#[test]
fn only_the_submitter_may_edit() {
    let (service, _, _, _) = build_listings();

    let view = submitted_college(&service, &institution(), "Alpha College");
    let id = view.record.college_id.clone();

    match service.edit(&agent(), &id, renamed("Hijacked"), Vec::new(), Vec::new()) {
        Err(ListingError::Forbidden(reason)) => {
            assert!(reason.contains("original submitter"));
        }
        other => panic!("expected forbidden edit, got {other:?}"),
    }
}

#[test]
fn moderation_replay_is_idempotent() {
    let (service, _, _, _) = build_listings();

    let view = submitted_college(&service, &institution(), "Alpha College");
    let id = view.record.college_id.clone();

    let first = service
        .moderate(&staff(), &id, approve_input())
        .expect("approval accepted");
    assert_eq!(first.revision, 1);

    // Same reviewer, same verdict: a read, even with a stale revision.
    let replay = service
        .moderate(
            &staff(),
            &id,
            ModerationInput {
                expected_revision: Some(0),
                ..approve_input()
            },
        )
        .expect("replay accepted");
    assert_eq!(replay.revision, 1);
    assert_eq!(replay.status, ReviewStatus::Approved);

    // A different reviewer repeating the verdict is a fresh decision.
    let fresh = service
        .moderate(&agent(), &id, approve_input())
        .expect("second reviewer accepted");
    assert_eq!(fresh.revision, 2);
    assert_eq!(fresh.reviewed_by, Some(agent().reference()));
}

#[test]
fn stale_revisions_conflict() {
    let (service, _, _, _) = build_listings();
    let submitter = institution();

    let view = submitted_college(&service, &submitter, "Alpha College");
    let id = view.record.college_id.clone();

    service
        .moderate(&staff(), &id, approve_input())
        .expect("approval accepted");

    let stale_edit = CollegeChanges {
        expected_revision: Some(0),
        ..renamed("Too Late College")
    };
    match service.edit(&submitter, &id, stale_edit, Vec::new(), Vec::new()) {
        Err(ListingError::StaleRevision { expected: 0, found: 1 }) => {}
        other => panic!("expected stale edit conflict, got {other:?}"),
    }

    let stale_verdict = ModerationInput {
        expected_revision: Some(0),
        ..reject_input("changed my mind")
    };
    match service.moderate(&staff(), &id, stale_verdict) {
        Err(ListingError::StaleRevision { expected: 0, found: 1 }) => {}
        other => panic!("expected stale verdict conflict, got {other:?}"),
    }
}

#[test]
fn rejections_require_a_reason() {
    let (service, _, _, _) = build_listings();

    let view = submitted_college(&service, &institution(), "Alpha College");
    let id = view.record.college_id.clone();

    match service.moderate(&staff(), &id, reject_input("   ")) {
        Err(ListingError::Invalid(error)) => assert_eq!(error.field, "reason"),
        other => panic!("expected reason to be required, got {other:?}"),
    }

    // An approval may carry a struck reason; the ticket never keeps one.
    let ticket = service
        .moderate(
            &staff(),
            &id,
            ModerationInput {
                reason: Some("looks good".to_string()),
                ..approve_input()
            },
        )
        .expect("approval accepted");
    assert_eq!(ticket.rejection_reason, None);
}

#[test]
fn self_review_follows_the_policy_toggle() {
    let (service, _, _, _) = build_listings();
    let reviewer = agent();

    let view = submitted_college(&service, &reviewer, "Agent College");
    match service.moderate(&reviewer, &view.record.college_id, approve_input()) {
        Err(ListingError::Forbidden(reason)) => assert!(reason.contains("own submission")),
        other => panic!("expected self-review refusal, got {other:?}"),
    }

    let (service, _, _, _) = build_listings_with_policy(ReviewConfig {
        allow_self_review: true,
    });
    let view = submitted_college(&service, &reviewer, "Agent College");
    service
        .moderate(&reviewer, &view.record.college_id, approve_input())
        .expect("self-review allowed by policy");
}

#[test]
fn edit_appends_images_instead_of_replacing() {
    let (service, _, _, images) = build_listings();
    let submitter = institution();

    let view = service
        .submit(
            &submitter,
            draft("Alpha College"),
            vec![png_upload("campus-1.png")],
            Vec::new(),
        )
        .expect("submission accepted");
    let id = view.record.college_id.clone();
    let original = view.record.images[0].clone();

    let edited = service
        .edit(
            &submitter,
            &id,
            CollegeChanges::default(),
            vec![png_upload("campus-2.png")],
            Vec::new(),
        )
        .expect("image-only edit accepted");

    assert_eq!(edited.record.images.len(), 2);
    assert_eq!(edited.record.images[0], original);
    assert_eq!(edited.ticket.status, ReviewStatus::Pending);
    assert_eq!(images.stored_count(), 2);
}

#[test]
fn failed_ingest_leaves_no_files_behind() {
    let (service, store, _, images) = build_listings();

    let result = service.submit(
        &institution(),
        draft("Alpha College"),
        vec![png_upload("campus.png")],
        vec![corrupt_jpg("dorm.jpg")],
    );
    match result {
        Err(ListingError::Media(_)) => {}
        other => panic!("expected media failure, got {other:?}"),
    }

    assert_eq!(images.stored_count(), 0);
    assert!(store.pending().expect("store reachable").is_empty());
}

#[test]
fn delete_scrubs_stored_images() {
    let (service, store, _, images) = build_listings();
    let submitter = institution();

    let view = service
        .submit(
            &submitter,
            draft("Alpha College"),
            vec![png_upload("campus.png")],
            vec![png_upload("dorm.png")],
        )
        .expect("submission accepted");
    let id = view.record.college_id.clone();
    assert_eq!(images.stored_count(), 2);

    match service.delete(&plain_user(), &id) {
        Err(ListingError::Forbidden(_)) => {}
        other => panic!("expected forbidden delete, got {other:?}"),
    }

    service.delete(&submitter, &id).expect("owner may delete");
    assert_eq!(images.stored_count(), 0);
    assert!(store.pair(&id).expect("store reachable").is_none());

    // Reviewers may delete records they do not own.
    let view = submitted_college(&service, &submitter, "Beta College");
    service
        .delete(&staff(), &view.record.college_id)
        .expect("reviewer may delete");
}

#[test]
fn review_queue_pages_newest_first() {
    let (service, store, _, _) = build_listings();
    let base = Utc::now() - Duration::minutes(60);

    for i in 0..12 {
        let at = base + Duration::minutes(i);
        let id = CollegeId(format!("college-{i:02}"));
        let record = queue_record(&id, &format!("College {i:02}"), at);
        let mut ticket = ReviewTicket::open(id, institution().reference(), at);
        ticket.submitted_at = at;
        store.create_pair(record, ticket).expect("seed pair");
    }

    let page = service
        .review_queue(&staff(), Some(1))
        .expect("queue readable");
    assert_eq!(page.total, 12);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.items[0].name, "College 11");
    assert_eq!(page.items[9].name, "College 02");

    let page = service
        .review_queue(&staff(), Some(2))
        .expect("queue readable");
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[1].name, "College 00");

    match service.review_queue(&institution(), None) {
        Err(ListingError::Forbidden(_)) => {}
        other => panic!("expected forbidden queue read, got {other:?}"),
    }
}

#[test]
fn my_submissions_reports_moderation_outcomes() {
    let (service, _, _, _) = build_listings();
    let submitter = institution();

    let first = submitted_college(&service, &submitter, "Alpha College");
    let second = submitted_college(&service, &submitter, "Beta College");

    service
        .moderate(&staff(), &first.record.college_id, approve_input())
        .expect("approval accepted");
    service
        .moderate(&staff(), &second.record.college_id, reject_input("no accreditation"))
        .expect("rejection accepted");

    let mine = service
        .my_submissions(&submitter)
        .expect("history readable");
    assert_eq!(mine.len(), 2);
    let beta = mine
        .iter()
        .find(|entry| entry.name == "Beta College")
        .expect("beta listed");
    assert_eq!(beta.status, ReviewStatus::Rejected);
    assert_eq!(beta.rejection_reason.as_deref(), Some("no accreditation"));

    assert!(service
        .my_submissions(&agent())
        .expect("agent history readable")
        .is_empty());

    match service.my_submissions(&staff()) {
        Err(ListingError::Forbidden(_)) => {}
        other => panic!("expected no history view for staff, got {other:?}"),
    }
}

#[test]
fn search_requires_a_query_and_sees_only_approved() {
    let (service, _, _, _) = build_listings();

    approved_college(&service, "Maritime Institute");
    submitted_college(&service, &institution(), "Maritime Academy");

    match service.search("   ") {
        Err(ListingError::Invalid(error)) => assert_eq!(error.field, "q"),
        other => panic!("expected blank query rejection, got {other:?}"),
    }

    let hits = service.search("maritime").expect("search succeeds");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Maritime Institute");
}

#[test]
fn activity_report_tallies_and_resolves_submitters() {
    let (service, _, directory, _) = build_listings();
    seeded_institution_account(&directory);

    let first = submitted_college(&service, &institution(), "Alpha College");
    submitted_college(&service, &staff(), "Staff College");
    service
        .moderate(&staff(), &first.record.college_id, approve_input())
        .expect("approval accepted");

    let report = service
        .activity_report(&admin(), None)
        .expect("report readable");
    assert_eq!(report.tallies.total, 2);
    assert_eq!(report.tallies.approved, 1);
    assert_eq!(report.tallies.pending, 1);
    assert_eq!(report.recent.items.len(), 2);

    let alpha = report
        .recent
        .items
        .iter()
        .find(|entry| entry.name == "Alpha College")
        .expect("alpha listed");
    let submitter = alpha.submitter.as_ref().expect("submitter resolved");
    assert_eq!(submitter.name, "Alpha Registrar");

    let unresolved = report
        .recent
        .items
        .iter()
        .find(|entry| entry.name == "Staff College")
        .expect("staff submission listed");
    assert!(unresolved.submitter.is_none());

    match service.activity_report(&staff(), None) {
        Err(ListingError::Forbidden(_)) => {}
        other => panic!("expected forbidden report read, got {other:?}"),
    }
}

fn queue_record(id: &CollegeId, name: &str, at: chrono::DateTime<Utc>) -> CollegeRecord {
    CollegeRecord {
        college_id: id.clone(),
        name: name.to_string(),
        heading: None,
        about: Vec::new(),
        courses: Vec::new(),
        departments: Vec::new(),
        rating: 0.0,
        accommodations: Vec::new(),
        accommodation_images: Vec::new(),
        images: Vec::new(),
        contact: None,
        email: None,
        address: None,
        address_url: None,
        founded_year: None,
        created_at: at,
        updated_at: at,
    }
}
