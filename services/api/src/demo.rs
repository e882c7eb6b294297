use std::sync::{Arc, Mutex};

use clap::Args;
use collegium::config::{AuthConfig, ReviewConfig};
use collegium::error::AppError;
use collegium::workflows::identity::{
    BootstrapInput, IdentityError, IdentityService, InMemoryDirectory, InMemoryTokenVault,
    MailerError, RegisterStaffInput, RegisterUserInput, Role, StaffLoginInput, TokenKeys,
    UserLoginInput, VerificationMailer,
};
use collegium::workflows::listings::{
    CollegeChanges, CollegeDraft, InMemoryListingStore, ListingService, ModerationDecision,
    ModerationInput,
};
use collegium::workflows::media::InMemoryImageStore;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Leave the approved college in place instead of deleting it at the end.
    #[arg(long)]
    pub(crate) keep_record: bool,
    /// Let reviewers approve their own submissions during the walkthrough.
    #[arg(long)]
    pub(crate) allow_self_review: bool,
}

/// Captures verification mail so the walkthrough can redeem the token.
#[derive(Default)]
struct DemoMailer {
    tokens: Mutex<Vec<String>>,
}

impl DemoMailer {
    fn last_token(&self) -> Option<String> {
        self.tokens.lock().ok()?.last().cloned()
    }
}

impl VerificationMailer for DemoMailer {
    fn send_verification(&self, email: &str, token: &str) -> Result<(), MailerError> {
        println!("  [mail to {email}] verification token: {token}");
        self.tokens
            .lock()
            .map_err(|_| MailerError("demo mailbox poisoned".to_string()))?
            .push(token.to_string());
        Ok(())
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Collegium portal demo");

    let keys = TokenKeys::new(&AuthConfig {
        token_secret: "collegium-demo-secret".to_string(),
        token_ttl_minutes: 60,
    });
    let directory = Arc::new(InMemoryDirectory::default());
    let mailer = Arc::new(DemoMailer::default());
    let identity = IdentityService::new(
        directory.clone(),
        Arc::new(InMemoryTokenVault::default()),
        mailer.clone(),
        keys.clone(),
    );
    let listings = ListingService::new(
        Arc::new(InMemoryListingStore::default()),
        directory,
        Arc::new(InMemoryImageStore::default()),
        ReviewConfig {
            allow_self_review: args.allow_self_review,
        },
    );

    println!("\n1. Admin bootstrap and staff provisioning");
    let admin_session = identity.bootstrap_admin(BootstrapInput {
        admin_id: "founding-admin".to_string(),
        first_name: "Pat".to_string(),
        last_name: "Warden".to_string(),
        password: "first-key-holder".to_string(),
    })?;
    println!(
        "  Claimed the one-shot bootstrap as {} ({})",
        admin_session.principal.name,
        admin_session.principal.primary_role.label()
    );
    let admin = keys
        .verify(&admin_session.token)
        .map_err(IdentityError::from)?;
    identity.register_staff(
        &admin,
        RegisterStaffInput {
            staff_id: "reviewer-01".to_string(),
            first_name: "Sam".to_string(),
            last_name: "Gatekeeper".to_string(),
            password: "stamp-of-approval".to_string(),
            roles: None,
            primary_role: None,
        },
    )?;
    let staff_session = identity.login_staff(StaffLoginInput {
        staff_id: "reviewer-01".to_string(),
        password: "stamp-of-approval".to_string(),
    })?;
    let reviewer = keys
        .verify(&staff_session.token)
        .map_err(IdentityError::from)?;
    println!("  Provisioned reviewer {}", staff_session.principal.name);

    println!("\n2. Institution onboarding");
    let receipt = identity.register_user(RegisterUserInput {
        first_name: "Alva".to_string(),
        last_name: "Registrar".to_string(),
        email: "registrar@alpha-maritime.edu".to_string(),
        password: "anchors-aweigh".to_string(),
        role: Some(Role::Institutions),
    })?;
    println!("  Registered {} (pending verification)", receipt.email);
    let token = mailer.last_token().ok_or_else(|| {
        IdentityError::from(MailerError("no verification mail captured".to_string()))
    })?;
    identity.verify_email(&token)?;
    let session = identity.login_user(UserLoginInput {
        email: receipt.email.clone(),
        password: "anchors-aweigh".to_string(),
    })?;
    let registrar = keys.verify(&session.token).map_err(IdentityError::from)?;
    println!("  Verified and logged in as {}", session.principal.name);

    println!("\n3. Submission and review");
    let view = listings.submit(
        &registrar,
        CollegeDraft {
            name: "Alpha Maritime College".to_string(),
            heading: Some("Seafaring degrees since 1900".to_string()),
            about: vec!["A harbourside campus with its own training vessel.".to_string()],
            courses: Vec::new(),
            departments: vec!["Navigation".to_string(), "Marine Engineering".to_string()],
            rating: Some(4.2),
            accommodations: vec!["North Hall".to_string()],
            contact: None,
            email: Some("admissions@alpha-maritime.edu".to_string()),
            address: None,
            address_url: None,
            founded_year: Some(1900),
        },
        Vec::new(),
        Vec::new(),
    )?;
    let id = view.record.college_id.clone();
    println!(
        "  Submitted '{}' -> ticket {} (revision {})",
        view.record.name,
        view.ticket.status.label(),
        view.ticket.revision
    );

    let queue = listings.review_queue(&reviewer, None)?;
    println!("  Review queue holds {} submission(s)", queue.total);

    let ticket = listings.moderate(
        &reviewer,
        &id,
        ModerationInput {
            decision: ModerationDecision::Rejected,
            reason: Some("needs campus photographs".to_string()),
            expected_revision: Some(view.ticket.revision),
        },
    )?;
    println!(
        "  Rejected at revision {}: {}",
        ticket.revision,
        ticket.rejection_reason.as_deref().unwrap_or("")
    );

    for entry in listings.my_submissions(&registrar)? {
        println!(
            "  Submitter sees: {} -> {}{}",
            entry.name,
            entry.status.label(),
            entry
                .rejection_reason
                .map(|reason| format!(" ({reason})"))
                .unwrap_or_default()
        );
    }

    println!("\n4. Resubmission and approval");
    let view = listings.edit(
        &registrar,
        &id,
        CollegeChanges {
            heading: Some("Seafaring and port logistics degrees".to_string()),
            ..CollegeChanges::default()
        },
        Vec::new(),
        Vec::new(),
    )?;
    println!(
        "  Edited -> ticket {} (revision {})",
        view.ticket.status.label(),
        view.ticket.revision
    );
    let ticket = listings.moderate(
        &reviewer,
        &id,
        ModerationInput {
            decision: ModerationDecision::Approved,
            reason: None,
            expected_revision: Some(view.ticket.revision),
        },
    )?;
    println!("  Approved at revision {}", ticket.revision);

    println!("\n5. Public catalogue");
    for hit in listings.search("maritime")? {
        println!("  Search hit: {} (image {})", hit.name, hit.image);
    }
    let record = listings.public_detail(&id)?;
    match serde_json::to_string_pretty(&record) {
        Ok(json) => println!("  Public record payload:\n{json}"),
        Err(err) => println!("  Public record payload unavailable: {err}"),
    }

    if args.keep_record {
        println!("\nKeeping the approved record in place (--keep-record).");
        return Ok(());
    }

    println!("\n6. Cleanup");
    listings.delete(&reviewer, &id)?;
    println!(
        "  Deleted the record; search now returns {} hit(s)",
        listings.search("maritime")?.len()
    );

    Ok(())
}
