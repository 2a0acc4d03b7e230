use std::sync::Arc;

use super::common::*;
use crate::workflows::review::domain::UserId;
use crate::workflows::review::gating::GateDenial;
use crate::workflows::review::matching::PageParams;
use crate::workflows::review::repository::{AuditKind, ReviewRepository, SettingsRepository};
use crate::workflows::review::service::{ReviewService, ReviewServiceError, ValidationError};

fn id(raw: &str) -> UserId {
    UserId(raw.to_string())
}

#[test]
fn submit_creates_then_updates_a_single_row() {
    let fx = fixture([user("a", "Asha", "Physics"), user("b", "Bela", "Physics")]);

    fx.service
        .submit_review(&id("a"), &id("b"), ratings(5), texts())
        .expect("first submission");
    assert_eq!(fx.reviews.len(), 1);

    let updated = fx
        .service
        .submit_review(&id("a"), &id("b"), ratings(1), texts())
        .expect("resubmission");
    assert_eq!(fx.reviews.len(), 1, "resubmission must not add a row");
    assert_eq!(updated.ratings.approachability, 1);

    let stored = fx
        .reviews
        .fetch(&id("a"), &id("b"))
        .expect("fetch works")
        .expect("row exists");
    assert_eq!(stored.ratings, ratings(1));
    assert!(stored.updated_at >= stored.created_at);
}

#[test]
fn submit_is_denied_when_reviews_are_disabled_and_writes_nothing() {
    let fx = fixture_with_settings(
        [user("a", "Asha", "Physics"), user("b", "Bela", "Physics")],
        MemorySettings::disabled(),
    );

    match fx
        .service
        .submit_review(&id("a"), &id("b"), ratings(4), texts())
    {
        Err(ReviewServiceError::Denied(GateDenial::ReviewsDisabled)) => {}
        other => panic!("expected reviews-disabled denial, got {other:?}"),
    }
    assert_eq!(fx.reviews.len(), 0);
}

#[test]
fn out_of_range_rating_is_rejected_before_any_write() {
    let fx = fixture([user("a", "Asha", "Physics"), user("b", "Bela", "Physics")]);

    let mut bad = ratings(5);
    bad.maturity = 6;
    match fx.service.submit_review(&id("a"), &id("b"), bad, texts()) {
        Err(ReviewServiceError::Validation(ValidationError::RatingOutOfRange {
            field: "maturity",
            value: 6,
        })) => {}
        other => panic!("expected rating validation error, got {other:?}"),
    }
    assert_eq!(fx.reviews.len(), 0);
}

#[test]
fn whitespace_only_text_is_rejected() {
    let fx = fixture([user("a", "Asha", "Physics"), user("b", "Bela", "Physics")]);

    let mut bad = texts();
    bad.other_comments = "   ".to_string();
    match fx.service.submit_review(&id("a"), &id("b"), ratings(3), bad) {
        Err(ReviewServiceError::Validation(ValidationError::EmptyText {
            field: "other_comments",
        })) => {}
        other => panic!("expected empty-text validation error, got {other:?}"),
    }
}

#[test]
fn self_review_is_rejected() {
    let fx = fixture([user("a", "Asha", "Physics")]);

    match fx
        .service
        .submit_review(&id("a"), &id("a"), ratings(3), texts())
    {
        Err(ReviewServiceError::Validation(ValidationError::SelfReview)) => {}
        other => panic!("expected self-review rejection, got {other:?}"),
    }
}

#[test]
fn unknown_reviewee_reports_not_found() {
    let fx = fixture([user("a", "Asha", "Physics")]);

    match fx
        .service
        .submit_review(&id("a"), &id("ghost"), ratings(3), texts())
    {
        Err(ReviewServiceError::UserNotFound) => {}
        other => panic!("expected not-found, got {other:?}"),
    }
}

#[test]
fn finalized_reviewer_is_always_denied() {
    let mut asha = user("a", "Asha", "Physics");
    asha.has_submitted = true;
    asha.submitted_at = Some(chrono::Utc::now());
    let fx = fixture([asha, user("b", "Bela", "Physics")]);

    match fx
        .service
        .submit_review(&id("a"), &id("b"), ratings(5), texts())
    {
        Err(ReviewServiceError::Denied(GateDenial::AlreadyFinalized)) => {}
        other => panic!("expected already-finalized denial, got {other:?}"),
    }
}

fn seed_reviews(fx: &Fixture, reviewer: &str, count: usize) {
    for i in 0..count {
        fx.service
            .submit_review(
                &id(reviewer),
                &id(&format!("peer{i}")),
                ratings(4),
                texts(),
            )
            .expect("seed review");
    }
}

fn fixture_with_peers(peer_count: usize) -> Fixture {
    let mut seed = vec![user("a", "Asha", "Physics")];
    for i in 0..peer_count {
        seed.push(user(&format!("peer{i}"), &format!("Peer {i}"), "Physics"));
    }
    fixture(seed)
}

#[test]
fn finalize_requires_five_reviews() {
    let fx = fixture_with_peers(4);
    seed_reviews(&fx, "a", 4);

    match fx.service.finalize(&id("a")) {
        Err(ReviewServiceError::NotEnoughReviews { have: 4, need: 5 }) => {}
        other => panic!("expected not-enough-reviews, got {other:?}"),
    }
    let stored = fx.users.get("a").expect("user exists");
    assert!(!stored.has_submitted);
}

#[test]
fn finalize_succeeds_once_and_is_idempotent() {
    let fx = fixture_with_peers(5);
    seed_reviews(&fx, "a", 5);

    let first = fx.service.finalize(&id("a")).expect("finalize succeeds");
    assert!(first.newly_finalized);

    let stored = fx.users.get("a").expect("user exists");
    assert!(stored.has_submitted);
    assert_eq!(stored.submitted_at, Some(first.submitted_at));
    assert!(stored.submission_state_consistent());

    let retry = fx.service.finalize(&id("a")).expect("retry is a no-op");
    assert!(!retry.newly_finalized);
    assert_eq!(retry.submitted_at, first.submitted_at);
}

#[test]
fn finalize_respects_the_kill_switch() {
    let fx = fixture_with_settings(
        {
            let mut seed = vec![user("a", "Asha", "Physics")];
            seed.extend((0..5).map(|i| user(&format!("peer{i}"), "Peer", "Physics")));
            seed
        },
        MemorySettings::disabled(),
    );

    match fx.service.finalize(&id("a")) {
        Err(ReviewServiceError::Denied(GateDenial::ReviewsDisabled)) => {}
        other => panic!("expected reviews-disabled denial, got {other:?}"),
    }
}

#[test]
fn recommendations_emit_an_audit_event() {
    let fx = fixture([user("a", "Asha", "Physics"), user("b", "Bela", "Physics")]);

    let page = fx
        .service
        .recommendations(&id("a"), PageParams { skip: 0, take: 10 })
        .expect("recommendations");
    assert_eq!(page.candidates.len(), 1);

    let events = fx.audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, AuditKind::UserAction);
    assert_eq!(events[0].category, "RECOMMENDATIONS");
}

#[test]
fn search_scopes_by_program_and_flags_reviewed_candidates() {
    let mut damp_peer = user("d", "Dhruv", "Physics");
    damp_peer.program = crate::workflows::review::domain::Program::Damp;
    let fx = fixture([
        user("a", "Asha", "Physics"),
        user("b", "Bela", "Physics"),
        user("c", "Chitra", "Chemistry"),
        damp_peer,
    ]);
    fx.service
        .submit_review(&id("a"), &id("b"), ratings(4), texts())
        .expect("review B");

    let all = fx.service.search_users(&id("a"), "").expect("search");
    let names: Vec<&str> = all.iter().map(|hit| hit.name.as_str()).collect();
    // Dhruv is in the other programme and never appears.
    assert_eq!(names, vec!["Bela", "Chitra"]);
    assert!(all[0].has_reviewed);
    assert!(!all[1].has_reviewed);

    let filtered = fx.service.search_users(&id("a"), "chem").expect("search");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].name, "Chitra");
}

#[test]
fn operations_survive_a_broken_audit_sink() {
    let users = MemoryUsers::with([user("a", "Asha", "Physics"), user("b", "Bela", "Physics")]);
    let reviews = Arc::new(MemoryReviews::default());
    let settings = Arc::new(MemorySettings::default());
    let service = ReviewService::new(
        users,
        reviews,
        settings,
        Arc::new(BrokenAudit),
        test_policy(),
    );

    let hits = service
        .search_users(&id("a"), "")
        .expect("search succeeds despite audit failure");
    assert_eq!(hits.len(), 1);
}

#[test]
fn reviews_enabled_defaults_to_true_without_a_settings_row() {
    let fx = fixture([user("a", "Asha", "Physics")]);
    assert!(fx.service.reviews_enabled().expect("probe"));
    assert!(fx.settings.load().expect("load").is_none(), "no row created");
}
