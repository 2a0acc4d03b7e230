use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{program_compatible, Program, RatingSet, ReviewTexts, UserId, UserRecord};
use super::gating::{self, GateDenial};
use super::matching::{self, PageParams, RecommendationPage};
use super::repository::{
    AuditEvent, AuditSink, RepositoryError, ReviewDraft, ReviewRecord, ReviewRepository,
    SettingsRepository, SystemSettings, UserRepository,
};

/// Tunables for the review workflow.
#[derive(Debug, Clone)]
pub struct ReviewPolicy {
    /// Distinct reviews a reviewer must have written before finalizing.
    pub min_reviews_to_finalize: usize,
    /// How long a `SystemSettings` snapshot may be served from memory.
    pub settings_cache_ttl: Duration,
    /// Row cap for candidate search responses.
    pub search_take: usize,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            min_reviews_to_finalize: 5,
            settings_cache_ttl: Duration::from_secs(60),
            search_take: 50,
        }
    }
}

/// Service composing the gating rules, matching engine, and submission
/// state machine over the storage and audit collaborators.
pub struct ReviewService<U, R, S, A> {
    users: Arc<U>,
    reviews: Arc<R>,
    settings: Arc<S>,
    audit: Arc<A>,
    policy: ReviewPolicy,
    settings_cache: Mutex<Option<(Instant, SystemSettings)>>,
}

impl<U, R, S, A> ReviewService<U, R, S, A>
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    S: SettingsRepository + 'static,
    A: AuditSink + 'static,
{
    pub fn new(
        users: Arc<U>,
        reviews: Arc<R>,
        settings: Arc<S>,
        audit: Arc<A>,
        policy: ReviewPolicy,
    ) -> Self {
        Self {
            users,
            reviews,
            settings,
            audit,
            policy,
            settings_cache: Mutex::new(None),
        }
    }

    /// Create or fully replace this reviewer's review of `reviewee_id`.
    ///
    /// Gating runs against a snapshot fetched here; the store's pair
    /// uniqueness makes the upsert itself race-free.
    pub fn submit_review(
        &self,
        reviewer_id: &UserId,
        reviewee_id: &UserId,
        ratings: RatingSet,
        texts: ReviewTexts,
    ) -> Result<ReviewRecord, ReviewServiceError> {
        if reviewer_id == reviewee_id {
            return Err(ValidationError::SelfReview.into());
        }

        let reviewer = self
            .users
            .fetch(reviewer_id)?
            .ok_or(ReviewServiceError::UserNotFound)?;
        let reviewee = self
            .users
            .fetch(reviewee_id)?
            .ok_or(ReviewServiceError::UserNotFound)?;

        let settings = self.current_settings()?;
        gating::check_pair(&reviewer, &reviewee, settings)?;

        validate_ratings(&ratings)?;
        validate_texts(&texts)?;

        let record = self.reviews.upsert(
            ReviewDraft {
                reviewer_id: reviewer_id.clone(),
                reviewee_id: reviewee_id.clone(),
                ratings,
                texts,
            },
            Utc::now(),
        )?;
        Ok(record)
    }

    /// One-way `Drafting -> Finalized` transition.
    ///
    /// Retrying after success is a no-op that reports the original
    /// timestamp. Two racing calls can both pass the count check and both
    /// write; they write the same terminal state, so no guard is attempted.
    pub fn finalize(&self, reviewer_id: &UserId) -> Result<FinalizeOutcome, ReviewServiceError> {
        let reviewer = self
            .users
            .fetch(reviewer_id)?
            .ok_or(ReviewServiceError::UserNotFound)?;

        if reviewer.has_submitted {
            return Ok(FinalizeOutcome {
                submitted_at: reviewer.submitted_at.unwrap_or_else(Utc::now),
                newly_finalized: false,
            });
        }

        let settings = self.current_settings()?;
        if !settings.reviews_enabled {
            return Err(GateDenial::ReviewsDisabled.into());
        }

        let have = self.reviews.count_by_reviewer(reviewer_id)?;
        let need = self.policy.min_reviews_to_finalize;
        if have < need {
            return Err(ReviewServiceError::NotEnoughReviews { have, need });
        }

        let now = Utc::now();
        let updated = self.users.mark_submitted(reviewer_id, now)?;
        Ok(FinalizeOutcome {
            submitted_at: updated.submitted_at.unwrap_or(now),
            newly_finalized: true,
        })
    }

    /// Ranked, paginated candidate recommendations for one reviewer.
    pub fn recommendations(
        &self,
        reviewer_id: &UserId,
        page: PageParams,
    ) -> Result<RecommendationPage, ReviewServiceError> {
        let reviewer = self
            .users
            .fetch(reviewer_id)?
            .ok_or(ReviewServiceError::UserNotFound)?;

        let pool = self.users.list()?;
        let reviewed: HashSet<UserId> = self
            .reviews
            .written_by(reviewer_id)?
            .into_iter()
            .map(|review| review.reviewee_id)
            .collect();

        let result = matching::recommend(&reviewer, &pool, &reviewed, page);

        self.emit_audit(AuditEvent::user_action(
            "RECOMMENDATIONS",
            "candidate recommendations requested",
            BTreeMap::from([
                ("user_id".to_string(), reviewer_id.0.clone()),
                ("skip".to_string(), page.skip.to_string()),
                ("take".to_string(), page.take.to_string()),
            ]),
        ));

        Ok(result)
    }

    /// Case-insensitive candidate search over name and department, scoped
    /// by the reviewer's programme visibility. Capped at
    /// `policy.search_take` rows.
    pub fn search_users(
        &self,
        reviewer_id: &UserId,
        query: &str,
    ) -> Result<Vec<CandidateSummary>, ReviewServiceError> {
        let reviewer = self
            .users
            .fetch(reviewer_id)?
            .ok_or(ReviewServiceError::UserNotFound)?;

        let needle = query.trim().to_lowercase();
        let reviewed: HashSet<UserId> = self
            .reviews
            .written_by(reviewer_id)?
            .into_iter()
            .map(|review| review.reviewee_id)
            .collect();

        let mut hits: Vec<CandidateSummary> = self
            .users
            .list()?
            .into_iter()
            .filter(|candidate| {
                candidate.id != reviewer.id
                    && !candidate.is_admin
                    && !candidate.is_dept_head
                    && candidate.accepting_reviews
                    && program_compatible(&reviewer, candidate)
            })
            .filter(|candidate| {
                needle.is_empty()
                    || candidate.name.to_lowercase().contains(&needle)
                    || candidate.department.to_lowercase().contains(&needle)
            })
            .map(|candidate| CandidateSummary {
                has_reviewed: reviewed.contains(&candidate.id),
                id: candidate.id,
                name: candidate.name,
                department: candidate.department,
                year: candidate.year,
                hostel: candidate.hostel,
                program: candidate.program,
            })
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name));
        hits.truncate(self.policy.search_take);

        self.emit_audit(AuditEvent::user_action(
            "SEARCH",
            "candidate search",
            BTreeMap::from([
                ("user_id".to_string(), reviewer_id.0.clone()),
                ("query".to_string(), query.to_string()),
                ("hits".to_string(), hits.len().to_string()),
            ]),
        ));

        Ok(hits)
    }

    /// Read-only kill-switch probe; absent settings count as enabled.
    pub fn reviews_enabled(&self) -> Result<bool, ReviewServiceError> {
        Ok(self.current_settings()?.reviews_enabled)
    }

    /// Cached settings read. Staleness up to the TTL is accepted: the
    /// kill-switch is an administrative control, not a safety gate. Absent
    /// settings rows fall back to the enabled default; the first admin
    /// toggle creates the row (find-or-create, first insert wins).
    fn current_settings(&self) -> Result<SystemSettings, RepositoryError> {
        let now = Instant::now();
        let mut cache = self
            .settings_cache
            .lock()
            .map_err(|_| RepositoryError::Unavailable("settings cache poisoned".to_string()))?;

        if let Some((fetched_at, snapshot)) = *cache {
            if now.duration_since(fetched_at) < self.policy.settings_cache_ttl {
                return Ok(snapshot);
            }
        }

        let snapshot = self.settings.load()?.unwrap_or_default();
        *cache = Some((now, snapshot));
        Ok(snapshot)
    }

    fn emit_audit(&self, event: AuditEvent) {
        if let Err(err) = self.audit.record(event) {
            tracing::warn!(error = %err, "audit event dropped");
        }
    }
}

/// Result of a finalize call. `newly_finalized` is false on idempotent
/// retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FinalizeOutcome {
    pub submitted_at: DateTime<Utc>,
    pub newly_finalized: bool,
}

/// One candidate row in a search response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSummary {
    pub id: UserId,
    pub name: String,
    pub department: String,
    pub year: u8,
    pub hostel: Option<String>,
    pub program: Program,
    pub has_reviewed: bool,
}

fn validate_ratings(ratings: &RatingSet) -> Result<(), ValidationError> {
    for (field, value) in ratings.fields() {
        if !(1..=5).contains(&value) {
            return Err(ValidationError::RatingOutOfRange { field, value });
        }
    }
    Ok(())
}

fn validate_texts(texts: &ReviewTexts) -> Result<(), ValidationError> {
    for (field, value) in texts.fields() {
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyText { field });
        }
    }
    Ok(())
}

/// Malformed submission input. Reported before any write happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("you cannot review yourself")]
    SelfReview,
    #[error("rating '{field}' must be an integer between 1 and 5 (got {value})")]
    RatingOutOfRange { field: &'static str, value: i32 },
    #[error("'{field}' is required and cannot be empty")]
    EmptyText { field: &'static str },
}

/// Error raised by the review service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Denied(#[from] GateDenial),
    #[error("at least {need} reviews are required before finalizing (have {have})")]
    NotEnoughReviews { have: usize, need: usize },
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
