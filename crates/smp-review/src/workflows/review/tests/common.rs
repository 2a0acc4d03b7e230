use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::workflows::review::admin::AdminService;
use crate::workflows::review::domain::{
    Program, RatingSet, ReviewTexts, UserId, UserRecord,
};
use crate::workflows::review::repository::{
    AuditError, AuditEvent, AuditSink, RepositoryError, ReviewDraft, ReviewRecord,
    ReviewRepository, SettingsRepository, SystemSettings, UserRepository,
};
use crate::workflows::review::router::{review_router, ReviewPortal};
use crate::workflows::review::service::{ReviewPolicy, ReviewService};

pub(super) fn user(id: &str, name: &str, dept: &str) -> UserRecord {
    UserRecord {
        id: UserId(id.to_string()),
        email: format!("{id}@iitb.ac.in"),
        name: name.to_string(),
        department: dept.to_string(),
        year: 3,
        hostel: Some("Hostel 5".to_string()),
        pors: BTreeSet::new(),
        program: Program::Ismp,
        is_admin: false,
        is_dept_head: false,
        accepting_reviews: true,
        has_submitted: false,
        submitted_at: None,
        password_hash: "hash".to_string(),
    }
}

pub(super) fn admin_user(id: &str) -> UserRecord {
    let mut record = user(id, "Portal Admin", "Computer Science");
    record.is_admin = true;
    record
}

pub(super) fn dept_head(id: &str, dept: &str) -> UserRecord {
    let mut record = user(id, "Dept Head", dept);
    record.is_dept_head = true;
    record
}

pub(super) fn ratings(value: i32) -> RatingSet {
    RatingSet {
        approachability: value,
        academic_inclination: value,
        work_ethics: value,
        maturity: value,
        open_mindedness: value,
        academic_ethics: value,
    }
}

pub(super) fn texts() -> ReviewTexts {
    ReviewTexts {
        substance_abuse: "No concerns".to_string(),
        ismp_mentor: "Would mentor well".to_string(),
        other_comments: "Reliable teammate".to_string(),
    }
}

pub(super) fn test_policy() -> ReviewPolicy {
    ReviewPolicy {
        min_reviews_to_finalize: 5,
        // Zero TTL: every settings read goes to the repository, so tests
        // observe toggles immediately.
        settings_cache_ttl: Duration::ZERO,
        search_take: 50,
    }
}

#[derive(Default)]
pub(super) struct MemoryUsers {
    records: Mutex<HashMap<UserId, UserRecord>>,
}

impl MemoryUsers {
    pub(super) fn with(users: impl IntoIterator<Item = UserRecord>) -> Arc<Self> {
        let repo = Self::default();
        {
            let mut guard = repo.records.lock().expect("user mutex poisoned");
            for user in users {
                guard.insert(user.id.clone(), user);
            }
        }
        Arc::new(repo)
    }

    pub(super) fn get(&self, id: &str) -> Option<UserRecord> {
        self.records
            .lock()
            .expect("user mutex poisoned")
            .get(&UserId(id.to_string()))
            .cloned()
    }
}

impl UserRepository for MemoryUsers {
    fn insert(&self, user: UserRecord) -> Result<UserRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("user mutex poisoned");
        if guard.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn upsert_by_email(&self, user: UserRecord) -> Result<UserRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("user mutex poisoned");
        let existing_id = guard
            .values()
            .find(|existing| existing.email == user.email)
            .map(|existing| existing.id.clone());
        let mut user = user;
        if let Some(id) = existing_id {
            user.id = id;
        }
        guard.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<UserRecord>, RepositoryError> {
        let guard = self.records.lock().expect("user mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn fetch_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let guard = self.records.lock().expect("user mutex poisoned");
        Ok(guard.values().find(|user| user.email == email).cloned())
    }

    fn list(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        let guard = self.records.lock().expect("user mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn set_accepting_reviews(
        &self,
        id: &UserId,
        accepting: bool,
    ) -> Result<UserRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("user mutex poisoned");
        let user = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        user.accepting_reviews = accepting;
        Ok(user.clone())
    }

    fn mark_submitted(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("user mutex poisoned");
        let user = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if !user.has_submitted {
            user.has_submitted = true;
            user.submitted_at = Some(at);
        }
        Ok(user.clone())
    }
}

#[derive(Default)]
pub(super) struct MemoryReviews {
    records: Mutex<HashMap<(UserId, UserId), ReviewRecord>>,
}

impl MemoryReviews {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("review mutex poisoned").len()
    }
}

impl ReviewRepository for MemoryReviews {
    fn upsert(
        &self,
        draft: ReviewDraft,
        now: DateTime<Utc>,
    ) -> Result<ReviewRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("review mutex poisoned");
        let key = (draft.reviewer_id.clone(), draft.reviewee_id.clone());
        let record = match guard.get(&key) {
            Some(existing) => ReviewRecord {
                reviewer_id: draft.reviewer_id,
                reviewee_id: draft.reviewee_id,
                ratings: draft.ratings,
                texts: draft.texts,
                created_at: existing.created_at,
                updated_at: now,
            },
            None => ReviewRecord {
                reviewer_id: draft.reviewer_id,
                reviewee_id: draft.reviewee_id,
                ratings: draft.ratings,
                texts: draft.texts,
                created_at: now,
                updated_at: now,
            },
        };
        guard.insert(key, record.clone());
        Ok(record)
    }

    fn fetch(
        &self,
        reviewer: &UserId,
        reviewee: &UserId,
    ) -> Result<Option<ReviewRecord>, RepositoryError> {
        let guard = self.records.lock().expect("review mutex poisoned");
        Ok(guard.get(&(reviewer.clone(), reviewee.clone())).cloned())
    }

    fn count_by_reviewer(&self, reviewer: &UserId) -> Result<usize, RepositoryError> {
        let guard = self.records.lock().expect("review mutex poisoned");
        Ok(guard
            .keys()
            .filter(|(writer, _)| writer == reviewer)
            .count())
    }

    fn written_by(&self, reviewer: &UserId) -> Result<Vec<ReviewRecord>, RepositoryError> {
        let guard = self.records.lock().expect("review mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.reviewer_id == *reviewer)
            .cloned()
            .collect())
    }

    fn received_by(&self, reviewee: &UserId) -> Result<Vec<ReviewRecord>, RepositoryError> {
        let guard = self.records.lock().expect("review mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.reviewee_id == *reviewee)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemorySettings {
    current: Mutex<Option<SystemSettings>>,
}

impl MemorySettings {
    pub(super) fn disabled() -> Arc<Self> {
        let repo = Self::default();
        *repo.current.lock().expect("settings mutex poisoned") = Some(SystemSettings {
            reviews_enabled: false,
        });
        Arc::new(repo)
    }
}

impl SettingsRepository for MemorySettings {
    fn load(&self) -> Result<Option<SystemSettings>, RepositoryError> {
        Ok(*self.current.lock().expect("settings mutex poisoned"))
    }

    fn store(&self, settings: SystemSettings) -> Result<SystemSettings, RepositoryError> {
        *self.current.lock().expect("settings mutex poisoned") = Some(settings);
        Ok(settings)
    }
}

#[derive(Default)]
pub(super) struct MemoryAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAudit {
    pub(super) fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.events.lock().expect("audit mutex poisoned").push(event);
        Ok(())
    }
}

/// Audit sink that always fails; operations must still succeed.
pub(super) struct BrokenAudit;

impl AuditSink for BrokenAudit {
    fn record(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Err(AuditError::Transport("log volume full".to_string()))
    }
}

pub(super) struct Fixture {
    pub(super) users: Arc<MemoryUsers>,
    pub(super) reviews: Arc<MemoryReviews>,
    pub(super) settings: Arc<MemorySettings>,
    pub(super) audit: Arc<MemoryAudit>,
    pub(super) service: ReviewService<MemoryUsers, MemoryReviews, MemorySettings, MemoryAudit>,
}

pub(super) fn fixture(seed: impl IntoIterator<Item = UserRecord>) -> Fixture {
    fixture_with_settings(seed, Arc::new(MemorySettings::default()))
}

pub(super) fn fixture_with_settings(
    seed: impl IntoIterator<Item = UserRecord>,
    settings: Arc<MemorySettings>,
) -> Fixture {
    let users = MemoryUsers::with(seed);
    let reviews = Arc::new(MemoryReviews::default());
    let audit = Arc::new(MemoryAudit::default());
    let service = ReviewService::new(
        users.clone(),
        reviews.clone(),
        settings.clone(),
        audit.clone(),
        test_policy(),
    );
    Fixture {
        users,
        reviews,
        settings,
        audit,
        service,
    }
}

pub(super) fn admin_service(
    fixture: &Fixture,
) -> AdminService<MemoryUsers, MemoryReviews, MemorySettings, MemoryAudit> {
    AdminService::new(
        fixture.users.clone(),
        fixture.reviews.clone(),
        fixture.settings.clone(),
        fixture.audit.clone(),
    )
}

pub(super) fn portal_router(fixture: Fixture) -> axum::Router {
    let admin = admin_service(&fixture);
    review_router(ReviewPortal {
        reviews: Arc::new(fixture.service),
        admin: Arc::new(admin),
    })
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
