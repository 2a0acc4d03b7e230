use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use sha2::{Digest, Sha256};
use smp_review::workflows::intake::{HashError, PasswordHasher};
use smp_review::workflows::review::{
    AuditError, AuditEvent, AuditKind, AuditSink, RepositoryError, ReviewDraft, ReviewRecord,
    ReviewRepository, SettingsRepository, SystemSettings, UserId, UserRecord, UserRepository,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryUserRepository {
    records: Mutex<HashMap<UserId, UserRecord>>,
}

impl UserRepository for InMemoryUserRepository {
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

    fn mark_submitted(&self, id: &UserId, at: DateTime<Utc>) -> Result<UserRecord, RepositoryError> {
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
pub(crate) struct InMemoryReviewRepository {
    records: Mutex<HashMap<(UserId, UserId), ReviewRecord>>,
}

impl ReviewRepository for InMemoryReviewRepository {
    fn upsert(
        &self,
        draft: ReviewDraft,
        now: DateTime<Utc>,
    ) -> Result<ReviewRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("review mutex poisoned");
        let key = (draft.reviewer_id.clone(), draft.reviewee_id.clone());
        let created_at = guard.get(&key).map(|row| row.created_at).unwrap_or(now);
        let record = ReviewRecord {
            reviewer_id: draft.reviewer_id,
            reviewee_id: draft.reviewee_id,
            ratings: draft.ratings,
            texts: draft.texts,
            created_at,
            updated_at: now,
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
        Ok(guard.keys().filter(|(writer, _)| writer == reviewer).count())
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
pub(crate) struct InMemorySettingsRepository {
    current: Mutex<Option<SystemSettings>>,
}

impl SettingsRepository for InMemorySettingsRepository {
    fn load(&self) -> Result<Option<SystemSettings>, RepositoryError> {
        Ok(*self.current.lock().expect("settings mutex poisoned"))
    }

    fn store(&self, settings: SystemSettings) -> Result<SystemSettings, RepositoryError> {
        *self.current.lock().expect("settings mutex poisoned") = Some(settings);
        Ok(settings)
    }
}

/// Audit sink that forwards user actions to the structured log stream.
#[derive(Default)]
pub(crate) struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        match event.kind {
            AuditKind::Error => {
                tracing::error!(category = %event.category, metadata = ?event.metadata, "{}", event.message)
            }
            AuditKind::Warn => {
                tracing::warn!(category = %event.category, metadata = ?event.metadata, "{}", event.message)
            }
            AuditKind::Info | AuditKind::UserAction => {
                tracing::info!(category = %event.category, metadata = ?event.metadata, "{}", event.message)
            }
        }
        Ok(())
    }
}

/// Salted SHA-256 hasher for seeded credentials. Sessions and login live
/// outside this service, so the stored hash only has to be stable and
/// non-reversible; deployments that terminate auth here should swap in a
/// real KDF behind the same trait.
pub(crate) struct SeedPasswordHasher {
    salt: String,
}

impl SeedPasswordHasher {
    pub(crate) fn from_env() -> Self {
        Self {
            salt: std::env::var("APP_SEED_SALT").unwrap_or_else(|_| "smp-review".to_string()),
        }
    }
}

impl PasswordHasher for SeedPasswordHasher {
    fn hash(&self, plain: &str) -> Result<String, HashError> {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(b"$");
        hasher.update(plain.as_bytes());
        Ok(format!("sha256${}${:x}", self.salt, hasher.finalize()))
    }
}
