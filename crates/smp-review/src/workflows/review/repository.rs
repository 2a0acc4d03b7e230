use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{RatingSet, ReviewTexts, UserId, UserRecord};

/// One review row: unique per ordered (reviewer, reviewee) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub reviewer_id: UserId,
    pub reviewee_id: UserId,
    pub ratings: RatingSet,
    pub texts: ReviewTexts,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewRecord {
    /// Arithmetic mean of the six ratings, for the admin detail view.
    pub fn average_rating(&self) -> f64 {
        let sum: i32 = self.ratings.fields().iter().map(|(_, value)| value).sum();
        f64::from(sum) / 6.0
    }
}

/// Validated field set handed to the store's upsert. The store decides
/// whether it becomes a new row or replaces an existing one.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDraft {
    pub reviewer_id: UserId,
    pub reviewee_id: UserId,
    pub ratings: RatingSet,
    pub texts: ReviewTexts,
}

/// Singleton administrative settings. Created lazily on first write; absent
/// settings mean reviews are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSettings {
    pub reviews_enabled: bool,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            reviews_enabled: true,
        }
    }
}

/// Account storage abstraction so the services can be exercised in
/// isolation. Implementations must enforce email uniqueness.
pub trait UserRepository: Send + Sync {
    fn insert(&self, user: UserRecord) -> Result<UserRecord, RepositoryError>;
    fn upsert_by_email(&self, user: UserRecord) -> Result<UserRecord, RepositoryError>;
    fn fetch(&self, id: &UserId) -> Result<Option<UserRecord>, RepositoryError>;
    fn fetch_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;
    /// Full account snapshot. The population is bounded (one student body),
    /// so filtering happens in the core over this snapshot.
    fn list(&self) -> Result<Vec<UserRecord>, RepositoryError>;
    fn set_accepting_reviews(
        &self,
        id: &UserId,
        accepting: bool,
    ) -> Result<UserRecord, RepositoryError>;
    /// One-way transition: sets `has_submitted` and stamps `submitted_at`.
    fn mark_submitted(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, RepositoryError>;
}

/// Review storage. The pair-uniqueness constraint lives here, not in the
/// service, so concurrent submissions cannot race into duplicate rows.
pub trait ReviewRepository: Send + Sync {
    /// Create the row if the pair is new, otherwise replace every rateable
    /// and text field in place. `now` becomes `updated_at`, and `created_at`
    /// on first write.
    fn upsert(
        &self,
        draft: ReviewDraft,
        now: DateTime<Utc>,
    ) -> Result<ReviewRecord, RepositoryError>;
    fn fetch(
        &self,
        reviewer: &UserId,
        reviewee: &UserId,
    ) -> Result<Option<ReviewRecord>, RepositoryError>;
    fn count_by_reviewer(&self, reviewer: &UserId) -> Result<usize, RepositoryError>;
    fn written_by(&self, reviewer: &UserId) -> Result<Vec<ReviewRecord>, RepositoryError>;
    fn received_by(&self, reviewee: &UserId) -> Result<Vec<ReviewRecord>, RepositoryError>;
}

/// Settings storage. `load` returning `None` means no row exists yet.
pub trait SettingsRepository: Send + Sync {
    fn load(&self) -> Result<Option<SystemSettings>, RepositoryError>;
    fn store(&self, settings: SystemSettings) -> Result<SystemSettings, RepositoryError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Structured audit record shipped to the log collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub kind: AuditKind,
    pub category: String,
    pub message: String,
    pub metadata: BTreeMap<String, String>,
}

impl AuditEvent {
    pub fn user_action(
        category: impl Into<String>,
        message: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            kind: AuditKind::UserAction,
            category: category.into(),
            message: message.into(),
            metadata,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Info,
    Warn,
    Error,
    UserAction,
}

/// Outbound audit hook. Delivery is fire-and-forget: callers log failures
/// and move on, an operation never fails because its audit record did.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError>;
}

/// Audit dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit transport unavailable: {0}")]
    Transport(String),
}
