//! Read-mostly admin views and the two administrative toggles.
//!
//! Authorization is decided once per operation by resolving the caller to
//! an [`AdminScope`] capability instead of re-checking role booleans at
//! every branch. Rating distributions are recomputed from raw review rows
//! on every call; nothing aggregated is persisted.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{RatingSet, UserId, UserRecord};
use super::matching::PageParams;
use super::repository::{
    AuditEvent, AuditSink, RepositoryError, ReviewRecord, ReviewRepository, SettingsRepository,
    SystemSettings, UserRepository,
};

/// What an elevated caller is allowed to touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminScope {
    /// Full administrators act on anyone.
    Full,
    /// Department heads act only on department-programme users of their
    /// own department.
    Department(String),
}

impl AdminScope {
    /// Resolve a user's role flags to a capability, admin winning over
    /// dept-head when both are set.
    pub fn for_user(user: &UserRecord) -> Option<Self> {
        if user.is_admin {
            Some(AdminScope::Full)
        } else if user.is_dept_head {
            Some(AdminScope::Department(user.department.clone()))
        } else {
            None
        }
    }

    fn allows_accepting_toggle(&self, target: &UserRecord) -> bool {
        match self {
            AdminScope::Full => true,
            AdminScope::Department(department) => {
                target.program.is_department_scoped() && target.department == *department
            }
        }
    }
}

/// Caller lacks the role or scope for an admin operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("admin access required")]
    AdminRequired,
    #[error("admin or department head access required")]
    ElevatedRoleRequired,
    #[error("department heads can only act on department-programme users of their own department")]
    OutsideDepartment,
}

/// Error raised by the admin service.
#[derive(Debug, thiserror::Error)]
pub enum AdminServiceError {
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Filters for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserListFilter {
    /// Case-insensitive substring over name and email.
    pub search: Option<String>,
    /// Exact canonical department.
    pub department: Option<String>,
}

/// One row of the admin user listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserWithCounts {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub department: String,
    pub has_submitted: bool,
    pub reviews_written: usize,
    pub reviews_received: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserListPage {
    pub users: Vec<UserWithCounts>,
    pub has_more: bool,
}

/// A review row with the counterpart's display name resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedReview {
    pub counterpart_id: UserId,
    pub counterpart_name: String,
    pub ratings: RatingSet,
    pub average: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-field histogram over the reviews a user received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingDistribution {
    pub field: &'static str,
    /// Count of received ratings with value 1 through 5.
    pub counts: [u32; 5],
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDetail {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub department: String,
    pub has_submitted: bool,
    pub reviews_written: Vec<NamedReview>,
    pub reviews_received: Vec<NamedReview>,
    pub rating_distributions: Vec<RatingDistribution>,
}

/// Service behind the admin dashboard.
pub struct AdminService<U, R, S, A> {
    users: Arc<U>,
    reviews: Arc<R>,
    settings: Arc<S>,
    audit: Arc<A>,
}

impl<U, R, S, A> AdminService<U, R, S, A>
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    S: SettingsRepository + 'static,
    A: AuditSink + 'static,
{
    pub fn new(users: Arc<U>, reviews: Arc<R>, settings: Arc<S>, audit: Arc<A>) -> Self {
        Self {
            users,
            reviews,
            settings,
            audit,
        }
    }

    /// Paginated user listing with review counts. Admin only; admin
    /// accounts themselves never appear in the listing.
    pub fn list_users(
        &self,
        actor_id: &UserId,
        filter: &UserListFilter,
        page: PageParams,
    ) -> Result<UserListPage, AdminServiceError> {
        self.require_full_admin(actor_id)?;

        let needle = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matches: Vec<UserRecord> = self
            .users
            .list()?
            .into_iter()
            .filter(|user| !user.is_admin)
            .filter(|user| match &needle {
                Some(needle) => {
                    user.name.to_lowercase().contains(needle)
                        || user.email.to_lowercase().contains(needle)
                }
                None => true,
            })
            .filter(|user| match &filter.department {
                Some(department) => user.department == *department,
                None => true,
            })
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));

        let has_more = matches.len() > page.skip.saturating_add(page.take);
        let mut users = Vec::new();
        for user in matches.into_iter().skip(page.skip).take(page.take) {
            users.push(UserWithCounts {
                reviews_written: self.reviews.written_by(&user.id)?.len(),
                reviews_received: self.reviews.received_by(&user.id)?.len(),
                id: user.id,
                name: user.name,
                email: user.email,
                department: user.department,
                has_submitted: user.has_submitted,
            });
        }

        self.emit_audit(AuditEvent::user_action(
            "ADMIN_USER_SEARCH",
            "admin listed users",
            BTreeMap::from([
                ("actor_id".to_string(), actor_id.0.clone()),
                (
                    "search".to_string(),
                    filter.search.clone().unwrap_or_default(),
                ),
                (
                    "department".to_string(),
                    filter.department.clone().unwrap_or_default(),
                ),
                ("skip".to_string(), page.skip.to_string()),
            ]),
        ));

        Ok(UserListPage { users, has_more })
    }

    /// Everything an admin sees about one user: reviews in both
    /// directions with names resolved, plus per-field rating histograms
    /// over the received set.
    pub fn user_detail(
        &self,
        actor_id: &UserId,
        user_id: &UserId,
    ) -> Result<UserDetail, AdminServiceError> {
        self.require_full_admin(actor_id)?;

        let target = self
            .users
            .fetch(user_id)?
            .ok_or(AdminServiceError::UserNotFound)?;

        let names: HashMap<UserId, String> = self
            .users
            .list()?
            .into_iter()
            .map(|user| (user.id, user.name))
            .collect();

        let written = self.reviews.written_by(user_id)?;
        let received = self.reviews.received_by(user_id)?;
        let distributions = rating_distributions(&received);

        Ok(UserDetail {
            id: target.id,
            name: target.name,
            email: target.email,
            department: target.department,
            has_submitted: target.has_submitted,
            reviews_written: written
                .into_iter()
                .map(|review| named_review(review, &names, Direction::Written))
                .collect(),
            reviews_received: received
                .into_iter()
                .map(|review| named_review(review, &names, Direction::Received))
                .collect(),
            rating_distributions: distributions,
        })
    }

    /// Global kill-switch toggle. Find-or-create on the settings
    /// singleton: the stored row is replaced wholesale, so a concurrent
    /// duplicate creator converges on identical content.
    pub fn set_reviews_enabled(
        &self,
        actor_id: &UserId,
        enabled: bool,
    ) -> Result<SystemSettings, AdminServiceError> {
        self.require_full_admin(actor_id)?;

        let mut current = self.settings.load()?.unwrap_or_default();
        current.reviews_enabled = enabled;
        let stored = self.settings.store(current)?;

        self.emit_audit(AuditEvent::user_action(
            "ADMIN_TOGGLE_REVIEWS",
            "global review toggle changed",
            BTreeMap::from([
                ("actor_id".to_string(), actor_id.0.clone()),
                ("enabled".to_string(), enabled.to_string()),
            ]),
        ));

        Ok(stored)
    }

    /// Per-user accepting-reviews toggle. Admins act on anyone;
    /// department heads only inside their capability scope.
    pub fn set_accepting_reviews(
        &self,
        actor_id: &UserId,
        user_id: &UserId,
        accepting: bool,
    ) -> Result<UserRecord, AdminServiceError> {
        let scope = self.require_elevated(actor_id)?;

        let target = self
            .users
            .fetch(user_id)?
            .ok_or(AdminServiceError::UserNotFound)?;
        if !scope.allows_accepting_toggle(&target) {
            return Err(AuthorizationError::OutsideDepartment.into());
        }

        let updated = self.users.set_accepting_reviews(user_id, accepting)?;

        self.emit_audit(AuditEvent::user_action(
            "ADMIN_TOGGLE_USER_REVIEWS",
            "per-user review toggle changed",
            BTreeMap::from([
                ("actor_id".to_string(), actor_id.0.clone()),
                ("user_id".to_string(), user_id.0.clone()),
                ("accepting".to_string(), accepting.to_string()),
            ]),
        ));

        Ok(updated)
    }

    fn require_full_admin(&self, actor_id: &UserId) -> Result<(), AdminServiceError> {
        match self.scope_of(actor_id)? {
            Some(AdminScope::Full) => Ok(()),
            _ => Err(AuthorizationError::AdminRequired.into()),
        }
    }

    fn require_elevated(&self, actor_id: &UserId) -> Result<AdminScope, AdminServiceError> {
        self.scope_of(actor_id)?
            .ok_or_else(|| AuthorizationError::ElevatedRoleRequired.into())
    }

    fn scope_of(&self, actor_id: &UserId) -> Result<Option<AdminScope>, AdminServiceError> {
        let actor = self
            .users
            .fetch(actor_id)?
            .ok_or(AdminServiceError::UserNotFound)?;
        Ok(AdminScope::for_user(&actor))
    }

    fn emit_audit(&self, event: AuditEvent) {
        if let Err(err) = self.audit.record(event) {
            tracing::warn!(error = %err, "audit event dropped");
        }
    }
}

enum Direction {
    Written,
    Received,
}

fn named_review(
    review: ReviewRecord,
    names: &HashMap<UserId, String>,
    direction: Direction,
) -> NamedReview {
    let counterpart_id = match direction {
        Direction::Written => review.reviewee_id.clone(),
        Direction::Received => review.reviewer_id.clone(),
    };
    let counterpart_name = names
        .get(&counterpart_id)
        .cloned()
        .unwrap_or_else(|| "(unknown)".to_string());

    NamedReview {
        counterpart_id,
        counterpart_name,
        average: review.average_rating(),
        ratings: review.ratings,
        created_at: review.created_at,
        updated_at: review.updated_at,
    }
}

/// Histogram and mean per rating field over a set of received reviews.
/// Empty input yields zero counts and a mean of 0.
fn rating_distributions(received: &[ReviewRecord]) -> Vec<RatingDistribution> {
    let field_names = RatingSet {
        approachability: 0,
        academic_inclination: 0,
        work_ethics: 0,
        maturity: 0,
        open_mindedness: 0,
        academic_ethics: 0,
    }
    .fields()
    .map(|(field, _)| field);

    field_names
        .into_iter()
        .enumerate()
        .map(|(index, field)| {
            let mut counts = [0u32; 5];
            let mut sum = 0i64;
            let mut total = 0u32;
            for review in received {
                let (_, value) = review.ratings.fields()[index];
                if (1..=5).contains(&value) {
                    counts[(value - 1) as usize] += 1;
                    sum += i64::from(value);
                    total += 1;
                }
            }
            let mean = if total == 0 {
                0.0
            } else {
                sum as f64 / f64::from(total)
            };
            RatingDistribution {
                field,
                counts,
                mean,
            }
        })
        .collect()
}
