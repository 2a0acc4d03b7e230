//! Peer review workflow: eligibility gating, candidate matching, the
//! submission lifecycle, and the admin aggregation views.

pub mod admin;
pub mod domain;
pub mod gating;
pub mod matching;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use admin::{
    AdminScope, AdminService, AdminServiceError, AuthorizationError, NamedReview,
    RatingDistribution, UserDetail, UserListFilter, UserListPage, UserWithCounts,
};
pub use domain::{
    program_compatible, Program, RatingSet, ReviewTexts, UserId, UserRecord,
};
pub use gating::{check_pair, GateDenial};
pub use matching::{recommend, PageParams, RecommendationPage, RecommendedCandidate};
pub use repository::{
    AuditError, AuditEvent, AuditKind, AuditSink, RepositoryError, ReviewDraft, ReviewRecord,
    ReviewRepository, SettingsRepository, SystemSettings, UserRepository,
};
pub use router::{review_router, ReviewPortal};
pub use service::{
    CandidateSummary, FinalizeOutcome, ReviewPolicy, ReviewService, ReviewServiceError,
    ValidationError,
};
