//! Eligibility rules for a (reviewer, reviewee) pair.
//!
//! Pure decision logic over a read snapshot: the caller fetches fresh
//! records, asks here, then writes. No transactional guarantee is attempted
//! between the check and the write; contention on an academic review portal
//! is low and the only racy terminal write (finalization) is idempotent.

use serde::{Deserialize, Serialize};

use super::domain::{program_compatible, UserRecord};
use super::repository::SystemSettings;

/// Why a review write was refused. Every variant carries a message specific
/// enough for the UI to show an actionable explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum GateDenial {
    #[error("review submissions are currently disabled")]
    ReviewsDisabled,
    #[error("this user is not currently accepting reviews")]
    RevieweeNotAccepting,
    #[error("department-scoped applicants can only review their own department")]
    CrossDepartmentDenied,
    #[error("you can only review applicants from your own program")]
    CrossProgramDenied,
    #[error("your reviews were already finalized and can no longer change")]
    AlreadyFinalized,
}

/// Ordered gate: the first failing rule wins.
///
/// The `AlreadyFinalized` check duplicates the submission state machine on
/// purpose; a stale snapshot slipping past the service must still be
/// refused here.
pub fn check_pair(
    reviewer: &UserRecord,
    reviewee: &UserRecord,
    settings: SystemSettings,
) -> Result<(), GateDenial> {
    if !settings.reviews_enabled {
        return Err(GateDenial::ReviewsDisabled);
    }

    if !reviewee.accepting_reviews {
        return Err(GateDenial::RevieweeNotAccepting);
    }

    if reviewer.program != reviewee.program {
        return Err(GateDenial::CrossProgramDenied);
    }
    if !program_compatible(reviewer, reviewee) {
        return Err(GateDenial::CrossDepartmentDenied);
    }

    if reviewer.has_submitted {
        return Err(GateDenial::AlreadyFinalized);
    }

    Ok(())
}
