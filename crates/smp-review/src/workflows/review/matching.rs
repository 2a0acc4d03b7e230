//! Candidate recommendation engine.
//!
//! Ranks the candidate pool for one reviewer by profile overlap. All
//! arithmetic is integer and the sort is a total order, so a given snapshot
//! always produces the same page.

use std::cmp::Reverse;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::domain::{program_compatible, Program, UserId, UserRecord};

const DEPARTMENT_POINTS: i32 = 2;
const HOSTEL_POINTS: i32 = 3;
const SHARED_POR_POINTS: i32 = 2;
const COMPOUND_BONUS_PER_MATCH: i32 = 3;

const MATCH_TAG_SEPARATOR: &str = " \u{2022} ";

/// Skip/take paging parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageParams {
    pub skip: usize,
    pub take: usize,
}

/// One ranked candidate row, shaped for the recommendation response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedCandidate {
    pub id: UserId,
    pub name: String,
    pub department: String,
    pub year: u8,
    pub hostel: Option<String>,
    pub program: Program,
    pub match_tag: String,
    pub match_score: i32,
    pub match_count: u32,
    pub has_reviewed: bool,
}

/// A page of ranked candidates plus a flag telling the client whether
/// another page exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationPage {
    pub candidates: Vec<RecommendedCandidate>,
    pub has_more: bool,
}

/// Rank the pool for `reviewer` and cut one page.
///
/// `reviewed` is the set of reviewee ids this reviewer already wrote about,
/// used only for the `has_reviewed` flag; already-reviewed candidates stay
/// in the pool so the client can offer editing.
pub fn recommend(
    reviewer: &UserRecord,
    pool: &[UserRecord],
    reviewed: &HashSet<UserId>,
    page: PageParams,
) -> RecommendationPage {
    let mut ranked: Vec<RecommendedCandidate> = pool
        .iter()
        .filter(|candidate| eligible(reviewer, candidate))
        .filter_map(|candidate| {
            let overlap = score_overlap(reviewer, candidate)?;
            Some(RecommendedCandidate {
                id: candidate.id.clone(),
                name: candidate.name.clone(),
                department: candidate.department.clone(),
                year: candidate.year,
                hostel: candidate.hostel.clone(),
                program: candidate.program,
                match_tag: overlap.tag(),
                match_score: overlap.score,
                match_count: overlap.count,
                has_reviewed: reviewed.contains(&candidate.id),
            })
        })
        .collect();

    // Three-level tie-break: match count, then score, then the canonical
    // display name (case-sensitive) so equal profiles rank alphabetically.
    ranked.sort_by(|a, b| {
        (Reverse(a.match_count), Reverse(a.match_score), &a.name)
            .cmp(&(Reverse(b.match_count), Reverse(b.match_score), &b.name))
    });

    let has_more = ranked.len() > page.skip.saturating_add(page.take);
    let candidates = ranked
        .into_iter()
        .skip(page.skip)
        .take(page.take)
        .collect();

    RecommendationPage {
        candidates,
        has_more,
    }
}

fn eligible(reviewer: &UserRecord, candidate: &UserRecord) -> bool {
    candidate.id != reviewer.id
        && !candidate.is_admin
        && !candidate.is_dept_head
        && candidate.accepting_reviews
        && program_compatible(reviewer, candidate)
}

struct Overlap {
    score: i32,
    count: u32,
    reasons: Vec<String>,
}

impl Overlap {
    fn tag(&self) -> String {
        self.reasons.join(MATCH_TAG_SEPARATOR)
    }
}

/// Compute the overlap breakdown, or `None` when nothing matches (such
/// candidates never appear in recommendations).
fn score_overlap(reviewer: &UserRecord, candidate: &UserRecord) -> Option<Overlap> {
    let mut score = 0;
    let mut count = 0;
    let mut reasons = Vec::new();

    if candidate.department == reviewer.department {
        score += DEPARTMENT_POINTS;
        count += 1;
        reasons.push("Same Dept".to_string());
    }

    if let (Some(mine), Some(theirs)) = (&reviewer.hostel, &candidate.hostel) {
        if mine == theirs {
            score += HOSTEL_POINTS;
            count += 1;
            reasons.push("Same Hostel".to_string());
        }
    }

    let shared_pors = reviewer.pors.intersection(&candidate.pors).count() as i32;
    if shared_pors > 0 {
        score += shared_pors * SHARED_POR_POINTS;
        count += 1;
        reasons.push(format!("{shared_pors} Shared POR(s)"));
    }

    if count == 0 {
        return None;
    }

    if count > 1 {
        score += i32::try_from(count).unwrap_or(i32::MAX) * COMPOUND_BONUS_PER_MATCH;
    }

    Some(Overlap {
        score,
        count,
        reasons,
    })
}
