use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for portal accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Admission track a student is applying under. Department-scoped mentors
/// only ever see their own department; institute-wide mentors see the whole
/// programme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Program {
    /// Department-scoped mentorship programme.
    Damp,
    /// Institute-wide mentorship programme.
    Ismp,
}

impl Program {
    pub const fn label(self) -> &'static str {
        match self {
            Program::Damp => "damp",
            Program::Ismp => "ismp",
        }
    }

    /// True when the programme restricts visibility to one department.
    pub const fn is_department_scoped(self) -> bool {
        matches!(self, Program::Damp)
    }
}

/// Account snapshot as stored by the persistence collaborator. Fields are
/// canonical: department/hostel/POR strings already went through the intake
/// normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub department: String,
    pub year: u8,
    pub hostel: Option<String>,
    pub pors: BTreeSet<String>,
    pub program: Program,
    pub is_admin: bool,
    pub is_dept_head: bool,
    pub accepting_reviews: bool,
    pub has_submitted: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub password_hash: String,
}

impl UserRecord {
    /// Invariant check: `submitted_at` is set exactly when `has_submitted`.
    pub fn submission_state_consistent(&self) -> bool {
        self.has_submitted == self.submitted_at.is_some()
    }
}

/// Whether `reviewer` may see (and thus review) `reviewee` at all, under
/// the programme rules. Department-scoped pairs must share a department;
/// cross-programme visibility is never allowed.
pub fn program_compatible(reviewer: &UserRecord, reviewee: &UserRecord) -> bool {
    if reviewer.program != reviewee.program {
        return false;
    }
    if reviewer.program.is_department_scoped() {
        return reviewer.department == reviewee.department;
    }
    true
}

/// Six star ratings, each expected in [1, 5].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSet {
    pub approachability: i32,
    pub academic_inclination: i32,
    pub work_ethics: i32,
    pub maturity: i32,
    pub open_mindedness: i32,
    pub academic_ethics: i32,
}

impl RatingSet {
    /// Field-name/value pairs in a fixed order, for validation and for the
    /// admin distribution views.
    pub fn fields(&self) -> [(&'static str, i32); 6] {
        [
            ("approachability", self.approachability),
            ("academic_inclination", self.academic_inclination),
            ("work_ethics", self.work_ethics),
            ("maturity", self.maturity),
            ("open_mindedness", self.open_mindedness),
            ("academic_ethics", self.academic_ethics),
        ]
    }
}

/// Free-text portions of a review. All three are required non-empty at
/// submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewTexts {
    pub substance_abuse: String,
    pub ismp_mentor: String,
    pub other_comments: String,
}

impl ReviewTexts {
    pub fn fields(&self) -> [(&'static str, &str); 3] {
        [
            ("substance_abuse", &self.substance_abuse),
            ("ismp_mentor", &self.ismp_mentor),
            ("other_comments", &self.other_comments),
        ]
    }
}
