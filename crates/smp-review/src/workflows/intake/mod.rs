//! Bulk account ingestion from tabular survey exports.
//!
//! Rows pass through the normalizer exactly once; the rest of the system
//! only ever sees canonical department/hostel/POR values.

pub mod normalizer;
mod parser;

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::workflows::review::domain::{UserId, UserRecord};
use crate::workflows::review::repository::{RepositoryError, UserRepository};

pub use normalizer::{normalize, FieldKind};

/// Hashing is an external primitive: the importer only needs something
/// that turns a plaintext password into a storable hash.
pub trait PasswordHasher {
    fn hash(&self, plain: &str) -> Result<String, HashError>;
}

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(pub String);

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read user export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid user CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("rejected row for '{email}': {reason}")]
    Row { email: String, reason: &'static str },
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error("could not store imported user: {0}")]
    Repository(#[from] RepositoryError),
}

/// Outcome counters for one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
}

static USER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_user_id() -> UserId {
    let id = USER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    UserId(format!("user-{id:06}"))
}

/// Reads a delimited user table, normalizes it, hashes passwords, and
/// upserts accounts by email.
pub struct UserImporter;

impl UserImporter {
    pub fn from_path<P, U, H>(path: P, users: &U, hasher: &H) -> Result<ImportSummary, ImportError>
    where
        P: AsRef<Path>,
        U: UserRepository,
        H: PasswordHasher,
    {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, users, hasher)
    }

    pub fn from_reader<R, U, H>(
        reader: R,
        users: &U,
        hasher: &H,
    ) -> Result<ImportSummary, ImportError>
    where
        R: Read,
        U: UserRepository,
        H: PasswordHasher,
    {
        let mut summary = ImportSummary::default();

        for record in parser::parse_records(reader)? {
            let existing = users.fetch_by_email(&record.email)?;
            let password_hash = match &existing {
                // Re-seeding refreshes profile fields but keeps the stored
                // credential, as the original seeding script did.
                Some(user) => user.password_hash.clone(),
                None => hasher.hash(&record.password)?,
            };

            let user = UserRecord {
                id: existing
                    .as_ref()
                    .map(|user| user.id.clone())
                    .unwrap_or_else(next_user_id),
                email: record.email,
                name: record.name,
                department: record.department,
                year: record.year,
                hostel: record.hostel,
                pors: record.pors.into_iter().collect::<BTreeSet<_>>(),
                program: record.program,
                is_admin: record.is_admin,
                is_dept_head: record.is_dept_head,
                accepting_reviews: existing
                    .as_ref()
                    .map(|user| user.accepting_reviews)
                    .unwrap_or(true),
                has_submitted: existing
                    .as_ref()
                    .map(|user| user.has_submitted)
                    .unwrap_or(false),
                submitted_at: existing.as_ref().and_then(|user| user.submitted_at),
                password_hash,
            };

            users.upsert_by_email(user)?;
            if existing.is_some() {
                summary.updated += 1;
            } else {
                summary.created += 1;
            }
        }

        Ok(summary)
    }
}
