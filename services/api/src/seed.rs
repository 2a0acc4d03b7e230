//! Offline check of a user export before pointing `APP_SEED_CSV` at it.
//!
//! Runs the same import pipeline as the server boot path against a
//! throwaway store, so normalization problems surface before a deploy.

use smp_review::error::AppError;
use smp_review::workflows::intake::UserImporter;
use smp_review::workflows::review::UserRepository;

use crate::cli::SeedArgs;
use crate::infra::{InMemoryUserRepository, SeedPasswordHasher};

pub(crate) fn run_seed(args: SeedArgs) -> Result<(), AppError> {
    let users = InMemoryUserRepository::default();
    let hasher = SeedPasswordHasher::from_env();

    let summary = UserImporter::from_path(&args.csv, &users, &hasher)?;
    println!(
        "{}: {} account(s) would be created, {} updated",
        args.csv.display(),
        summary.created,
        summary.updated
    );

    if args.verbose {
        let mut accounts = users.list().map_err(to_app_error)?;
        accounts.sort_by(|a, b| a.email.cmp(&b.email));
        for account in accounts {
            println!(
                "  {} | {} | {} | year {} | {} | {}",
                account.email,
                account.name,
                account.department,
                account.year,
                account.hostel.as_deref().unwrap_or("-"),
                account.program.label(),
            );
        }
    }

    Ok(())
}

fn to_app_error(err: smp_review::workflows::review::RepositoryError) -> AppError {
    AppError::Seed(err.into())
}
