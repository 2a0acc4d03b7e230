//! Core workflows for the SMP peer review portal.
//!
//! The `workflows::intake` module normalizes survey data and seeds user
//! accounts from tabular exports; `workflows::review` holds the gating
//! rules, the candidate matching engine, the submission lifecycle, and the
//! admin aggregation views. Persistence, identity, and audit logging are
//! reached through traits so the service layer can be exercised against
//! in-memory adapters.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
