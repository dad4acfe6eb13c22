//! Build orchestration.
//!
//! The [`Bundler`] runs a [`BuildRequest`](crate::bundler::BuildRequest) job
//! by job. Each job goes through the same state machine:
//!
//! 1. Re-probe the target's host tools
//! 2. Remove stale artifacts from the output directory
//! 3. Stage, provision and invoke through the target's driver
//! 4. Verify exactly one non-empty artifact and checksum it
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA256 checksum calculation for artifacts
//! - [`orchestrator`] - [`Bundler`], [`JobRunner`] and the job state machine

pub mod checksum;
pub mod orchestrator;

pub use checksum::calculate_sha256;
pub use orchestrator::{
    Bundler, DriverJobRunner, JobRunner, execute_job, find_artifacts, verify_artifact,
};
