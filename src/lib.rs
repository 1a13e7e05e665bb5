//! prj - a personal project registry
//!
//! Keeps a list of repository identifiers in a plain text registry, maps each
//! one to a checkout at `projects_dir/owner/name` and reports how every
//! checkout stands against its upstream.

pub mod cli;
pub mod config;
pub mod format;
pub mod git;
pub mod identifier;
pub mod inspect;
pub mod registry;
pub mod report;
pub mod scan;

// Re-exports for ergonomics
pub use identifier::{ParseError, RepoIdentifier, RepoLocation};
pub use inspect::{InspectionError, InspectionResult, UpstreamKind};
pub use report::StatusReporter;
