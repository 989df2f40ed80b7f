//! listmerge Filter List Compiler
//!
//! This crate merges many filter lists into four deduplicated rule sets
//! (hosts, AdGuard, AdGuard DNS rewrite, browser cosmetic) and reports what
//! it kept, dropped and why.

pub mod aggregate;
pub mod dedup;
pub mod output;
pub mod stats;

pub use aggregate::{Aggregator, Fetcher, RunContext, RunOutput, SourceEntry, PERSONAL_SOURCE};
pub use dedup::{Admission, DedupEngine, RuleSets, SourceTally};
pub use output::{finalize, render_header, FinalizedSet, ListMetadata, OutputError, RuleSetSink};
pub use stats::{ProcessingStats, SourceReport, SourceStatus};
