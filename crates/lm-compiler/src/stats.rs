//! Processing statistics for one run

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Valid admissions broken down by rule type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidCounts {
    pub blocking: usize,
    pub hosts: usize,
    pub exception: usize,
    pub important_exception: usize,
    pub cosmetic: usize,
}

impl ValidCounts {
    pub fn total(&self) -> usize {
        self.blocking + self.hosts + self.exception + self.important_exception + self.cosmetic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Fetched,
    Failed,
    Personal,
}

/// Outcome for a single source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub name: String,
    pub url: String,
    pub status: SourceStatus,
    pub lines: usize,
    pub inserted: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub processed: usize,
    pub failed: usize,
    pub reports: Vec<SourceReport>,
}

/// Rule counts per output set, filled in when a run finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCounts {
    pub hosts: usize,
    pub adguard: usize,
    pub dns_rewrite: usize,
    pub browser: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub total_lines: usize,
    pub comments: usize,
    pub ignored: usize,
    pub invalid: usize,
    pub duplicates: usize,
    /// Rules rejected or removed by the block/allow priority policy.
    pub conflicts: usize,
    pub badfiltered: usize,
    pub valid: ValidCounts,
    pub sources: SourceStats,
    pub sets: SetCounts,
}

impl ProcessingStats {
    /// Everything deduplication took out of the output.
    pub fn removed(&self) -> usize {
        self.duplicates + self.conflicts + self.badfiltered
    }

    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Sources:   {} processed, {} failed", self.sources.processed, self.sources.failed);
        for report in &self.sources.reports {
            let status = match report.status {
                SourceStatus::Fetched => "ok",
                SourceStatus::Failed => "FAILED",
                SourceStatus::Personal => "personal",
            };
            let _ = writeln!(
                out,
                "  [{:<8}] {} - {} lines, {} inserted",
                status, report.name, report.lines, report.inserted
            );
        }
        let _ = writeln!(out, "Lines:     {}", self.total_lines);
        let _ = writeln!(
            out,
            "Valid:     {} (blocking {}, hosts {}, exception {}, important {}, cosmetic {})",
            self.valid.total(),
            self.valid.blocking,
            self.valid.hosts,
            self.valid.exception,
            self.valid.important_exception,
            self.valid.cosmetic
        );
        let _ = writeln!(
            out,
            "Removed:   {} (duplicates {}, conflicts {}, badfilter {})",
            self.removed(),
            self.duplicates,
            self.conflicts,
            self.badfiltered
        );
        let _ = writeln!(out, "Skipped:   {} comments, {} ignored, {} invalid", self.comments, self.ignored, self.invalid);
        let _ = write!(
            out,
            "Output:    hosts {}, adguard {}, dns-rewrite {}, browser {}",
            self.sets.hosts, self.sets.adguard, self.sets.dns_rewrite, self.sets.browser
        );
        out
    }
}
