//! Rule set finalization
//!
//! Turns the accumulated sets into sorted, header-stamped lists ready for a
//! [`RuleSetSink`] to persist.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use lm_core::types::RuleSetKind;

use crate::dedup::RuleSets;

/// Error type for persisting rule sets.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize statistics: {0}")]
    Serialize(String),
}

/// Text placed in every header block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListMetadata {
    pub title: String,
    pub description: String,
    pub homepage: String,
}

impl Default for ListMetadata {
    fn default() -> Self {
        Self {
            title: "listmerge".to_string(),
            description: "Merged and deduplicated ad and tracker block lists".to_string(),
            homepage: "https://github.com/example/listmerge".to_string(),
        }
    }
}

/// A sorted rule list with its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedSet {
    pub kind: RuleSetKind,
    pub header: String,
    pub lines: Vec<String>,
}

impl FinalizedSet {
    /// Header followed by one rule per line.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.header.len() + self.lines.iter().map(|l| l.len() + 1).sum::<usize>());
        out.push_str(&self.header);
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Persistence collaborator. Writes are expected to overwrite.
#[async_trait]
pub trait RuleSetSink: Send + Sync {
    async fn write(&self, set: &FinalizedSet) -> Result<(), OutputError>;
}

pub fn render_header(kind: RuleSetKind, meta: &ListMetadata, count: usize, timestamp: DateTime<Utc>) -> String {
    let c = kind.comment_prefix();
    let modified = timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        "{c} Title: {title} - {name}\n\
         {c} Description: {description}\n\
         {c} Homepage: {homepage}\n\
         {c} Last modified: {modified}\n\
         {c} Number of rules: {count}\n\
         {c}\n",
        title = meta.title,
        name = kind.display_name(),
        description = meta.description,
        homepage = meta.homepage,
    )
}

pub fn finalize(sets: &RuleSets, meta: &ListMetadata, timestamp: DateTime<Utc>) -> Vec<FinalizedSet> {
    RuleSetKind::ALL
        .iter()
        .map(|&kind| {
            let lines: Vec<String> = sets.get(kind).iter().cloned().collect();
            FinalizedSet {
                kind,
                header: render_header(kind, meta, lines.len(), timestamp),
                lines,
            }
        })
        .collect()
}
