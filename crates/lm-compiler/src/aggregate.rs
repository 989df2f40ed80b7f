//! Filter list aggregation
//!
//! Sources are fetched concurrently but admitted one after another in the
//! order they were declared, followed by the personal rules. Conflict
//! resolution therefore depends only on the inputs, never on which fetch
//! finished first.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use lm_core::DEFAULT_DNS_REWRITE_TARGET;

use crate::dedup::{DedupEngine, RuleSets, SourceTally};
use crate::output::{finalize, FinalizedSet, ListMetadata, OutputError, RuleSetSink};
use crate::stats::{ProcessingStats, SourceReport, SourceStatus};

/// Source id recorded for user-authored rules.
pub const PERSONAL_SOURCE: &str = "personal";

/// Fetch collaborator. Implementations retry on their own and return `None`
/// once they give up.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Inputs for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub sources: Vec<SourceEntry>,
    pub personal_rules: String,
    pub dns_rewrite_target: String,
}

impl RunContext {
    pub fn new(sources: Vec<SourceEntry>) -> Self {
        Self {
            sources,
            personal_rules: String::new(),
            dns_rewrite_target: DEFAULT_DNS_REWRITE_TARGET.to_string(),
        }
    }

    pub fn with_personal_rules(mut self, rules: impl Into<String>) -> Self {
        self.personal_rules = rules.into();
        self
    }

    pub fn with_dns_rewrite_target(mut self, target: impl Into<String>) -> Self {
        self.dns_rewrite_target = target.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub sets: RuleSets,
    pub stats: ProcessingStats,
}

impl RunOutput {
    pub fn finalize(&self, meta: &ListMetadata, timestamp: DateTime<Utc>) -> Vec<FinalizedSet> {
        finalize(&self.sets, meta, timestamp)
    }

    /// Finalize and hand every set to `sink`.
    pub async fn persist(
        &self,
        sink: &dyn RuleSetSink,
        meta: &ListMetadata,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<FinalizedSet>, OutputError> {
        let finalized = self.finalize(meta, timestamp);
        for set in &finalized {
            sink.write(set).await?;
        }
        Ok(finalized)
    }
}

pub struct Aggregator {
    fetcher: Arc<dyn Fetcher>,
}

impl Aggregator {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn run(&self, ctx: &RunContext) -> RunOutput {
        let enabled: Vec<&SourceEntry> = ctx.sources.iter().filter(|s| s.enabled).collect();
        log::info!("Fetching {} of {} sources", enabled.len(), ctx.sources.len());

        let contents = self.fetch_all(&enabled).await;
        let mut engine = DedupEngine::new(ctx.dns_rewrite_target.as_str());

        for (source, content) in enabled.iter().zip(contents) {
            let (status, tally) = match content {
                Some(text) => {
                    let tally = engine.admit_text(&text, &source.url);
                    log::info!("{}: {} lines, {} inserted", source.name, tally.lines, tally.inserted);
                    (SourceStatus::Fetched, tally)
                }
                None => {
                    log::warn!("{}: no content from {}, skipping", source.name, source.url);
                    (SourceStatus::Failed, SourceTally::default())
                }
            };
            engine.record_source(SourceReport {
                name: source.name.clone(),
                url: source.url.clone(),
                status,
                lines: tally.lines,
                inserted: tally.inserted,
            });
        }

        if !ctx.personal_rules.trim().is_empty() {
            let tally = engine.admit_text(&ctx.personal_rules, PERSONAL_SOURCE);
            log::info!("Personal rules: {} lines, {} inserted", tally.lines, tally.inserted);
            engine.record_source(SourceReport {
                name: PERSONAL_SOURCE.to_string(),
                url: String::new(),
                status: SourceStatus::Personal,
                lines: tally.lines,
                inserted: tally.inserted,
            });
        }

        let (sets, stats) = engine.finish();
        RunOutput { sets, stats }
    }

    /// Results are indexed like `sources`.
    async fn fetch_all(&self, sources: &[&SourceEntry]) -> Vec<Option<String>> {
        let mut tasks = JoinSet::new();
        for (index, source) in sources.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let url = source.url.clone();
            tasks.spawn(async move { (index, fetcher.fetch(&url).await) });
        }

        let mut results = vec![None; sources.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, content)) => results[index] = content,
                Err(e) => log::error!("Fetch task failed: {e}"),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::TimeZone;
    use lm_core::types::RuleSetKind;

    use super::*;

    #[derive(Default)]
    struct StaticFetcher {
        responses: HashMap<String, (Option<String>, u64)>,
    }

    impl StaticFetcher {
        fn with(mut self, url: &str, body: Option<&str>, delay_ms: u64) -> Self {
            self.responses.insert(url.to_string(), (body.map(str::to_string), delay_ms));
            self
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Option<String> {
            let (body, delay_ms) = self.responses.get(url)?.clone();
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            body
        }
    }

    #[derive(Default)]
    struct MemorySink {
        written: Mutex<Vec<FinalizedSet>>,
    }

    #[async_trait]
    impl RuleSetSink for MemorySink {
        async fn write(&self, set: &FinalizedSet) -> Result<(), OutputError> {
            self.written.lock().unwrap().push(set.clone());
            Ok(())
        }
    }

    fn source(name: &str) -> SourceEntry {
        SourceEntry {
            name: name.to_string(),
            url: format!("https://lists.example.org/{name}.txt"),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn partial_source_failure_is_not_fatal() {
        let fetcher = StaticFetcher::default()
            .with("https://lists.example.org/one.txt", Some("||one.com^\n"), 0)
            .with("https://lists.example.org/two.txt", None, 0)
            .with("https://lists.example.org/three.txt", Some("0.0.0.0 three.com\n"), 0);
        let ctx = RunContext::new(vec![source("one"), source("two"), source("three")]);

        let output = Aggregator::new(Arc::new(fetcher)).run(&ctx).await;

        assert_eq!(output.stats.sources.processed, 2);
        assert_eq!(output.stats.sources.failed, 1);
        assert_eq!(output.stats.sources.reports[1].status, SourceStatus::Failed);
        assert_eq!(output.sets.adguard.len(), 1);
        assert!(output.sets.hosts.contains("0.0.0.0 one.com"));
        assert!(output.sets.hosts.contains("0.0.0.0 three.com"));
    }

    #[tokio::test]
    async fn admission_follows_declaration_order() {
        // The first source answers last; its block must still be admitted first.
        let fetcher = StaticFetcher::default()
            .with("https://lists.example.org/slow.txt", Some("||x.com^"), 50)
            .with("https://lists.example.org/fast.txt", Some("@@||x.com^"), 0);
        let ctx = RunContext::new(vec![source("slow"), source("fast")]);

        let output = Aggregator::new(Arc::new(fetcher)).run(&ctx).await;

        let names: Vec<_> = output.stats.sources.reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast"]);
        assert_eq!(output.stats.valid.blocking, 1);
        assert_eq!(output.stats.conflicts, 1);
        assert!(output.sets.adguard.contains("@@||x.com^"));
        assert!(!output.sets.adguard.contains("||x.com^"));
    }

    #[tokio::test]
    async fn personal_rules_are_admitted_last() {
        let fetcher = StaticFetcher::default()
            .with("https://lists.example.org/one.txt", Some("||shop.com^\n||ads.com^\n"), 0);
        let ctx = RunContext::new(vec![source("one")])
            .with_personal_rules("@@||shop.com^$important\n! my notes\n");

        let output = Aggregator::new(Arc::new(fetcher)).run(&ctx).await;

        assert!(output.sets.adguard.contains("@@||shop.com^$important"));
        assert!(!output.sets.adguard.contains("||shop.com^"));
        assert!(output.sets.adguard.contains("||ads.com^"));
        let personal = output.stats.sources.reports.last().unwrap();
        assert_eq!(personal.status, SourceStatus::Personal);
        assert_eq!(personal.inserted, 1);
        assert_eq!(output.stats.sources.processed, 1);
    }

    #[tokio::test]
    async fn disabled_sources_are_not_fetched() {
        let fetcher = StaticFetcher::default().with("https://lists.example.org/off.txt", Some("||off.com^"), 0);
        let mut off = source("off");
        off.enabled = false;
        let ctx = RunContext::new(vec![off]);

        let output = Aggregator::new(Arc::new(fetcher)).run(&ctx).await;

        assert!(output.sets.adguard.is_empty());
        assert!(output.stats.sources.reports.is_empty());
    }

    #[tokio::test]
    async fn persist_writes_all_four_sets() {
        let fetcher = StaticFetcher::default()
            .with("https://lists.example.org/one.txt", Some("||a.com^\n##.ad\n"), 0);
        let ctx = RunContext::new(vec![source("one")]).with_dns_rewrite_target("127.0.0.1");
        let output = Aggregator::new(Arc::new(fetcher)).run(&ctx).await;

        let sink = MemorySink::default();
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        output.persist(&sink, &ListMetadata::default(), timestamp).await.unwrap();

        let written = sink.written.lock().unwrap();
        assert_eq!(written.len(), 4);
        let dns = written.iter().find(|s| s.kind == RuleSetKind::DnsRewrite).unwrap();
        assert_eq!(dns.lines, vec!["||a.com^$dnsrewrite=127.0.0.1"]);
    }

    #[test]
    fn source_entry_defaults_to_enabled() {
        let entry: SourceEntry =
            serde_json::from_str(r#"{"name":"x","url":"https://example.org/x.txt"}"#).unwrap();
        assert!(entry.enabled);
    }
}
