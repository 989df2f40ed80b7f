//! Deduplication and block/allow conflict resolution
//!
//! Rules are admitted one line at a time into four sets keyed by their
//! normalized form. Network rules collapse to canonical per-domain keys:
//!
//! - `||domain^` block, mirrored as `0.0.0.0 domain` and
//!   `||domain^$dnsrewrite=<target>`
//! - `@@||domain^` allow, mirrored as `@@||domain^` in the DNS-rewrite set
//! - `@@||domain^$important` allow that nothing later can override
//!
//! A block and an allow for the same domain never coexist. An important
//! allow removes both and can never be displaced. An important block
//! (`||domain^$important`, stored under the plain block key) removes a
//! plain allow and rejects later ones. Otherwise a plain allow removes the
//! block, and a block arriving after an allow is rejected.
//!
//! Rules with their own `$dnsrewrite` answer are not blocks and are counted
//! as invalid rather than folded into the block keys.

use std::collections::{BTreeSet, HashSet};

use lm_core::convert::{allow_important_key, allow_key, block_key, dns_rewrite_line, hosts_line};
use lm_core::types::{Category, Rule, RuleSetKind, Syntax};

use crate::stats::{ProcessingStats, SetCounts, SourceReport, SourceStatus};

/// The four output sets of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSets {
    pub hosts: BTreeSet<String>,
    pub adguard: BTreeSet<String>,
    pub dns_rewrite: BTreeSet<String>,
    pub browser: BTreeSet<String>,
}

impl RuleSets {
    pub fn get(&self, kind: RuleSetKind) -> &BTreeSet<String> {
        match kind {
            RuleSetKind::Hosts => &self.hosts,
            RuleSetKind::AdGuard => &self.adguard,
            RuleSetKind::DnsRewrite => &self.dns_rewrite,
            RuleSetKind::Browser => &self.browser,
        }
    }

    pub fn counts(&self) -> SetCounts {
        SetCounts {
            hosts: self.hosts.len(),
            adguard: self.adguard.len(),
            dns_rewrite: self.dns_rewrite.len(),
            browser: self.browser.len(),
        }
    }
}

/// What happened to an admitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Comment, blank or reserved hosts entry
    Discarded,
    Inserted,
    Duplicate,
    /// Dropped by the priority policy
    Conflict,
    Invalid,
    /// Disabled by a `$badfilter` rule, or a `$badfilter` rule itself
    Badfiltered,
}

/// Per-source line and insertion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceTally {
    pub lines: usize,
    pub inserted: usize,
}

struct DomainKeys {
    domain: String,
    block: String,
    allow: String,
    allow_important: String,
    hosts: String,
    dns_rewrite: String,
}

impl DomainKeys {
    fn new(domain: &str, target: &str) -> Self {
        Self {
            domain: domain.to_string(),
            block: block_key(domain),
            allow: allow_key(domain),
            allow_important: allow_important_key(domain),
            hosts: hosts_line(domain),
            dns_rewrite: dns_rewrite_line(domain, target),
        }
    }

    /// The adguard-set key `rule` would insert.
    fn own_key(&self, rule: &Rule) -> &str {
        match (rule.category, rule.has_important()) {
            (Category::Exception, true) => &self.allow_important,
            (Category::Exception, false) => &self.allow,
            _ => &self.block,
        }
    }
}

pub struct DedupEngine {
    sets: RuleSets,
    stats: ProcessingStats,
    dns_rewrite_target: String,
    badfilters: HashSet<String>,
    /// Domains whose block came from an `$important` rule.
    important_blocks: HashSet<String>,
}

impl DedupEngine {
    pub fn new(dns_rewrite_target: impl Into<String>) -> Self {
        Self {
            sets: RuleSets::default(),
            stats: ProcessingStats::default(),
            dns_rewrite_target: dns_rewrite_target.into(),
            badfilters: HashSet::new(),
            important_blocks: HashSet::new(),
        }
    }

    pub fn sets(&self) -> &RuleSets {
        &self.sets
    }

    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    pub fn record_source(&mut self, report: SourceReport) {
        match report.status {
            SourceStatus::Fetched => self.stats.sources.processed += 1,
            SourceStatus::Failed => self.stats.sources.failed += 1,
            SourceStatus::Personal => {}
        }
        self.stats.sources.reports.push(report);
    }

    pub fn finish(mut self) -> (RuleSets, ProcessingStats) {
        self.stats.sets = self.sets.counts();
        (self.sets, self.stats)
    }

    pub fn admit_text(&mut self, text: &str, source: &str) -> SourceTally {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut tally = SourceTally::default();
        for line in text.lines() {
            tally.lines += 1;
            if self.admit(line, source) == Admission::Inserted {
                tally.inserted += 1;
            }
        }
        tally
    }

    pub fn admit(&mut self, line: &str, source: &str) -> Admission {
        self.stats.total_lines += 1;
        let rule = Rule::parse(line, source);

        match rule.category {
            Category::Comment => {
                self.stats.comments += 1;
                Admission::Discarded
            }
            Category::Ignore => {
                self.stats.ignored += 1;
                Admission::Discarded
            }
            Category::Invalid => self.reject_invalid(&rule),
            Category::Cosmetic => self.admit_cosmetic(&rule),
            Category::Blocking | Category::Exception => self.admit_network(&rule),
        }
    }

    fn reject_invalid(&mut self, rule: &Rule) -> Admission {
        log::debug!("Invalid rule from {}: {:?}", rule.source, rule.raw);
        self.stats.invalid += 1;
        Admission::Invalid
    }

    /// `rule.raw` is already in browser form: a leading `!` would have made
    /// it a comment.
    fn admit_cosmetic(&mut self, rule: &Rule) -> Admission {
        if self.sets.browser.insert(rule.raw.clone()) {
            self.stats.valid.cosmetic += 1;
            Admission::Inserted
        } else {
            self.stats.duplicates += 1;
            Admission::Duplicate
        }
    }

    fn admit_network(&mut self, rule: &Rule) -> Admission {
        let Some(domain) = rule.domain.as_deref() else {
            return self.reject_invalid(rule);
        };
        if rule.has_own_rewrite() {
            let answer = rule.modifiers.get("dnsrewrite").and_then(|m| m.value.as_deref());
            log::debug!("Skipping {:?} from {}: own rewrite answer {:?}", rule.raw, rule.source, answer);
            return self.reject_invalid(rule);
        }
        let keys = DomainKeys::new(domain, &self.dns_rewrite_target);

        if rule.is_badfilter() {
            return self.apply_badfilter(rule, &keys);
        }

        if self.badfilters.contains(keys.own_key(rule)) {
            self.stats.badfiltered += 1;
            return Admission::Badfiltered;
        }

        match rule.category {
            Category::Exception if rule.has_important() => self.admit_important_allow(&keys),
            Category::Exception => self.admit_allow(&keys),
            _ if rule.syntax == Syntax::Hosts => self.admit_hosts_block(&keys),
            _ if rule.has_important() => self.admit_important_block(&keys),
            _ => self.admit_block(&keys),
        }
    }

    fn admit_important_allow(&mut self, keys: &DomainKeys) -> Admission {
        if self.sets.adguard.contains(&keys.allow_important) {
            self.stats.duplicates += 1;
            return Admission::Duplicate;
        }

        if self.remove_block(keys) {
            log::trace!("{} overrides {}", keys.allow_important, keys.block);
            self.stats.conflicts += 1;
        }
        self.important_blocks.remove(&keys.domain);
        if self.sets.adguard.remove(&keys.allow) {
            self.stats.conflicts += 1;
        }

        self.sets.adguard.insert(keys.allow_important.clone());
        self.sets.dns_rewrite.insert(keys.allow.clone());
        self.stats.valid.important_exception += 1;
        Admission::Inserted
    }

    fn admit_allow(&mut self, keys: &DomainKeys) -> Admission {
        if self.sets.adguard.contains(&keys.allow_important) {
            return self.reject_conflict(&keys.allow, &keys.allow_important);
        }
        if self.important_blocks.contains(&keys.domain) {
            return self.reject_conflict(&keys.allow, &keys.block);
        }
        if self.sets.adguard.contains(&keys.allow) {
            self.stats.duplicates += 1;
            return Admission::Duplicate;
        }

        if self.remove_block(keys) {
            log::trace!("{} overrides {}", keys.allow, keys.block);
            self.stats.conflicts += 1;
        }

        self.sets.adguard.insert(keys.allow.clone());
        self.sets.dns_rewrite.insert(keys.allow.clone());
        self.stats.valid.exception += 1;
        Admission::Inserted
    }

    fn admit_block(&mut self, keys: &DomainKeys) -> Admission {
        if let Some(existing) = self.existing_allow(keys) {
            return self.reject_conflict(&keys.block, existing);
        }
        if self.sets.adguard.contains(&keys.block) {
            self.stats.duplicates += 1;
            return Admission::Duplicate;
        }

        self.insert_block(keys)
    }

    /// Beats a plain allow in either order; still loses to an important one.
    fn admit_important_block(&mut self, keys: &DomainKeys) -> Admission {
        if self.sets.adguard.contains(&keys.allow_important) {
            return self.reject_conflict(&keys.block, &keys.allow_important);
        }

        self.important_blocks.insert(keys.domain.clone());
        if self.sets.adguard.remove(&keys.allow) {
            self.sets.dns_rewrite.remove(&keys.allow);
            log::trace!("{}$important overrides {}", keys.block, keys.allow);
            self.stats.conflicts += 1;
        }
        // An existing plain block now counts as important.
        if self.sets.adguard.contains(&keys.block) {
            self.stats.duplicates += 1;
            return Admission::Duplicate;
        }

        self.insert_block(keys)
    }

    fn insert_block(&mut self, keys: &DomainKeys) -> Admission {
        self.sets.adguard.insert(keys.block.clone());
        self.sets.hosts.insert(keys.hosts.clone());
        self.sets.dns_rewrite.insert(keys.dns_rewrite.clone());
        self.stats.valid.blocking += 1;
        Admission::Inserted
    }

    /// Hosts-file lines only feed the hosts set.
    fn admit_hosts_block(&mut self, keys: &DomainKeys) -> Admission {
        if let Some(existing) = self.existing_allow(keys) {
            return self.reject_conflict(&keys.hosts, existing);
        }
        if !self.sets.hosts.insert(keys.hosts.clone()) {
            self.stats.duplicates += 1;
            return Admission::Duplicate;
        }

        self.stats.valid.hosts += 1;
        Admission::Inserted
    }

    fn apply_badfilter(&mut self, rule: &Rule, keys: &DomainKeys) -> Admission {
        let disabled = keys.own_key(rule).to_string();

        let removed = if disabled == keys.block {
            self.important_blocks.remove(&keys.domain);
            self.remove_block(keys)
        } else if self.sets.adguard.remove(&disabled) {
            if !self.sets.adguard.contains(&keys.allow) && !self.sets.adguard.contains(&keys.allow_important) {
                self.sets.dns_rewrite.remove(&keys.allow);
            }
            true
        } else {
            false
        };

        if removed {
            log::debug!("{} disabled by {}", disabled, rule.raw);
            self.stats.badfiltered += 1;
        }
        self.badfilters.insert(disabled);
        Admission::Badfiltered
    }

    fn existing_allow<'k>(&self, keys: &'k DomainKeys) -> Option<&'k str> {
        if self.sets.adguard.contains(&keys.allow_important) {
            Some(&keys.allow_important)
        } else if self.sets.adguard.contains(&keys.allow) {
            Some(&keys.allow)
        } else {
            None
        }
    }

    /// Remove a block and its mirrors; true when anything was present.
    fn remove_block(&mut self, keys: &DomainKeys) -> bool {
        let in_adguard = self.sets.adguard.remove(&keys.block);
        let in_hosts = self.sets.hosts.remove(&keys.hosts);
        let in_dns = self.sets.dns_rewrite.remove(&keys.dns_rewrite);
        in_adguard || in_hosts || in_dns
    }

    fn reject_conflict(&mut self, incoming: &str, existing: &str) -> Admission {
        log::trace!("{incoming} rejected, {existing} already present");
        self.stats.conflicts += 1;
        Admission::Conflict
    }
}
