//! Core type definitions for listmerge
//!
//! These types describe a single filter-list line after classification and
//! the four output rule sets a run produces.

use crate::classify::{classify, syntax_of};
use crate::extract::extract_domain;
use crate::modifiers::{parse_modifiers, split_rule_options, Modifiers};

// =============================================================================
// Categories
// =============================================================================

/// What a line is, independent of which dialect it was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Network rule that blocks a host (AdGuard `||host^`, hosts file line, IP line)
    Blocking,
    /// Allow rule (`@@||host^`)
    Exception,
    /// Browser-only rule: element hiding, scriptlets, or browser-only modifiers
    Cosmetic,
    /// Comment, header or blank line
    Comment,
    /// Anything that does not parse as a known rule
    Invalid,
    /// Standard loopback/broadcast/multicast hosts entry
    Ignore,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::Exception => "exception",
            Self::Cosmetic => "cosmetic",
            Self::Comment => "comment",
            Self::Invalid => "invalid",
            Self::Ignore => "ignore",
        }
    }

    /// Blocking and exception rules are the ones that target a domain.
    pub fn is_network(self) -> bool {
        matches!(self, Self::Blocking | Self::Exception)
    }
}

/// Dialect a rule was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syntax {
    /// `0.0.0.0 host` / `127.0.0.1 host`
    Hosts,
    /// `||host^` / `@@||host^`
    AdGuard,
    /// Element hiding / scriptlet syntax
    Cosmetic,
    Other,
}

// =============================================================================
// Modifier Flags
// =============================================================================

bitflags::bitflags! {
    /// Modifiers that change how a rule is admitted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierFlags: u8 {
        /// $important - overrides rules of opposite polarity
        const IMPORTANT = 1 << 0;
        /// $badfilter - disables the rule it otherwise equals
        const BADFILTER = 1 << 1;
        /// A modifier only a browser extension can honour
        const BROWSER_ONLY = 1 << 2;
        /// $dnsrewrite=...
        const DNS_REWRITE = 1 << 3;
    }
}

// =============================================================================
// Rule
// =============================================================================

/// A trimmed input line together with everything derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub raw: String,
    pub category: Category,
    pub syntax: Syntax,
    /// Target domain, present only for network rules with a valid host.
    pub domain: Option<String>,
    pub modifiers: Modifiers,
    /// Source URL, or `"personal"` for user rules.
    pub source: String,
}

impl Rule {
    /// Classify `line` and extract its domain and modifiers.
    pub fn parse(line: &str, source: &str) -> Self {
        let raw = line.trim();
        let category = classify(raw);

        let (domain, modifiers) = if category.is_network() {
            // classify already rejected malformed lists
            let modifiers = split_rule_options(raw)
                .1
                .and_then(|text| parse_modifiers(text).ok())
                .unwrap_or_default();
            (extract_domain(raw), modifiers)
        } else {
            (None, Modifiers::default())
        };

        Self {
            raw: raw.to_string(),
            category,
            syntax: syntax_of(raw, category),
            domain,
            modifiers,
            source: source.to_string(),
        }
    }

    pub fn has_important(&self) -> bool {
        self.modifiers.flags.contains(ModifierFlags::IMPORTANT)
    }

    pub fn is_badfilter(&self) -> bool {
        self.modifiers.flags.contains(ModifierFlags::BADFILTER)
    }

    /// Carries its own `$dnsrewrite` answer instead of a plain block.
    pub fn has_own_rewrite(&self) -> bool {
        self.modifiers.flags.contains(ModifierFlags::DNS_REWRITE)
    }
}

// =============================================================================
// Rule Set Kinds
// =============================================================================

/// The four output rule sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleSetKind {
    Hosts,
    AdGuard,
    DnsRewrite,
    Browser,
}

impl RuleSetKind {
    pub const ALL: [RuleSetKind; 4] = [Self::Hosts, Self::AdGuard, Self::DnsRewrite, Self::Browser];

    /// File stem used when the set is persisted.
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Hosts => "hosts",
            Self::AdGuard => "adguard",
            Self::DnsRewrite => "adguard-dnsrewrite",
            Self::Browser => "browser",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Hosts => "Hosts",
            Self::AdGuard => "AdGuard",
            Self::DnsRewrite => "AdGuard DNS Rewrite",
            Self::Browser => "Browser",
        }
    }

    /// Comment prefix for the header block.
    pub fn comment_prefix(self) -> char {
        match self {
            Self::Hosts => '#',
            Self::AdGuard | Self::DnsRewrite | Self::Browser => '!',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_adguard_rule_with_modifiers() {
        let rule = Rule::parse("  @@||Ads.Example.com^$important  ", "list-a");
        assert_eq!(rule.raw, "@@||Ads.Example.com^$important");
        assert_eq!(rule.category, Category::Exception);
        assert_eq!(rule.syntax, Syntax::AdGuard);
        assert_eq!(rule.domain.as_deref(), Some("ads.example.com"));
        assert!(rule.has_important());
        assert_eq!(rule.source, "list-a");
    }

    #[test]
    fn cosmetic_rule_has_no_domain() {
        let rule = Rule::parse("example.com##.banner", "list-a");
        assert_eq!(rule.category, Category::Cosmetic);
        assert_eq!(rule.domain, None);
        assert!(!rule.has_important());
    }

    #[test]
    fn hosts_rule_targets_second_token() {
        let rule = Rule::parse("0.0.0.0 tracker.example.com", "personal");
        assert_eq!(rule.category, Category::Blocking);
        assert_eq!(rule.syntax, Syntax::Hosts);
        assert_eq!(rule.domain.as_deref(), Some("tracker.example.com"));
    }

    #[test]
    fn rewrite_rule_is_flagged() {
        let rule = Rule::parse("||safe.example.com^$dnsrewrite=NOERROR;CNAME;forcesafesearch.google.com", "list-a");
        assert_eq!(rule.category, Category::Blocking);
        assert!(rule.has_own_rewrite());
        assert!(!Rule::parse("||ads.example.com^", "list-a").has_own_rewrite());
    }

    #[test]
    fn comment_prefix_per_kind() {
        assert_eq!(RuleSetKind::Hosts.comment_prefix(), '#');
        assert_eq!(RuleSetKind::AdGuard.comment_prefix(), '!');
        assert_eq!(RuleSetKind::DnsRewrite.comment_prefix(), '!');
        assert_eq!(RuleSetKind::Browser.comment_prefix(), '!');
    }
}
