//! Conversion into the output dialects
//!
//! Every converter takes the raw line and returns a fresh string, or `None`
//! when the line has no representation in that dialect. Malformed input is
//! never an error here.

use crate::classify::{classify, has_cosmetic_marker};
use crate::extract::extract_domain;
use crate::modifiers::option_flags;
use crate::types::{Category, ModifierFlags};

/// Answer used by `$dnsrewrite` when none is configured.
pub const DEFAULT_DNS_REWRITE_TARGET: &str = "0.0.0.0";

// =============================================================================
// Canonical keys
// =============================================================================

pub fn block_key(domain: &str) -> String {
    format!("||{domain}^")
}

pub fn allow_key(domain: &str) -> String {
    format!("@@||{domain}^")
}

pub fn allow_important_key(domain: &str) -> String {
    format!("@@||{domain}^$important")
}

pub fn hosts_line(domain: &str) -> String {
    format!("0.0.0.0 {domain}")
}

pub fn dns_rewrite_line(domain: &str, target: &str) -> String {
    format!("||{domain}^$dnsrewrite={target}")
}

// =============================================================================
// Converters
// =============================================================================

/// Blocking rules only. A rule with its own `$dnsrewrite` answer is not a
/// block and has no hosts form.
pub fn to_hosts(rule: &str) -> Option<String> {
    if classify(rule) != Category::Blocking || has_own_rewrite(rule) {
        return None;
    }
    extract_domain(rule).map(|domain| hosts_line(&domain))
}

/// AdGuard network form. Lines already written as `||host^` or `@@||host^`
/// are returned as-is, modifiers included.
pub fn to_adguard_blocking(rule: &str) -> Option<String> {
    let rule = rule.trim();
    let category = classify(rule);
    if !category.is_network() {
        return None;
    }

    let domain = extract_domain(rule)?;
    if rule.starts_with("||") || rule.starts_with("@@||") {
        return Some(rule.to_string());
    }

    match category {
        Category::Blocking => Some(block_key(&domain)),
        Category::Exception => Some(allow_key(&domain)),
        _ => None,
    }
}

/// Blocking rules become `||host^$dnsrewrite=<target>` with their own
/// modifiers dropped; exceptions pass through unmodified. Rules that already
/// carry a `$dnsrewrite` answer are skipped rather than overwritten.
pub fn to_adguard_dns_rewrite(rule: &str, target: &str) -> Option<String> {
    let rule = rule.trim();
    if has_own_rewrite(rule) {
        return None;
    }
    match classify(rule) {
        Category::Blocking => extract_domain(rule).map(|domain| dns_rewrite_line(&domain, target)),
        Category::Exception => extract_domain(rule).map(|_| rule.to_string()),
        _ => None,
    }
}

pub fn to_browser_cosmetic(rule: &str) -> Option<String> {
    let rule = rule.trim();
    let rule = match rule.strip_prefix('!') {
        Some(rest) if has_cosmetic_marker(rest) => rest.trim_start(),
        _ => rule,
    };

    if classify(rule) == Category::Cosmetic {
        Some(rule.to_string())
    } else {
        None
    }
}

fn has_own_rewrite(rule: &str) -> bool {
    option_flags(rule).contains(ModifierFlags::DNS_REWRITE)
}
