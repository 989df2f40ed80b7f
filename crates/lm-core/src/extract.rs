//! Target domain extraction

use crate::classify::is_hosts_line;
use crate::domain::normalize_domain;

/// Extract the domain a network rule targets.
///
/// Handles `@@||host^...`, `||host^...` and `0.0.0.0 host` / `127.0.0.1 host`.
/// Every other shape (cosmetic, regex, path patterns) yields `None`, as does
/// a candidate that fails domain validation.
pub fn extract_domain(rule: &str) -> Option<String> {
    let rule = rule.trim();

    let candidate = if let Some(rest) = rule.strip_prefix("@@||") {
        host_anchor_host(rest)
    } else if let Some(rest) = rule.strip_prefix("||") {
        host_anchor_host(rest)
    } else if is_hosts_line(rule) {
        rule.split_whitespace().nth(1)?
    } else {
        return None;
    };

    let domain = normalize_domain(candidate);
    if domain.is_none() {
        log::trace!("Discarding invalid domain {candidate:?} from {rule:?}");
    }
    domain
}

/// Text up to the first `^` or `$`.
fn host_anchor_host(rest: &str) -> &str {
    let end = rest.find(['^', '$']).unwrap_or(rest.len());
    &rest[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adguard_block() {
        assert_eq!(extract_domain("||ads.example.com^"), Some("ads.example.com".into()));
        assert_eq!(extract_domain("||ads.example.com^$third-party"), Some("ads.example.com".into()));
        assert_eq!(extract_domain("||ADS.Example.com^"), Some("ads.example.com".into()));
    }

    #[test]
    fn test_adguard_exception() {
        assert_eq!(extract_domain("@@||good.example.com^"), Some("good.example.com".into()));
        assert_eq!(extract_domain("@@||good.example.com^$important"), Some("good.example.com".into()));
        assert_eq!(extract_domain("@@||good.example.com$important"), Some("good.example.com".into()));
    }

    #[test]
    fn test_hosts() {
        assert_eq!(extract_domain("0.0.0.0 tracker.example.com"), Some("tracker.example.com".into()));
        assert_eq!(extract_domain("127.0.0.1 tracker.example.com # inline"), Some("tracker.example.com".into()));
        assert_eq!(extract_domain("0.0.0.0\ttracker.example.com"), Some("tracker.example.com".into()));
        assert_eq!(extract_domain("0.0.0.0"), None);
    }

    #[test]
    fn test_other_shapes_have_no_domain() {
        assert_eq!(extract_domain("##.banner"), None);
        assert_eq!(extract_domain("/ads[0-9]+/"), None);
        assert_eq!(extract_domain("192.168.0.1 router.example.com"), None);
        assert_eq!(extract_domain("ads.example.com"), None);
    }

    #[test]
    fn test_invalid_candidates_are_discarded() {
        assert_eq!(extract_domain("||*.example.com^"), None);
        assert_eq!(extract_domain("||example.com/ads/^"), None);
        assert_eq!(extract_domain("||-bad.com^"), None);
        assert_eq!(extract_domain("0.0.0.0 localhost"), None);
    }
}
