//! Domain name validation
//!
//! A domain is accepted when it is 3 to 255 characters long and made of
//! dot-separated labels of `[a-z0-9]` with optional interior hyphens, ending
//! in an alphabetic TLD of at least two characters. Matching ignores case.

const MIN_DOMAIN_LEN: usize = 3;
const MAX_DOMAIN_LEN: usize = 255;

/// Whether `candidate` is a syntactically plausible domain name.
pub fn is_valid_domain(candidate: &str) -> bool {
    let domain = candidate.trim();
    if domain.len() < MIN_DOMAIN_LEN || domain.len() > MAX_DOMAIN_LEN {
        return false;
    }

    let mut labels = domain.split('.').peekable();
    let mut count = 0usize;

    while let Some(label) = labels.next() {
        count += 1;
        if labels.peek().is_none() {
            return count >= 2 && is_tld(label);
        }
        if !is_label(label) {
            return false;
        }
    }

    false
}

/// Trim, drop a trailing root dot, lowercase and validate.
pub fn normalize_domain(host: &str) -> Option<String> {
    let trimmed = host.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if !is_valid_domain(trimmed) {
        return None;
    }
    Some(trimmed.to_ascii_lowercase())
}

fn is_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        }
        _ => false,
    }
}

fn is_tld(label: &str) -> bool {
    label.len() >= 2 && label.bytes().all(|b| b.is_ascii_alphabetic())
}
