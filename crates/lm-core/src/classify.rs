//! Rule classification
//!
//! `classify` is total: every input, including the empty string, maps to
//! exactly one [`Category`]. Checks run in a fixed order and the first match
//! wins, so a hosts-file comment (`# ...`) never shadows an element-hiding
//! rule (`##.ad`) and a network rule carrying a browser-only modifier is
//! routed to the cosmetic set.

use std::net::Ipv4Addr;

use crate::modifiers::{parse_modifiers, split_rule_options};
use crate::types::{Category, ModifierFlags, Syntax};

const COSMETIC_MARKERS: &[&str] = &["##", "#@#", "#?#", "#$#", "#@?#", "#@$#", "#%#", "#@%#"];

const HOSTS_PREFIXES: &[&str] = &["0.0.0.0", "127.0.0.1"];

/// Standard hosts-file entries, single-spaced and lowercase.
const RESERVED_HOST_LINES: &[&str] = &[
    "127.0.0.1 localhost",
    "127.0.0.1 localhost.localdomain",
    "127.0.0.1 local",
    "127.0.1.1 localhost",
    "0.0.0.0 localhost",
    "0.0.0.0 0.0.0.0",
    "255.255.255.255 broadcasthost",
    "::1 localhost",
    "::1 ip6-localhost",
    "::1 ip6-loopback",
    "::1 localhost ip6-localhost ip6-loopback",
    "fe80::1%lo0 localhost",
    "fe00::0 ip6-localnet",
    "ff00::0 ip6-localnet",
    "ff00::0 ip6-mcastprefix",
    "ff02::1 ip6-allnodes",
    "ff02::2 ip6-allrouters",
    "ff02::3 ip6-allhosts",
];

pub fn classify(line: &str) -> Category {
    let line = line.trim();
    if line.is_empty() {
        return Category::Comment;
    }

    if is_reserved_host_line(line) {
        return Category::Ignore;
    }

    if line.starts_with('!') || line.starts_with("//") || is_list_header(line) {
        return Category::Comment;
    }

    if has_cosmetic_marker(line) {
        return Category::Cosmetic;
    }

    if line.starts_with('#') {
        return Category::Comment;
    }

    if let (_, Some(options)) = split_rule_options(line) {
        match parse_modifiers(options) {
            Ok(modifiers) if modifiers.flags.contains(ModifierFlags::BROWSER_ONLY) => {
                return Category::Cosmetic;
            }
            Ok(_) => {}
            Err(e) => {
                log::debug!("{e} in {line:?}");
                return Category::Invalid;
            }
        }
    }

    if is_hosts_line(line) {
        return Category::Blocking;
    }

    if line.starts_with("@@||") && line.contains('^') {
        return Category::Exception;
    }

    if line.starts_with("||") && line.contains('^') {
        return Category::Blocking;
    }

    if starts_with_ipv4(line) {
        return Category::Blocking;
    }

    Category::Invalid
}

/// Which dialect `line` is written in, given its [`classify`] result.
pub fn syntax_of(line: &str, category: Category) -> Syntax {
    let line = line.trim();
    match category {
        Category::Cosmetic if has_cosmetic_marker(line) => Syntax::Cosmetic,
        Category::Blocking | Category::Exception | Category::Cosmetic => {
            if is_hosts_line(line) {
                Syntax::Hosts
            } else if line.starts_with("||") || line.starts_with("@@||") {
                Syntax::AdGuard
            } else {
                Syntax::Other
            }
        }
        _ => Syntax::Other,
    }
}

/// Compares token by token, so no per-line allocation.
pub fn is_reserved_host_line(line: &str) -> bool {
    let Some(first) = line.split_whitespace().next() else {
        return false;
    };
    if !first.starts_with(|c: char| c.is_ascii_hexdigit() || c == ':') || !first.contains(['.', ':']) {
        return false;
    }

    RESERVED_HOST_LINES.iter().any(|reserved| {
        let mut tokens = line.split_whitespace();
        reserved
            .split(' ')
            .all(|want| tokens.next().is_some_and(|token| token.eq_ignore_ascii_case(want)))
            && tokens.next().is_none()
    })
}

pub fn has_cosmetic_marker(line: &str) -> bool {
    COSMETIC_MARKERS.iter().any(|marker| line.contains(marker))
}

/// `0.0.0.0 host` or `127.0.0.1 host`.
pub fn is_hosts_line(line: &str) -> bool {
    HOSTS_PREFIXES.iter().any(|prefix| {
        line.strip_prefix(prefix)
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_whitespace())
    })
}

fn is_list_header(line: &str) -> bool {
    line.starts_with('[') && line.ends_with(']')
}

fn starts_with_ipv4(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|first| first.parse::<Ipv4Addr>().is_ok())
}
