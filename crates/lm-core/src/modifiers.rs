//! Modifier list parsing (`$key[=value],key,...`)

use crate::types::ModifierFlags;

/// Error type for rule parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("Malformed modifier: {0:?}")]
    MalformedModifier(String),
}

/// Keys only a browser extension can act on.
const BROWSER_ONLY_KEYS: &[&str] = &[
    "popup",
    "redirect",
    "redirect-rule",
    "replace",
    "removeparam",
    "csp",
    "css",
    "stylesheet",
    "script",
];

/// A single `key[=value]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
    pub key: String,
    pub value: Option<String>,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub flags: ModifierFlags,
    pub entries: Vec<Modifier>,
}

impl Modifiers {
    /// First entry named `key`.
    pub fn get(&self, key: &str) -> Option<&Modifier> {
        self.entries.iter().find(|m| m.key == key)
    }
}

/// Split a network rule into its pattern and the text after the first `$`.
pub fn split_rule_options(line: &str) -> (&str, Option<&str>) {
    match line.find('$') {
        Some(pos) => (&line[..pos], Some(&line[pos + 1..])),
        None => (line, None),
    }
}

pub fn parse_modifiers(text: &str) -> Result<Modifiers, RuleError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Modifiers::default());
    }

    let mut flags = ModifierFlags::empty();
    let mut entries = Vec::new();

    for raw in trimmed.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RuleError::MalformedModifier(trimmed.to_string()));
        }

        let (key, value) = match raw.split_once('=') {
            Some((key, value)) => (key, Some(value.to_string())),
            None => (raw, None),
        };

        let key = key.to_ascii_lowercase();
        let (negated, key) = match key.strip_prefix('~') {
            Some(rest) => (true, rest.to_string()),
            None => (false, key),
        };

        if key.is_empty()
            || !key
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
        {
            return Err(RuleError::MalformedModifier(raw.to_string()));
        }

        match key.as_str() {
            "important" => flags |= ModifierFlags::IMPORTANT,
            "badfilter" => flags |= ModifierFlags::BADFILTER,
            "dnsrewrite" => flags |= ModifierFlags::DNS_REWRITE,
            // `~script` narrows a network block, it does not need a browser
            k if !negated && BROWSER_ONLY_KEYS.contains(&k) => flags |= ModifierFlags::BROWSER_ONLY,
            _ => {}
        }

        entries.push(Modifier { key, value, negated });
    }

    Ok(Modifiers { flags, entries })
}

/// Flags of the modifier list trailing `line`; empty when it has none or
/// the list is malformed.
pub fn option_flags(line: &str) -> ModifierFlags {
    split_rule_options(line)
        .1
        .and_then(|text| parse_modifiers(text).ok())
        .map(|modifiers| modifiers.flags)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_dollar() {
        assert_eq!(split_rule_options("||a.com^$important"), ("||a.com^", Some("important")));
        assert_eq!(split_rule_options("||a.com^"), ("||a.com^", None));
        assert_eq!(
            split_rule_options("||a.com^$dnsrewrite=NOERROR;A;1.2.3.4"),
            ("||a.com^", Some("dnsrewrite=NOERROR;A;1.2.3.4"))
        );
    }

    #[test]
    fn parses_flags_and_values() {
        let mods = parse_modifiers("Important,third-party,~script,redirect=noop.js").unwrap();
        assert!(mods.flags.contains(ModifierFlags::IMPORTANT));
        assert!(mods.flags.contains(ModifierFlags::BROWSER_ONLY));
        assert_eq!(mods.entries.len(), 4);
        assert!(mods.entries[2].negated);
        assert_eq!(mods.entries[2].key, "script");
        assert_eq!(mods.get("redirect").and_then(|m| m.value.as_deref()), Some("noop.js"));
        assert!(mods.get("third-party").is_some());
        assert!(mods.get("popup").is_none());
    }

    #[test]
    fn negated_browser_key_stays_network() {
        let mods = parse_modifiers("~script").unwrap();
        assert!(!mods.flags.contains(ModifierFlags::BROWSER_ONLY));
        assert!(mods.entries[0].negated);

        let mods = parse_modifiers("~third-party,script").unwrap();
        assert!(mods.flags.contains(ModifierFlags::BROWSER_ONLY));
    }

    #[test]
    fn option_flags_of_rule_lines() {
        assert_eq!(option_flags("||a.com^"), ModifierFlags::empty());
        assert_eq!(option_flags("||a.com^$important"), ModifierFlags::IMPORTANT);
        assert_eq!(
            option_flags("||a.com^$dnsrewrite=NOERROR;CNAME;safe.example.org"),
            ModifierFlags::DNS_REWRITE
        );
        assert_eq!(option_flags("||a.com^$,,"), ModifierFlags::empty());
    }

    #[test]
    fn empty_list_is_ok() {
        assert!(parse_modifiers("").unwrap().entries.is_empty());
        assert!(parse_modifiers("   ").unwrap().entries.is_empty());
    }

    #[test]
    fn rejects_malformed_lists() {
        assert!(parse_modifiers("important,,third-party").is_err());
        assert!(parse_modifiers("=value").is_err());
        assert!(parse_modifiers("bad key").is_err());
        assert!(parse_modifiers("~").is_err());
    }

    #[test]
    fn badfilter_and_dnsrewrite_flags() {
        let mods = parse_modifiers("badfilter").unwrap();
        assert_eq!(mods.flags, ModifierFlags::BADFILTER);
        let mods = parse_modifiers("dnsrewrite=0.0.0.0").unwrap();
        assert_eq!(mods.flags, ModifierFlags::DNS_REWRITE);
    }
}
