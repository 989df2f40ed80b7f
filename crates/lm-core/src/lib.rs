//! listmerge Core Library
//!
//! This crate provides the rule handling that every other listmerge crate
//! builds on: it takes single lines from heterogeneous filter-list dialects
//! (hosts files, AdGuard DNS lists, ABP/uBlock network and cosmetic rules)
//! and decides what they are and what they target.
//!
//! # Modules
//!
//! - `domain`: Domain name validation and normalization
//! - `modifiers`: `$key[=value],...` modifier list parsing
//! - `classify`: Line classification into rule categories
//! - `extract`: Target domain extraction
//! - `convert`: Conversion into the output dialects
//! - `types`: Shared type definitions

pub mod classify;
pub mod convert;
pub mod domain;
pub mod extract;
pub mod modifiers;
pub mod types;

// Re-export commonly used types
pub use classify::{classify, is_reserved_host_line, syntax_of};
pub use convert::{
    to_adguard_blocking, to_adguard_dns_rewrite, to_browser_cosmetic, to_hosts,
    DEFAULT_DNS_REWRITE_TARGET,
};
pub use domain::{is_valid_domain, normalize_domain};
pub use extract::extract_domain;
pub use modifiers::{option_flags, parse_modifiers, split_rule_options, Modifier, Modifiers, RuleError};
pub use types::{Category, ModifierFlags, Rule, RuleSetKind, Syntax};
