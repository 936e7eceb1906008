//! Compiled pattern battery for the lexical extractor
//!
//! Every pattern is compiled exactly once behind a `Lazy` and shared
//! read-only across threads; a failed compilation is a programming error,
//! hence the `unwrap`s.

use once_cell::sync::Lazy;
use regex::Regex;

/// `Process <pid> waits for <descriptor>; blocked by process <pid>`
pub static WAIT_EDGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Process\s+(\d+)\s+waits\s+for\s+([^;]+);\s*blocked\s+by\s+process\s+(\d+)")
        .unwrap()
});

/// Lock descriptor: `<ModeLock> on <type> <resource>`, with optional
/// `of relation <rel>` / `of database <db>` qualifiers and an optional
/// parenthesized detail (tuple ctid, advisory key, ...).
pub static LOCK_DESCRIPTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?ix)
        ([A-Za-z]+Lock)                  # lock-mode token
        (?:\s+on\s+([A-Za-z]+)           # lock type
            (?:\s+(\([^)]*\)|[\w$".]+))? # resource: parenthesized or bare
            (?:\s+of\s+relation\s+([\w$".]+))?
            (?:\s+of\s+database\s+([\w$".]+))?
        )?
        (?:\s*\(([^)]*)\))?              # trailing detail
        "#,
    )
    .unwrap()
});

/// Bare relation reference: `relation <schema.table|table>`
pub static RELATION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\brelation\s+("?[\w$]+"?(?:\."?[\w$]+"?)?)"#).unwrap());

/// Per-process context header: `Process <pid>:`
pub static PROCESS_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Process\s+(\d+):").unwrap());

/// Any process mention, used to attribute lock records to the nearest
/// preceding process context
pub static PROCESS_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Process\s+(\d+)").unwrap());

/// Statement text inside a process segment
pub static STATEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)statement:\s*([^\n]+)").unwrap());

/// `application_name: <value>` / `application_name=<value>`
pub static APPLICATION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)application_name[:=]\s*([^\s,;]+)").unwrap());

/// `user=<value>`
pub static USERNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\buser=([^\s,;]+)").unwrap());

/// Explicit lock grant/wait record:
/// `<ModeLock> on <type> <resource>? granted|waiting`
pub static LOCK_RECORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)([A-Za-z]+Lock)\s+on\s+([A-Za-z]+)(?:\s+(\([^)]*\)|[\w$".]+))?\s+(granted|waiting)\b"#,
    )
    .unwrap()
});

/// Table references in a statement: FROM / JOIN / UPDATE / INSERT INTO /
/// DELETE FROM, schema-qualified or quoted
pub static TABLE_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:FROM|JOIN|UPDATE|INSERT\s+INTO|DELETE\s+FROM)\s+("?[\w$]+"?(?:\."?[\w$]+"?)?)"#)
        .unwrap()
});

// PII redaction battery, applied in this order (see parser::redactor)

pub static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

pub static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b")
        .unwrap()
});

pub static CARD_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}[ -]?\d{4}[ -]?\d{4}[ -]?\d{4}\b").unwrap());

pub static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\+?\d{1,3}[-. ]?\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}\b").unwrap()
});

pub static IP_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap());

// Fingerprint parameterization (see parser::fingerprint)

pub static SQL_STRING: Lazy<Regex> = Lazy::new(|| Regex::new(r"'(?:[^']|'')*'").unwrap());

pub static SQL_QUOTED_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r#""[^"]*""#).unwrap());

pub static SQL_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?\b").unwrap());

pub static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
