//! Statement fingerprinting
//!
//! Normalizes and parameterizes statement text so that structurally
//! identical queries group together regardless of their literal values,
//! then hashes the parameterized form for cheap comparison.

use super::patterns;
use crate::deadlock::models::QueryFingerprint;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Lowercase, collapse whitespace runs to single spaces, trim
pub fn normalize(text: &str) -> String {
    patterns::WHITESPACE
        .replace_all(text.to_lowercase().trim(), " ")
        .into_owned()
}

/// Replace literals with placeholders: string literals with `'?'`, quoted
/// identifiers with `"?"`, numeric literals with `?`. Strings go first so
/// digits inside them are not re-parameterized.
pub fn parameterize(normalized: &str) -> String {
    let out = patterns::SQL_STRING.replace_all(normalized, "'?'");
    let out = patterns::SQL_QUOTED_IDENT.replace_all(&out, "\"?\"");
    let out = patterns::SQL_NUMBER.replace_all(&out, "?");
    out.into_owned()
}

/// Deterministic non-cryptographic content hash of the parameterized text
fn content_hash(parameterized: &str) -> String {
    let mut h = DefaultHasher::new();
    parameterized.hash(&mut h);
    format!("{:x}", h.finish())
}

/// Build the full fingerprint for a statement
pub fn fingerprint(statement: &str) -> QueryFingerprint {
    let normalized_text = normalize(statement);
    let parameterized_text = parameterize(&normalized_text);
    let content_hash = content_hash(&parameterized_text);
    QueryFingerprint {
        original_text: statement.to_string(),
        normalized_text,
        parameterized_text,
        content_hash,
    }
}
