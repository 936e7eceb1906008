//! PII redaction for captured statement text
//!
//! Statements embedded in deadlock diagnostics regularly carry literal
//! customer data (emails, card numbers, ...). Redaction replaces them with
//! fixed placeholders before the text is stored or logged anywhere.

use super::patterns;

/// Placeholder substitutions, applied in this order. The placeholders
/// themselves match none of the patterns, which is what makes redaction
/// idempotent.
pub fn redact_statement(text: &str) -> String {
    let redacted = patterns::EMAIL.replace_all(text, "[EMAIL]");
    let redacted = patterns::UUID.replace_all(&redacted, "[UUID]");
    let redacted = patterns::CARD_NUMBER.replace_all(&redacted, "[CC_NUMBER]");
    let redacted = patterns::PHONE.replace_all(&redacted, "[PHONE]");
    let redacted = patterns::IP_ADDRESS.replace_all(&redacted, "[IP_ADDRESS]");
    redacted.into_owned()
}
