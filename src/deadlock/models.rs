//! Deadlock analysis data models
//!
//! These models represent the structured data extracted from a PostgreSQL
//! deadlock diagnostic message. They are designed to be serializable for API
//! responses and optimized for frontend visualization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// Event Input
// ============================================================================

/// An opaque event record handed to the analyzer.
///
/// Only the error text matters here; the surrounding event (issue-tracker
/// payload, HTTP envelope, ...) stays with the caller.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventRecord {
    /// Identifier of the originating event, carried through to log context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Plain error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Exception value string; takes precedence over `message` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl EventRecord {
    /// Build a record from a bare message string
    pub fn from_message(message: impl Into<String>) -> Self {
        Self { event_id: None, message: Some(message.into()), exception: None }
    }

    /// The diagnostic text to analyze: exception value first, then message
    pub fn diagnostic_text(&self) -> Option<&str> {
        self.exception
            .as_deref()
            .or(self.message.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// ============================================================================
// Lock Modes and Types
// ============================================================================

/// The eight standard PostgreSQL lock modes, ordered weakest to strongest,
/// plus an `Unknown` tag for tokens that cannot be resolved.
///
/// `Unknown` is deliberately treated as conflicting with everything by the
/// compatibility table; see `analyzer::compatibility`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum LockMode {
    AccessShare,
    RowShare,
    RowExclusive,
    ShareUpdateExclusive,
    Share,
    ShareRowExclusive,
    Exclusive,
    AccessExclusive,
    #[default]
    Unknown,
}

impl LockMode {
    /// All resolvable modes, in matrix order
    pub const KNOWN: [LockMode; 8] = [
        LockMode::AccessShare,
        LockMode::RowShare,
        LockMode::RowExclusive,
        LockMode::ShareUpdateExclusive,
        LockMode::Share,
        LockMode::ShareRowExclusive,
        LockMode::Exclusive,
        LockMode::AccessExclusive,
    ];

    /// Parse a raw token such as `AccessExclusiveLock` (trailing `Lock`
    /// optional, case-insensitive). Unrecognized tokens map to `Unknown`.
    pub fn from_token(token: &str) -> LockMode {
        let t = token.trim();
        let t = t.strip_suffix("Lock").or_else(|| t.strip_suffix("lock")).unwrap_or(t);
        match t.to_ascii_lowercase().as_str() {
            "accessshare" => LockMode::AccessShare,
            "rowshare" => LockMode::RowShare,
            "rowexclusive" => LockMode::RowExclusive,
            "shareupdateexclusive" => LockMode::ShareUpdateExclusive,
            "share" => LockMode::Share,
            "sharerowexclusive" => LockMode::ShareRowExclusive,
            "exclusive" => LockMode::Exclusive,
            "accessexclusive" => LockMode::AccessExclusive,
            _ => LockMode::Unknown,
        }
    }

    /// The canonical PostgreSQL token for this mode
    pub fn as_token(&self) -> &'static str {
        match self {
            LockMode::AccessShare => "AccessShareLock",
            LockMode::RowShare => "RowShareLock",
            LockMode::RowExclusive => "RowExclusiveLock",
            LockMode::ShareUpdateExclusive => "ShareUpdateExclusiveLock",
            LockMode::Share => "ShareLock",
            LockMode::ShareRowExclusive => "ShareRowExclusiveLock",
            LockMode::Exclusive => "ExclusiveLock",
            LockMode::AccessExclusive => "AccessExclusiveLock",
            LockMode::Unknown => "UnknownLock",
        }
    }

    /// Position in the 8x8 compatibility matrix; `None` for `Unknown`
    pub fn matrix_index(&self) -> Option<usize> {
        Self::KNOWN.iter().position(|m| m == self)
    }
}

/// Kind of resource a lock targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LockType {
    Relation,
    Tuple,
    Transactionid,
    Virtualxid,
    Object,
    Page,
    Extend,
    Advisory,
    #[default]
    Other,
}

impl LockType {
    /// Parse a raw lock-type token (case-insensitive); unrecognized → `Other`
    pub fn from_token(token: &str) -> LockType {
        match token.trim().to_ascii_lowercase().as_str() {
            "relation" => LockType::Relation,
            "tuple" => LockType::Tuple,
            "transactionid" | "transaction" => LockType::Transactionid,
            "virtualxid" => LockType::Virtualxid,
            "object" => LockType::Object,
            "page" => LockType::Page,
            "extend" => LockType::Extend,
            "advisory" => LockType::Advisory,
            _ => LockType::Other,
        }
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            LockType::Relation => "relation",
            LockType::Tuple => "tuple",
            LockType::Transactionid => "transactionid",
            LockType::Virtualxid => "virtualxid",
            LockType::Object => "object",
            LockType::Page => "page",
            LockType::Extend => "extend",
            LockType::Advisory => "advisory",
            LockType::Other => "other",
        }
    }
}

// ============================================================================
// Locks and Transactions
// ============================================================================

/// A single lock either held (granted) or awaited by one process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lock {
    pub lock_type: LockType,
    /// Bare relation name for relation locks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    pub lock_mode: LockMode,
    pub granted: bool,
    pub process_id: u32,
    /// Non-relation resource identity (xid, tuple ctid, advisory key, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl Lock {
    /// Identity the compatibility check keys on: two locks can only conflict
    /// when they target the same resource.
    pub fn resource_key(&self) -> Option<String> {
        match self.lock_type {
            LockType::Relation => self.relation.as_ref().map(|r| format!("relation:{r}")),
            other => self
                .resource_id
                .as_ref()
                .map(|id| format!("{}:{id}", other.as_token())),
        }
    }
}

/// Normalized, literal-stripped representation of a statement.
///
/// Derived deterministically from `original_text` and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFingerprint {
    pub original_text: String,
    pub normalized_text: String,
    pub parameterized_text: String,
    pub content_hash: String,
}

/// One participant process in the deadlock
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Transaction {
    pub process_id: u32,
    /// Statement text after PII redaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<QueryFingerprint>,
    pub tables_accessed: BTreeSet<String>,
    /// Indices into `DeadlockInfo::locks`
    pub locks_held: Vec<usize>,
    pub locks_waiting: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Transaction {
    pub fn new(process_id: u32) -> Self {
        Self { process_id, ..Default::default() }
    }
}

// ============================================================================
// Cycles and the Terminal Artifact
// ============================================================================

/// One closed wait-for cycle; always at least two distinct processes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlockCycle {
    /// Process ids in cycle order, starting from the smallest pid
    pub processes: Vec<u32>,
    /// Relation names implicated by the waiting locks along the cycle
    pub relations: BTreeSet<String>,
    pub severity: u32,
}

/// The complete analysis result. Immutable once produced; carries no
/// back-reference into the event it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlockInfo {
    pub raw_message: String,
    pub transactions: BTreeMap<u32, Transaction>,
    pub locks: Vec<Lock>,
    /// Sorted by descending severity
    pub cycles: Vec<DeadlockCycle>,
    pub visualization: DeadlockGraph,
    pub recommended_fix: String,
    pub severity_score: u32,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Visualization Projection
// ============================================================================

/// Node classification for visualization styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphNodeKind {
    Process,
    Table,
}

/// A node in the projected graph: one per process, one per distinct table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: GraphNodeKind,
    pub label: String,
    #[serde(rename = "inCycle")]
    pub in_cycle: bool,
}

/// Edge classification: process→process wait edges, process→table access edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphEdgeKind {
    Waits,
    Accesses,
}

/// A directed edge in the projected graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: GraphEdgeKind,
    /// Lock-mode annotation for wait edges
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Export of the 8x8 lock-mode compatibility table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityMatrix {
    /// Mode tokens in row/column order
    pub modes: Vec<String>,
    /// `compatible[i][j]` — whether modes i and j can coexist
    pub compatible: Vec<Vec<bool>>,
}

/// Graph description handed to a presentation-layer consumer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlockGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Process-id sequences, one per detected cycle
    pub cycles: Vec<Vec<u32>>,
    #[serde(rename = "lockCompatibility")]
    pub lock_compatibility: CompatibilityMatrix,
    pub severity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_mode_token_roundtrip() {
        for mode in LockMode::KNOWN {
            assert_eq!(LockMode::from_token(mode.as_token()), mode);
        }
    }

    #[test]
    fn test_lock_mode_unknown_token() {
        assert_eq!(LockMode::from_token("SuperExclusiveLock"), LockMode::Unknown);
        assert_eq!(LockMode::from_token(""), LockMode::Unknown);
    }

    #[test]
    fn test_lock_mode_ordering_weakest_to_strongest() {
        assert!(LockMode::AccessShare < LockMode::RowShare);
        assert!(LockMode::Share < LockMode::ShareRowExclusive);
        assert!(LockMode::Exclusive < LockMode::AccessExclusive);
    }

    #[test]
    fn test_lock_type_tokens() {
        assert_eq!(LockType::from_token("relation"), LockType::Relation);
        assert_eq!(LockType::from_token("Transaction"), LockType::Transactionid);
        assert_eq!(LockType::from_token("speculative token"), LockType::Other);
    }

    #[test]
    fn test_resource_key_scopes_by_type() {
        let rel = Lock {
            lock_type: LockType::Relation,
            relation: Some("accounts".into()),
            database: None,
            lock_mode: LockMode::Share,
            granted: true,
            process_id: 1,
            resource_id: None,
        };
        let xid = Lock {
            lock_type: LockType::Transactionid,
            relation: None,
            database: None,
            lock_mode: LockMode::Share,
            granted: false,
            process_id: 2,
            resource_id: Some("456".into()),
        };
        assert_eq!(rel.resource_key().as_deref(), Some("relation:accounts"));
        assert_eq!(xid.resource_key().as_deref(), Some("transactionid:456"));
    }

    #[test]
    fn test_event_record_prefers_exception() {
        let record = EventRecord {
            event_id: None,
            message: Some("message text".into()),
            exception: Some("exception text".into()),
        };
        assert_eq!(record.diagnostic_text(), Some("exception text"));
        assert_eq!(EventRecord::default().diagnostic_text(), None);
    }
}
