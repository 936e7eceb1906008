//! Lockgraph Library
//!
//! Turns raw PostgreSQL "deadlock detected" diagnostics into a structured,
//! queryable model: the competing transactions, the locks they held and
//! awaited, the wait-for cycles behind the abort, a severity score, a
//! remediation narrative and a graph projection for visualization.

pub mod config;
pub mod deadlock;

// Re-export commonly used types
pub use config::Config;
pub use deadlock::{
    DeadlockAnalyzer, DeadlockInfo, EventRecord, analyze_message, compatibility_matrix,
};
