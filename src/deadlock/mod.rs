//! PostgreSQL Deadlock Analyzer
//!
//! A comprehensive module for parsing, analyzing, and visualizing PostgreSQL
//! deadlock diagnostics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     DeadlockAnalyzer                        │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │                   analyze_event()                   │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! │                           │                                 │
//! │           ┌───────────────┼───────────────┐                │
//! │           ▼               ▼               ▼                │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐        │
//! │  │   Parser    │  │  Analyzer   │  │   Models    │        │
//! │  │  Signature  │  │  WaitGraph  │  │  Lock       │        │
//! │  │  Extractor  │  │  Cycles     │  │  Transaction│        │
//! │  │  Redactor   │  │  Severity   │  │  DeadlockInfo│       │
//! │  │  Builder    │  │  Recommend  │  │  ...        │        │
//! │  └─────────────┘  └─────────────┘  └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use lockgraph::deadlock::DeadlockAnalyzer;
//!
//! let analyzer = DeadlockAnalyzer::new();
//! if let Some(info) = analyzer.analyze_message(raw_error_text) {
//!     println!("severity: {}", info.severity_score);
//!     println!("{}", info.recommended_fix);
//! }
//! ```
//!
//! The analyzer is a pure function from an input string to an immutable
//! result (or nothing). It performs no I/O and holds no state between
//! invocations beyond the compiled pattern cache, so one instance can be
//! shared freely across threads.

pub mod analyzer;
pub mod models;
pub mod parser;

#[cfg(test)]
mod tests;

pub use analyzer::{DEFAULT_CRITICAL_TABLES, SeverityScorer};
pub use models::*;
pub use parser::is_deadlock_message;

use analyzer::wait_graph::WaitForGraph;
use analyzer::{compatibility, cycles, recommend, visualization};
use chrono::Utc;
use parser::{ParseResult, builder, extractor};

/// The deadlock analysis pipeline
///
/// Construction is cheap; the only configurable part is the allowlist of
/// business-critical tables that weight the severity score.
#[derive(Debug, Clone, Default)]
pub struct DeadlockAnalyzer {
    scorer: SeverityScorer,
}

impl DeadlockAnalyzer {
    /// Analyzer with the default critical-table allowlist
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzer with a custom critical-table allowlist
    pub fn with_critical_tables(tables: impl IntoIterator<Item = String>) -> Self {
        Self { scorer: SeverityScorer::new(tables) }
    }

    /// Analyze an event record.
    ///
    /// Returns `None` when the event carries no text, when the text does not
    /// match a deadlock signature, or when analysis fails internally. No
    /// failure ever propagates to the caller; internal ones are logged with
    /// the event id for context.
    pub fn analyze_event(&self, event: &EventRecord) -> Option<DeadlockInfo> {
        let event_id = event.event_id.as_deref().unwrap_or("-");
        let Some(text) = event.diagnostic_text() else {
            tracing::debug!(event_id, "event carries no error text");
            return None;
        };

        if !is_deadlock_message(text) {
            tracing::debug!(event_id, "no deadlock signature in event text");
            return None;
        }

        match self.run_pipeline(text) {
            Ok(info) => Some(info),
            Err(error) => {
                tracing::warn!(event_id, %error, "deadlock analysis failed");
                None
            },
        }
    }

    /// Analyze a bare message string
    pub fn analyze_message(&self, message: &str) -> Option<DeadlockInfo> {
        self.analyze_event(&EventRecord::from_message(message))
    }

    /// The pipeline proper; only called once the signature has fired
    fn run_pipeline(&self, message: &str) -> ParseResult<DeadlockInfo> {
        let extracted = extractor::extract(message);
        tracing::debug!(
            wait_relations = extracted.wait_relations.len(),
            relations = extracted.relations.len(),
            contexts = extracted.contexts.len(),
            "extraction complete"
        );

        let model = builder::build(&extracted);
        model.validate()?;

        let graph = WaitForGraph::build(&model.transactions, &model.locks);
        let mut detected: Vec<DeadlockCycle> =
            cycles::find_elementary_cycles(&graph.adjacency())
                .into_iter()
                .map(|processes| {
                    let relations = cycles::cycle_relations(&processes, &graph, &model.locks);
                    let severity = self.scorer.cycle_severity(&processes, &relations);
                    DeadlockCycle { processes, relations, severity }
                })
                .collect();
        detected.sort_by(|a, b| b.severity.cmp(&a.severity));

        let severity_score =
            self.scorer
                .overall_severity(&detected, model.transactions.len(), &model.locks);

        let mut facts =
            recommend::ScenarioFacts::gather(&model.transactions, &model.locks, &detected);
        // Relations mentioned anywhere in the message count toward the
        // recommended access order, lock-associated or not
        facts.tables.extend(extracted.relations.iter().cloned());
        let recommended_fix = recommend::recommended_fix(&facts);

        let visualization = visualization::project(
            &model.transactions,
            &model.locks,
            &graph,
            &detected,
            severity_score,
        );

        Ok(DeadlockInfo {
            raw_message: message.to_string(),
            transactions: model.transactions,
            locks: model.locks,
            cycles: detected,
            visualization,
            recommended_fix,
            severity_score,
            timestamp: Utc::now(),
        })
    }
}

/// One-shot convenience over a default analyzer
pub fn analyze_message(message: &str) -> Option<DeadlockInfo> {
    DeadlockAnalyzer::new().analyze_message(message)
}

/// The static lock-compatibility matrix, for reference consumers
pub fn compatibility_matrix() -> CompatibilityMatrix {
    compatibility::export_matrix()
}
