//! Graph analysis over the assembled deadlock model
//!
//! Compatibility checking, wait-for graph construction, cycle enumeration,
//! severity scoring, remediation synthesis and the visualization projection.

pub mod compatibility;
pub mod cycles;
pub mod recommend;
pub mod severity;
pub mod visualization;
pub mod wait_graph;

pub use severity::{DEFAULT_CRITICAL_TABLES, SeverityScorer};
pub use wait_graph::WaitForGraph;
