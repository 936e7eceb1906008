//! Severity scoring
//!
//! Additive heuristics ranking how impactful a detected deadlock is, based
//! on scope (processes, relations, locks) and whether business-critical
//! tables are involved.

use crate::deadlock::models::{DeadlockCycle, Lock, LockMode};
use std::collections::BTreeSet;

/// Scoring weights
pub mod weights {
    /// Base score for any closed cycle
    pub const CYCLE_BASE: u32 = 10;
    /// Per process participating in a cycle
    pub const CYCLE_PER_PROCESS: u32 = 5;
    /// Per distinct relation in a cycle
    pub const CYCLE_PER_RELATION: u32 = 3;
    /// Per critical table, both in-cycle and overall
    pub const CRITICAL_TABLE_BONUS: u32 = 15;
    /// Overall: per detected cycle
    pub const PER_CYCLE: u32 = 10;
    /// Overall: per participating transaction
    pub const PER_TRANSACTION: u32 = 5;
    /// Overall: per extracted lock
    pub const PER_LOCK: u32 = 2;
    /// Overall: per Exclusive/AccessExclusive lock
    pub const STRONG_LOCK_BONUS: u32 = 5;
    /// Overall: per Share/ShareRowExclusive lock
    pub const SHARE_LOCK_BONUS: u32 = 3;
}

/// Default allowlist of business-critical tables
pub const DEFAULT_CRITICAL_TABLES: &[&str] =
    &["users", "accounts", "payments", "orders", "transactions"];

/// Scores cycles and whole analyses against a critical-table allowlist
#[derive(Debug, Clone)]
pub struct SeverityScorer {
    critical_tables: BTreeSet<String>,
}

impl Default for SeverityScorer {
    fn default() -> Self {
        Self::new(DEFAULT_CRITICAL_TABLES.iter().map(|t| t.to_string()))
    }
}

impl SeverityScorer {
    pub fn new(critical_tables: impl IntoIterator<Item = String>) -> Self {
        Self {
            critical_tables: critical_tables
                .into_iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn is_critical(&self, table: &str) -> bool {
        self.critical_tables.contains(&table.to_lowercase())
    }

    /// Severity of a single cycle
    pub fn cycle_severity(&self, processes: &[u32], relations: &BTreeSet<String>) -> u32 {
        let critical = relations.iter().filter(|r| self.is_critical(r)).count() as u32;
        weights::CYCLE_BASE
            + weights::CYCLE_PER_PROCESS * processes.len() as u32
            + weights::CYCLE_PER_RELATION * relations.len() as u32
            + weights::CRITICAL_TABLE_BONUS * critical
    }

    /// Overall severity of the whole analysis
    pub fn overall_severity(
        &self,
        cycles: &[DeadlockCycle],
        transaction_count: usize,
        locks: &[Lock],
    ) -> u32 {
        let critical_across_cycles: BTreeSet<&String> = cycles
            .iter()
            .flat_map(|c| c.relations.iter())
            .filter(|r| self.is_critical(r))
            .collect();

        let lock_bonus: u32 = locks
            .iter()
            .map(|lock| match lock.lock_mode {
                LockMode::Exclusive | LockMode::AccessExclusive => weights::STRONG_LOCK_BONUS,
                LockMode::Share | LockMode::ShareRowExclusive => weights::SHARE_LOCK_BONUS,
                _ => 0,
            })
            .sum();

        weights::PER_CYCLE * cycles.len() as u32
            + weights::PER_TRANSACTION * transaction_count as u32
            + weights::PER_LOCK * locks.len() as u32
            + weights::CRITICAL_TABLE_BONUS * critical_across_cycles.len() as u32
            + lock_bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadlock::models::LockType;

    fn relations(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_cycle_severity_arithmetic() {
        let scorer = SeverityScorer::default();
        // 10 base + 2*5 processes + 1*3 relations + 15 critical ("accounts")
        assert_eq!(scorer.cycle_severity(&[1, 2], &relations(&["accounts"])), 38);
    }

    #[test]
    fn test_critical_table_adds_exactly_fifteen() {
        let scorer = SeverityScorer::default();
        let without = scorer.cycle_severity(&[1, 2], &relations(&["widgets"]));
        let with = scorer.cycle_severity(&[1, 2], &relations(&["payments"]));
        assert_eq!(with, without + weights::CRITICAL_TABLE_BONUS);
    }

    #[test]
    fn test_custom_allowlist() {
        let scorer = SeverityScorer::new(["Ledger".to_string()]);
        assert!(scorer.is_critical("ledger"));
        assert!(!scorer.is_critical("accounts"));
    }

    #[test]
    fn test_overall_severity_counts_lock_bonuses() {
        let scorer = SeverityScorer::default();
        let lock = |mode| Lock {
            lock_type: LockType::Relation,
            relation: Some("widgets".into()),
            database: None,
            lock_mode: mode,
            granted: true,
            process_id: 1,
            resource_id: None,
        };
        let locks = vec![lock(LockMode::AccessExclusive), lock(LockMode::Share)];
        // no cycles: 0 + 2*5 txns + 2*2 locks + 0 critical + (5 + 3)
        assert_eq!(scorer.overall_severity(&[], 2, &locks), 22);
    }

    #[test]
    fn test_overall_severity_counts_critical_tables_once() {
        let scorer = SeverityScorer::default();
        let cycle = |rels: &[&str]| DeadlockCycle {
            processes: vec![1, 2],
            relations: relations(rels),
            severity: 0,
        };
        let two_cycles = [cycle(&["accounts"]), cycle(&["accounts", "orders"])];
        // 2*10 cycles + 2*5 txns + 0 locks + 15*2 distinct critical tables
        assert_eq!(scorer.overall_severity(&two_cycles, 2, &[]), 60);
    }
}
