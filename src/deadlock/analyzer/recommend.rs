//! Remediation recommendations
//!
//! Classifies the deadlock into a named contention pattern via a small rule
//! registry, then renders a structured narrative: root cause, canonical
//! table-access order, concrete mitigations. Plain text, not executable.

use crate::deadlock::models::{DeadlockCycle, Lock, LockMode, Transaction};
use std::collections::{BTreeMap, BTreeSet};

/// Signals the rules decide on, derived once from the assembled model
#[derive(Debug, Clone, Default)]
pub struct ScenarioFacts {
    /// Every table touched: cycle relations plus statement-derived accesses
    pub tables: BTreeSet<String>,
    pub update_statements: usize,
    pub classified_statements: usize,
    pub has_select_for_update: bool,
    pub has_exclusive_locks: bool,
    pub cycle_count: usize,
    pub process_count: usize,
}

impl ScenarioFacts {
    pub fn gather(
        transactions: &BTreeMap<u32, Transaction>,
        locks: &[Lock],
        cycles: &[DeadlockCycle],
    ) -> Self {
        let mut facts = ScenarioFacts {
            cycle_count: cycles.len(),
            process_count: transactions.len(),
            ..Default::default()
        };

        for cycle in cycles {
            facts.tables.extend(cycle.relations.iter().cloned());
        }

        for transaction in transactions.values() {
            facts.tables.extend(transaction.tables_accessed.iter().cloned());
            if let Some(statement) = &transaction.statement_text {
                let lowered = statement.to_lowercase();
                if lowered.contains("for update") {
                    facts.has_select_for_update = true;
                }
                let is_statement = ["update ", "select ", "insert ", "delete "]
                    .iter()
                    .any(|kw| lowered.trim_start().starts_with(kw));
                if is_statement {
                    facts.classified_statements += 1;
                    if lowered.trim_start().starts_with("update ") {
                        facts.update_statements += 1;
                    }
                }
            }
        }

        facts.has_exclusive_locks = locks.iter().any(|lock| {
            matches!(lock.lock_mode, LockMode::Exclusive | LockMode::AccessExclusive)
        });

        facts
    }

    /// All statements were UPDATEs (and there was at least one)
    fn pure_update_contention(&self) -> bool {
        self.classified_statements > 0 && self.update_statements == self.classified_statements
    }
}

/// One remediation pattern
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub pattern: &'static str,
    pub root_cause: String,
    pub mitigations: Vec<String>,
}

/// A classification rule; the registry is evaluated in order and the first
/// applicable rule wins
trait RecommendationRule: Send + Sync {
    fn pattern(&self) -> &'static str;
    fn applies(&self, facts: &ScenarioFacts) -> bool;
    fn build(&self, facts: &ScenarioFacts) -> Recommendation;
}

struct SelectForUpdateContention;

impl RecommendationRule for SelectForUpdateContention {
    fn pattern(&self) -> &'static str {
        "select-for-update contention"
    }

    fn applies(&self, facts: &ScenarioFacts) -> bool {
        facts.has_select_for_update
    }

    fn build(&self, facts: &ScenarioFacts) -> Recommendation {
        Recommendation {
            pattern: self.pattern(),
            root_cause: format!(
                "{} transactions acquired row locks via SELECT ... FOR UPDATE in conflicting order",
                facts.process_count
            ),
            mitigations: vec![
                "Add NOWAIT or SKIP LOCKED to FOR UPDATE clauses so waiters fail fast instead of queueing".into(),
                "Lock rows in a deterministic order (ORDER BY primary key) before modifying them".into(),
                "Consider FOR NO KEY UPDATE when the key columns are not changed".into(),
            ],
        }
    }
}

struct UpdateContention;

impl RecommendationRule for UpdateContention {
    fn pattern(&self) -> &'static str {
        "update contention"
    }

    fn applies(&self, facts: &ScenarioFacts) -> bool {
        facts.pure_update_contention()
    }

    fn build(&self, facts: &ScenarioFacts) -> Recommendation {
        Recommendation {
            pattern: self.pattern(),
            root_cause: format!(
                "concurrent UPDATE statements locked rows across {} in opposite order",
                describe_tables(&facts.tables)
            ),
            mitigations: vec![
                "Update rows in a consistent key order within each transaction".into(),
                "Shorten the transactions so row locks are held for less time".into(),
                "Batch conflicting updates through a single writer or queue".into(),
            ],
        }
    }
}

struct ExclusiveLockContention;

impl RecommendationRule for ExclusiveLockContention {
    fn pattern(&self) -> &'static str {
        "exclusive-lock contention"
    }

    fn applies(&self, facts: &ScenarioFacts) -> bool {
        facts.has_exclusive_locks
    }

    fn build(&self, facts: &ScenarioFacts) -> Recommendation {
        Recommendation {
            pattern: self.pattern(),
            root_cause: format!(
                "a transaction took an exclusive table lock on {} while others held conflicting locks",
                describe_tables(&facts.tables)
            ),
            mitigations: vec![
                "Replace explicit LOCK TABLE / DDL in hot paths with weaker lock modes where possible".into(),
                "Schedule DDL and maintenance commands outside peak write load".into(),
                "Set lock_timeout so exclusive waiters abort before a cycle forms".into(),
            ],
        }
    }
}

struct GenericContention;

impl RecommendationRule for GenericContention {
    fn pattern(&self) -> &'static str {
        "lock-order contention"
    }

    fn applies(&self, _facts: &ScenarioFacts) -> bool {
        true
    }

    fn build(&self, facts: &ScenarioFacts) -> Recommendation {
        Recommendation {
            pattern: self.pattern(),
            root_cause: format!(
                "{} transactions acquired locks on {} in conflicting order",
                facts.process_count,
                describe_tables(&facts.tables)
            ),
            mitigations: vec![
                "Keep transactions short and commit as early as possible".into(),
                "Use the weakest lock mode that still guarantees correctness".into(),
                "Set lock_timeout (or use NOWAIT) so blocked statements fail fast".into(),
                "Review the isolation level; stricter levels widen the conflict window".into(),
            ],
        }
    }
}

fn registry() -> Vec<Box<dyn RecommendationRule>> {
    vec![
        Box::new(SelectForUpdateContention),
        Box::new(UpdateContention),
        Box::new(ExclusiveLockContention),
        Box::new(GenericContention),
    ]
}

fn describe_tables(tables: &BTreeSet<String>) -> String {
    if tables.is_empty() {
        "the contested relations".to_string()
    } else {
        tables.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Classify the scenario and return the matching recommendation
pub fn classify(facts: &ScenarioFacts) -> Recommendation {
    let rules = registry();
    let rule = rules
        .iter()
        .find(|r| r.applies(facts))
        .unwrap_or_else(|| rules.last().expect("registry is never empty"));
    rule.build(facts)
}

/// Render the remediation narrative for the analysis result
pub fn recommended_fix(facts: &ScenarioFacts) -> String {
    let recommendation = classify(facts);
    let mut out = String::new();

    out.push_str(&format!(
        "Deadlock pattern: {}. Root cause: {}.\n",
        recommendation.pattern, recommendation.root_cause
    ));

    if facts.tables.len() > 1 {
        let order: Vec<&str> = facts.tables.iter().map(String::as_str).collect();
        out.push_str(&format!(
            "Access tables in one canonical order everywhere: {}.\n",
            order.join(" -> ")
        ));
    }

    out.push_str("Mitigations:\n");
    for (i, mitigation) in recommendation.mitigations.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, mitigation));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts_with(statements: &[&str]) -> ScenarioFacts {
        let mut transactions = BTreeMap::new();
        for (i, statement) in statements.iter().enumerate() {
            let mut t = Transaction::new(i as u32 + 1);
            t.tables_accessed =
                crate::deadlock::parser::builder::tables_in_statement(statement);
            t.statement_text = Some(statement.to_string());
            transactions.insert(t.process_id, t);
        }
        ScenarioFacts::gather(&transactions, &[], &[])
    }

    #[test]
    fn test_pure_update_classification() {
        let facts = facts_with(&[
            "UPDATE accounts SET balance = 1 WHERE id = 1",
            "UPDATE orders SET status = 'x' WHERE id = 2",
        ]);
        assert_eq!(classify(&facts).pattern, "update contention");
    }

    #[test]
    fn test_select_for_update_takes_precedence() {
        let facts = facts_with(&[
            "SELECT * FROM accounts WHERE id = 1 FOR UPDATE",
            "UPDATE accounts SET balance = 1 WHERE id = 1",
        ]);
        assert_eq!(classify(&facts).pattern, "select-for-update contention");
    }

    #[test]
    fn test_exclusive_lock_classification() {
        let lock = Lock {
            lock_type: crate::deadlock::models::LockType::Relation,
            relation: Some("accounts".into()),
            database: None,
            lock_mode: LockMode::AccessExclusive,
            granted: true,
            process_id: 1,
            resource_id: None,
        };
        let facts = ScenarioFacts::gather(&BTreeMap::new(), &[lock], &[]);
        assert_eq!(classify(&facts).pattern, "exclusive-lock contention");
    }

    #[test]
    fn test_generic_fallback() {
        let facts = ScenarioFacts::default();
        assert_eq!(classify(&facts).pattern, "lock-order contention");
    }

    #[test]
    fn test_narrative_orders_tables_alphabetically() {
        let mut facts = facts_with(&[
            "UPDATE orders SET status = 'x' WHERE id = 2",
            "UPDATE accounts SET balance = 1 WHERE id = 1",
        ]);
        facts.tables.insert("payments".into());
        let fix = recommended_fix(&facts);
        let accounts = fix.find("accounts").unwrap();
        let orders = fix.find("orders").unwrap();
        let payments = fix.find("payments").unwrap();
        assert!(accounts < orders && orders < payments);
        assert!(fix.contains("Mitigations:"));
    }
}
