//! End-to-end tests for the deadlock analyzer
//!
//! Message fixtures are embedded as consts; each scenario drives the full
//! pipeline through the public entry points.

use super::models::*;
use super::{DeadlockAnalyzer, analyze_message, compatibility_matrix};

/// The canonical two-process example from the PostgreSQL docs
const TWO_PROCESS: &str = "deadlock detected\n\
    Process 123 waits for ShareLock on transaction 456; blocked by process 789.\n\
    Process 789 waits for ExclusiveLock on relation accounts; blocked by process 123.\n\
    Process 123: statement: UPDATE accounts SET balance = 100 WHERE id = 1;\n\
    Process 789: statement: UPDATE orders SET status = 'paid' WHERE account_id = 1;";

/// Signature present, internal structure unusable
const TRUNCATED: &str = "ERROR: deadlock detected\nDETAIL: Process 123 waits for";

/// Three-way cycle across three relations
const THREE_PROCESS: &str = "deadlock detected\n\
    Process 10 waits for ShareLock on relation accounts; blocked by process 20.\n\
    Process 20 waits for ShareLock on relation orders; blocked by process 30.\n\
    Process 30 waits for ShareLock on relation payments; blocked by process 10.\n\
    Process 10: statement: UPDATE accounts SET balance = 0 WHERE id = 5;\n\
    Process 20: statement: UPDATE orders SET status = 'void' WHERE id = 6;\n\
    Process 30: statement: UPDATE payments SET state = 'held' WHERE id = 7;";

mod signature_scenarios {
    use super::*;

    #[test]
    fn test_deadlock_message_yields_result() {
        assert!(analyze_message(TWO_PROCESS).is_some());
    }

    #[test]
    fn test_sqlstate_marker_yields_result() {
        let message = "psycopg2.errors.DeadlockDetected 40P01\n\
            Process 1 waits for ShareLock on relation users; blocked by process 2.";
        assert!(analyze_message(message).is_some());
    }

    #[test]
    fn test_non_deadlock_message_yields_none() {
        assert!(analyze_message("ERROR: connection reset by peer").is_none());
        assert!(analyze_message("").is_none());
    }

    #[test]
    fn test_event_without_text_yields_none() {
        let analyzer = DeadlockAnalyzer::new();
        assert!(analyzer.analyze_event(&EventRecord::default()).is_none());
    }
}

mod two_process_scenario {
    use super::*;

    #[test]
    fn test_builds_both_transactions() {
        let info = analyze_message(TWO_PROCESS).unwrap();
        assert_eq!(info.transactions.len(), 2);
        assert!(info.transactions.contains_key(&123));
        assert!(info.transactions.contains_key(&789));
    }

    #[test]
    fn test_detects_exactly_one_cycle_of_length_two() {
        let info = analyze_message(TWO_PROCESS).unwrap();
        assert_eq!(info.cycles.len(), 1);

        let cycle = &info.cycles[0];
        assert_eq!(cycle.processes.len(), 2);
        assert!(cycle.processes.contains(&123));
        assert!(cycle.processes.contains(&789));
        assert!(cycle.relations.contains("accounts"));
    }

    #[test]
    fn test_produces_recommendation_and_severity() {
        let info = analyze_message(TWO_PROCESS).unwrap();
        assert!(!info.recommended_fix.is_empty());
        assert!(info.severity_score > 0);
        assert_eq!(info.cycles[0].severity, info.cycles.iter().map(|c| c.severity).max().unwrap());
    }

    #[test]
    fn test_update_contention_is_named() {
        let info = analyze_message(TWO_PROCESS).unwrap();
        assert!(info.recommended_fix.contains("update contention"));
    }

    #[test]
    fn test_tables_accessed_from_statements() {
        let info = analyze_message(TWO_PROCESS).unwrap();
        assert!(info.transactions[&123].tables_accessed.contains("accounts"));
        assert!(info.transactions[&789].tables_accessed.contains("orders"));
    }

    #[test]
    fn test_lock_indices_within_bounds() {
        let info = analyze_message(TWO_PROCESS).unwrap();
        for transaction in info.transactions.values() {
            for &index in transaction.locks_held.iter().chain(&transaction.locks_waiting) {
                assert!(index < info.locks.len());
            }
        }
    }

    #[test]
    fn test_visualization_marks_cycle_members() {
        let info = analyze_message(TWO_PROCESS).unwrap();
        let viz = &info.visualization;
        assert_eq!(viz.cycles.len(), 1);
        assert_eq!(viz.severity, info.severity_score);

        let process_nodes: Vec<_> = viz
            .nodes
            .iter()
            .filter(|n| n.kind == GraphNodeKind::Process)
            .collect();
        assert_eq!(process_nodes.len(), 2);
        assert!(process_nodes.iter().all(|n| n.in_cycle));
        assert!(viz.edges.iter().any(|e| e.kind == GraphEdgeKind::Waits));
    }

    #[test]
    fn test_raw_message_is_carried_through() {
        let info = analyze_message(TWO_PROCESS).unwrap();
        assert_eq!(info.raw_message, TWO_PROCESS);
    }
}

mod degraded_scenarios {
    use super::*;

    #[test]
    fn test_truncated_message_yields_empty_cycles() {
        let info = analyze_message(TRUNCATED).expect("signature fired, result expected");
        assert!(info.cycles.is_empty());
        assert!(info.transactions.is_empty());
        assert!(!info.recommended_fix.is_empty());
    }

    #[test]
    fn test_signature_without_cycle_yields_result() {
        // One-sided wait: no closed cycle can be reconstructed
        let message = "deadlock detected\n\
            Process 5 waits for ShareLock on relation users; blocked by process 6.";
        let info = analyze_message(message).unwrap();
        assert_eq!(info.transactions.len(), 2);
        // 5→6 exists but 6 waits on nothing, so no cycle
        assert!(info.cycles.is_empty());
    }
}

mod multi_process_scenario {
    use super::*;

    #[test]
    fn test_three_way_cycle() {
        let info = analyze_message(THREE_PROCESS).unwrap();
        assert_eq!(info.transactions.len(), 3);
        assert_eq!(info.cycles.len(), 1);

        let cycle = &info.cycles[0];
        assert_eq!(cycle.processes.len(), 3);
        for relation in ["accounts", "orders", "payments"] {
            assert!(cycle.relations.contains(relation), "missing {relation}");
        }
    }

    #[test]
    fn test_critical_tables_raise_cycle_severity() {
        // Same shape, non-critical tables
        let neutral = THREE_PROCESS
            .replace("accounts", "widgets")
            .replace("orders", "gadgets")
            .replace("payments", "gizmos");
        let critical = analyze_message(THREE_PROCESS).unwrap();
        let plain = analyze_message(&neutral).unwrap();
        assert_eq!(
            critical.cycles[0].severity,
            plain.cycles[0].severity + 3 * 15,
            "three critical tables add 15 each"
        );
    }

    #[test]
    fn test_custom_allowlist_changes_scoring() {
        let analyzer = DeadlockAnalyzer::with_critical_tables(["widgets".to_string()]);
        let neutral = THREE_PROCESS.replace("accounts", "widgets");
        let info = analyzer.analyze_message(&neutral).unwrap();
        let default_info = DeadlockAnalyzer::new().analyze_message(&neutral).unwrap();
        // default list scores orders+payments; custom list scores widgets only
        assert_eq!(info.cycles[0].severity + 15, default_info.cycles[0].severity);
    }
}

mod serialization {
    use super::*;

    #[test]
    fn test_result_serializes_with_contract_fields() {
        let info = analyze_message(TWO_PROCESS).unwrap();
        let value = serde_json::to_value(&info).unwrap();

        for field in [
            "raw_message",
            "transactions",
            "locks",
            "cycles",
            "visualization",
            "recommended_fix",
            "severity_score",
            "timestamp",
        ] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }

        let viz = &value["visualization"];
        for field in ["nodes", "edges", "cycles", "lockCompatibility", "severity"] {
            assert!(viz.get(field).is_some(), "missing visualization field {field}");
        }
    }

    #[test]
    fn test_compatibility_matrix_export() {
        let matrix = compatibility_matrix();
        assert_eq!(matrix.modes.len(), 8);
        // symmetric in the exported form as well
        for i in 0..8 {
            for j in 0..8 {
                assert_eq!(matrix.compatible[i][j], matrix.compatible[j][i]);
            }
        }
    }

    #[test]
    fn test_event_record_roundtrip() {
        let json = r#"{"event_id":"evt-1","exception":"deadlock detected ..."}"#;
        let record: EventRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.event_id.as_deref(), Some("evt-1"));
        assert!(record.diagnostic_text().unwrap().starts_with("deadlock"));
    }
}
