//! Graph projection for the presentation layer
//!
//! Flattens the analysis into an id-linked node/edge list a frontend can
//! render directly, and embeds the lock-compatibility matrix for the
//! accompanying reference view.

use super::compatibility;
use super::wait_graph::WaitForGraph;
use crate::deadlock::models::{
    DeadlockCycle, DeadlockGraph, GraphEdge, GraphEdgeKind, GraphNode, GraphNodeKind, Lock,
    LockType, Transaction,
};
use std::collections::{BTreeMap, BTreeSet};

fn process_node_id(pid: u32) -> String {
    format!("process_{pid}")
}

fn table_node_id(table: &str) -> String {
    format!("table_{table}")
}

/// Tables a transaction touches: statement-derived accesses plus the
/// relations of its own locks
fn transaction_tables(transaction: &Transaction, locks: &[Lock]) -> BTreeSet<String> {
    let mut tables = transaction.tables_accessed.clone();
    for &index in transaction.locks_held.iter().chain(&transaction.locks_waiting) {
        let lock = &locks[index];
        if lock.lock_type == LockType::Relation
            && let Some(relation) = &lock.relation
        {
            tables.insert(relation.to_lowercase());
        }
    }
    tables
}

/// Build the full projection
pub fn project(
    transactions: &BTreeMap<u32, Transaction>,
    locks: &[Lock],
    graph: &WaitForGraph,
    cycles: &[DeadlockCycle],
    severity: u32,
) -> DeadlockGraph {
    let cycle_processes: BTreeSet<u32> =
        cycles.iter().flat_map(|c| c.processes.iter().copied()).collect();
    let cycle_tables: BTreeSet<&String> =
        cycles.iter().flat_map(|c| c.relations.iter()).collect();

    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut tables_seen: BTreeSet<String> = BTreeSet::new();

    for (&pid, transaction) in transactions {
        nodes.push(GraphNode {
            id: process_node_id(pid),
            kind: GraphNodeKind::Process,
            label: format!("Process {pid}"),
            in_cycle: cycle_processes.contains(&pid),
        });

        for table in transaction_tables(transaction, locks) {
            tables_seen.insert(table.clone());
            edges.push(GraphEdge {
                source: process_node_id(pid),
                target: table_node_id(&table),
                kind: GraphEdgeKind::Accesses,
                label: None,
            });
        }
    }

    for table in &tables_seen {
        nodes.push(GraphNode {
            id: table_node_id(table),
            kind: GraphNodeKind::Table,
            label: table.clone(),
            in_cycle: cycle_tables.contains(table),
        });
    }

    // One wait edge per waiter/holder pair, labelled with the awaited mode
    let mut pairs_seen: BTreeSet<(u32, u32)> = BTreeSet::new();
    for edge in &graph.edges {
        if !pairs_seen.insert((edge.waiter, edge.holder)) {
            continue;
        }
        edges.push(GraphEdge {
            source: process_node_id(edge.waiter),
            target: process_node_id(edge.holder),
            kind: GraphEdgeKind::Waits,
            label: Some(locks[edge.waiting_lock].lock_mode.as_token().to_string()),
        });
    }

    DeadlockGraph {
        nodes,
        edges,
        cycles: cycles.iter().map(|c| c.processes.clone()).collect(),
        lock_compatibility: compatibility::export_matrix(),
        severity,
    }
}
