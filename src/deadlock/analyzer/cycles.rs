//! Elementary cycle enumeration
//!
//! Wait-for graphs here are tiny (one node per backend process mentioned in
//! a single diagnostic), so a DFS with an ordered-start canonicalization is
//! enough: every elementary cycle is reported exactly once, as the node
//! sequence starting from its smallest process id.

use super::wait_graph::WaitForGraph;
use crate::deadlock::models::{Lock, LockType};
use std::collections::{BTreeMap, BTreeSet};

/// All elementary cycles of length >= 2, each starting at its smallest node
pub fn find_elementary_cycles(adjacency: &BTreeMap<u32, Vec<u32>>) -> Vec<Vec<u32>> {
    let mut cycles = Vec::new();
    let mut path = Vec::new();
    let mut on_path = BTreeSet::new();

    for &start in adjacency.keys() {
        path.push(start);
        on_path.insert(start);
        dfs(start, start, adjacency, &mut path, &mut on_path, &mut cycles);
        path.pop();
        on_path.remove(&start);
    }

    cycles
}

fn dfs(
    start: u32,
    current: u32,
    adjacency: &BTreeMap<u32, Vec<u32>>,
    path: &mut Vec<u32>,
    on_path: &mut BTreeSet<u32>,
    cycles: &mut Vec<Vec<u32>>,
) {
    let Some(successors) = adjacency.get(&current) else {
        return;
    };
    for &next in successors {
        if next == start {
            if path.len() >= 2 {
                cycles.push(path.clone());
            }
            continue;
        }
        // Restricting to nodes above the start pins each cycle to the
        // traversal that begins at its smallest member
        if next < start || on_path.contains(&next) {
            continue;
        }
        path.push(next);
        on_path.insert(next);
        dfs(start, next, adjacency, path, on_path, cycles);
        path.pop();
        on_path.remove(&next);
    }
}

/// Relation names implicated by the waiting locks along a cycle's edges
pub fn cycle_relations(cycle: &[u32], graph: &WaitForGraph, locks: &[Lock]) -> BTreeSet<String> {
    let mut relations = BTreeSet::new();
    for (i, &waiter) in cycle.iter().enumerate() {
        let holder = cycle[(i + 1) % cycle.len()];
        for edge in graph.edges_between(waiter, holder) {
            let waiting = &locks[edge.waiting_lock];
            if waiting.lock_type == LockType::Relation
                && let Some(relation) = &waiting.relation
            {
                relations.insert(relation.to_lowercase());
            }
        }
    }
    relations
}
