//! Wait-for graph construction
//!
//! Nodes are process ids; an edge waiter → holder exists when the waiter's
//! awaited lock conflicts with a lock the holder has granted on the same
//! resource.

use super::compatibility::locks_conflict;
use crate::deadlock::models::{Lock, Transaction};
use std::collections::BTreeMap;

/// One conflict-backed edge, keeping the lock pair that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitEdge {
    pub waiter: u32,
    pub holder: u32,
    /// Index of the waiter's awaited lock
    pub waiting_lock: usize,
    /// Index of the holder's granted lock
    pub held_lock: usize,
}

/// Directed wait-for graph over the processes of one message
#[derive(Debug, Clone, Default)]
pub struct WaitForGraph {
    pub edges: Vec<WaitEdge>,
}

impl WaitForGraph {
    /// Build the graph from the assembled model
    pub fn build(transactions: &BTreeMap<u32, Transaction>, locks: &[Lock]) -> Self {
        let mut edges = Vec::new();

        for (&waiter, transaction) in transactions {
            for &waiting_index in &transaction.locks_waiting {
                let waiting = &locks[waiting_index];
                for (&holder, other) in transactions {
                    if holder == waiter {
                        continue;
                    }
                    for &held_index in &other.locks_held {
                        if locks_conflict(waiting, &locks[held_index]) {
                            edges.push(WaitEdge {
                                waiter,
                                holder,
                                waiting_lock: waiting_index,
                                held_lock: held_index,
                            });
                        }
                    }
                }
            }
        }

        Self { edges }
    }

    /// Successor map, deduplicated, deterministic order
    pub fn adjacency(&self) -> BTreeMap<u32, Vec<u32>> {
        let mut adjacency: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for edge in &self.edges {
            let successors = adjacency.entry(edge.waiter).or_default();
            if !successors.contains(&edge.holder) {
                successors.push(edge.holder);
            }
        }
        adjacency
    }

    /// All edges from `waiter` to `holder` (parallel edges are possible when
    /// several lock pairs conflict)
    pub fn edges_between(&self, waiter: u32, holder: u32) -> impl Iterator<Item = &WaitEdge> {
        self.edges
            .iter()
            .filter(move |e| e.waiter == waiter && e.holder == holder)
    }
}
