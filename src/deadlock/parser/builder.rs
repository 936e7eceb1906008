//! Model assembly
//!
//! Turns the extracted lexical pieces into `Transaction` and `Lock` records.
//! Locks live in a single arena vector; transactions reference them by index
//! through `locks_held` / `locks_waiting`, which keeps the ownership graph
//! acyclic while preserving O(1) lookup.

use super::error::{ParseError, ParseResult};
use super::extractor::{ExtractedMessage, LockDescriptor, bare_relation_name};
use super::{fingerprint, patterns, redactor};
use crate::deadlock::models::{Lock, LockMode, LockType, Transaction};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// The assembled in-memory model for one message
#[derive(Debug, Clone, Default)]
pub struct DeadlockModel {
    pub transactions: BTreeMap<u32, Transaction>,
    pub locks: Vec<Lock>,
}

impl DeadlockModel {
    /// Consistency check before analysis: every lock is owned by a known
    /// transaction and every lock index points into the arena
    pub fn validate(&self) -> ParseResult<()> {
        for lock in &self.locks {
            if !self.transactions.contains_key(&lock.process_id) {
                return Err(ParseError::UnknownProcess(lock.process_id));
            }
        }
        for transaction in self.transactions.values() {
            for &index in transaction.locks_held.iter().chain(&transaction.locks_waiting) {
                if index >= self.locks.len() {
                    return Err(ParseError::CorruptModel(format!(
                        "lock index {index} out of bounds for process {}",
                        transaction.process_id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Scan a statement for table references following FROM / JOIN / UPDATE /
/// INSERT INTO / DELETE FROM, schema and quoting stripped
pub fn tables_in_statement(statement: &str) -> BTreeSet<String> {
    patterns::TABLE_REF
        .captures_iter(statement)
        .map(|caps| bare_relation_name(&caps[1]).to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

fn lock_from_descriptor(descriptor: &LockDescriptor, process_id: u32, granted: bool) -> Lock {
    Lock {
        lock_type: descriptor.lock_type,
        relation: descriptor.relation.clone(),
        database: descriptor.database.clone(),
        lock_mode: descriptor.mode,
        granted,
        process_id,
        resource_id: descriptor.resource.clone(),
    }
}

/// Mode to assume for the blocker's side of a wait relation when the
/// message carries no explicit granted record for it. A transaction always
/// holds its own xid exclusively; everything else stays unresolved and the
/// compatibility check treats it as conflicting.
fn inferred_held_mode(lock_type: LockType) -> LockMode {
    match lock_type {
        LockType::Transactionid | LockType::Virtualxid => LockMode::Exclusive,
        _ => LockMode::Unknown,
    }
}

/// Build the transaction/lock model from an extracted message
pub fn build(extracted: &ExtractedMessage) -> DeadlockModel {
    let mut model = DeadlockModel::default();
    // (pid, granted, resource key) identities already materialized
    let mut seen: HashSet<(u32, bool, String)> = HashSet::new();

    let mut push_lock = |model: &mut DeadlockModel, lock: Lock| {
        if let Some(key) = lock.resource_key()
            && !seen.insert((lock.process_id, lock.granted, key))
        {
            return;
        }
        let pid = lock.process_id;
        let granted = lock.granted;
        let index = model.locks.len();
        model.locks.push(lock);
        let transaction = model
            .transactions
            .entry(pid)
            .or_insert_with(|| Transaction::new(pid));
        if granted {
            transaction.locks_held.push(index);
        } else {
            transaction.locks_waiting.push(index);
        }
    };

    // Explicit grant/wait records first: they carry real modes and take
    // precedence over anything inferred below
    for record in &extracted.lock_records {
        push_lock(
            &mut model,
            lock_from_descriptor(&record.descriptor, record.process_id, record.granted),
        );
    }

    for relation in &extracted.wait_relations {
        model
            .transactions
            .entry(relation.waiting_pid)
            .or_insert_with(|| Transaction::new(relation.waiting_pid));
        model
            .transactions
            .entry(relation.blocking_pid)
            .or_insert_with(|| Transaction::new(relation.blocking_pid));

        push_lock(
            &mut model,
            lock_from_descriptor(&relation.descriptor, relation.waiting_pid, false),
        );

        // `blocked by process N` implies N holds something on the contested
        // resource; materialize the counterpart so the wait-for graph can
        // evaluate the conflict
        let mut held = lock_from_descriptor(&relation.descriptor, relation.blocking_pid, true);
        held.lock_mode = inferred_held_mode(relation.descriptor.lock_type);
        push_lock(&mut model, held);
    }

    for (&pid, context) in &extracted.contexts {
        let transaction = model
            .transactions
            .entry(pid)
            .or_insert_with(|| Transaction::new(pid));

        if let Some(statement) = &context.statement {
            let redacted = redactor::redact_statement(statement);
            transaction.tables_accessed = tables_in_statement(&redacted);
            transaction.fingerprint = Some(fingerprint::fingerprint(&redacted));
            transaction.statement_text = Some(redacted);
        }
        transaction.application_name = context.application_name.clone();
        transaction.username = context.username.clone();
    }

    model
}
