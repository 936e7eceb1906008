//! Lexical extraction over the raw diagnostic text
//!
//! Applies the fixed pattern battery and collects everything the model
//! builder needs: wait relationships, lock descriptors, relation names and
//! per-process context. Extraction is best-effort throughout; a field that
//! cannot be located is left absent rather than failing the parse.

use super::patterns;
use crate::deadlock::models::{LockMode, LockType};
use std::collections::{BTreeMap, BTreeSet};

/// A parsed lock descriptor such as `ShareLock on transaction 456`
#[derive(Debug, Clone, Default)]
pub struct LockDescriptor {
    pub mode: LockMode,
    pub lock_type: LockType,
    /// Relation name for relation locks, raw resource identity otherwise
    pub relation: Option<String>,
    pub resource: Option<String>,
    pub database: Option<String>,
}

/// One `Process A waits for X; blocked by process B` relationship
#[derive(Debug, Clone)]
pub struct WaitRelation {
    pub waiting_pid: u32,
    pub descriptor: LockDescriptor,
    pub blocking_pid: u32,
}

/// Context scoped to one `Process <pid>:` segment
#[derive(Debug, Clone, Default)]
pub struct ProcessContext {
    pub statement: Option<String>,
    pub application_name: Option<String>,
    pub username: Option<String>,
}

/// An explicit `<mode> on <type> <resource> granted|waiting` record
#[derive(Debug, Clone)]
pub struct RawLockRecord {
    pub process_id: u32,
    pub descriptor: LockDescriptor,
    pub granted: bool,
}

/// Everything the pattern battery pulled out of one message
#[derive(Debug, Clone, Default)]
pub struct ExtractedMessage {
    pub wait_relations: Vec<WaitRelation>,
    /// Bare table names mentioned anywhere in the message
    pub relations: BTreeSet<String>,
    pub contexts: BTreeMap<u32, ProcessContext>,
    pub lock_records: Vec<RawLockRecord>,
}

/// Strip schema qualifier and surrounding quotes from a relation token
pub fn bare_relation_name(token: &str) -> String {
    let name = token.rsplit('.').next().unwrap_or(token);
    name.trim_matches('"').to_string()
}

fn parse_pid(digits: &str) -> Option<u32> {
    // Overflowing pids are garbage; drop the triple instead of aborting
    digits.parse().ok()
}

/// Parse a lock descriptor fragment into mode/type/resource parts
pub fn parse_descriptor(text: &str) -> LockDescriptor {
    let mut desc = LockDescriptor::default();
    let Some(caps) = patterns::LOCK_DESCRIPTOR.captures(text) else {
        return desc;
    };

    desc.mode = caps
        .get(1)
        .map(|m| LockMode::from_token(m.as_str()))
        .unwrap_or(LockMode::Unknown);
    desc.lock_type = caps
        .get(2)
        .map(|m| LockType::from_token(m.as_str()))
        .unwrap_or_default();
    desc.database = caps.get(5).map(|m| m.as_str().trim_matches('"').to_string());

    let resource = caps.get(3).map(|m| m.as_str().to_string());
    // `... on tuple (0,2) of relation accounts` carries the relation in a
    // trailing qualifier; plain relation locks carry it as the resource
    let qualifier_relation = caps.get(4).map(|m| bare_relation_name(m.as_str()));
    match desc.lock_type {
        LockType::Relation => {
            desc.relation = resource.as_deref().map(bare_relation_name);
        },
        _ => {
            desc.relation = qualifier_relation;
            desc.resource = resource;
        },
    }
    if desc.resource.is_none() {
        // Parenthesized detail (tuple ctid, advisory key) doubles as the
        // resource identity when nothing better was captured
        desc.resource = caps.get(6).map(|m| m.as_str().to_string());
    }
    desc
}

/// Run the full battery against a message
pub fn extract(message: &str) -> ExtractedMessage {
    let mut extracted = ExtractedMessage::default();

    for caps in patterns::WAIT_EDGE.captures_iter(message) {
        let (Some(waiting), Some(blocking)) =
            (parse_pid(&caps[1]), parse_pid(&caps[3]))
        else {
            tracing::debug!("skipping wait relation with unparseable pid: {}", &caps[0]);
            continue;
        };
        extracted.wait_relations.push(WaitRelation {
            waiting_pid: waiting,
            descriptor: parse_descriptor(&caps[2]),
            blocking_pid: blocking,
        });
    }

    for caps in patterns::RELATION_NAME.captures_iter(message) {
        let name = bare_relation_name(&caps[1]);
        // OID-only references carry no usable name
        if !name.is_empty() && !name.chars().all(|c| c.is_ascii_digit()) {
            extracted.relations.insert(name.to_lowercase());
        }
    }

    extract_process_contexts(message, &mut extracted);
    extract_lock_records(message, &mut extracted);

    extracted
}

/// Scope per-process fields to the segment between one `Process <pid>:`
/// header and the next (or end of message)
fn extract_process_contexts(message: &str, extracted: &mut ExtractedMessage) {
    let headers: Vec<(u32, usize, usize)> = patterns::PROCESS_HEADER
        .captures_iter(message)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((parse_pid(&caps[1])?, whole.start(), whole.end()))
        })
        .collect();

    for (i, &(pid, _, body_start)) in headers.iter().enumerate() {
        let body_end = headers
            .get(i + 1)
            .map(|&(_, next_start, _)| next_start)
            .unwrap_or(message.len());
        let segment = &message[body_start..body_end];

        let context = extracted.contexts.entry(pid).or_default();
        if context.statement.is_none() {
            context.statement = patterns::STATEMENT
                .captures(segment)
                .map(|c| c[1].trim().to_string())
                .filter(|s| !s.is_empty());
        }
        if context.application_name.is_none() {
            context.application_name = patterns::APPLICATION_NAME
                .captures(segment)
                .map(|c| c[1].trim().to_string());
        }
        if context.username.is_none() {
            context.username = patterns::USERNAME
                .captures(segment)
                .map(|c| c[1].trim().to_string());
        }
    }
}

/// Attribute explicit grant/wait records to the nearest preceding process
/// mention; records with no such context are dropped.
fn extract_lock_records(message: &str, extracted: &mut ExtractedMessage) {
    let markers: Vec<(usize, u32)> = patterns::PROCESS_MARKER
        .captures_iter(message)
        .filter_map(|caps| Some((caps.get(0)?.start(), parse_pid(&caps[1])?)))
        .collect();

    for caps in patterns::LOCK_RECORD.captures_iter(message) {
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let Some(&(_, pid)) = markers.iter().rev().find(|&&(pos, _)| pos < start) else {
            tracing::debug!("lock record without process context: {}", &caps[0]);
            continue;
        };
        extracted.lock_records.push(RawLockRecord {
            process_id: pid,
            descriptor: parse_descriptor(&caps[0]),
            granted: caps[4].eq_ignore_ascii_case("granted"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PROCESS_MESSAGE: &str = "deadlock detected\n\
        Process 123 waits for ShareLock on transaction 456; blocked by process 789.\n\
        Process 789 waits for ExclusiveLock on relation accounts; blocked by process 123.\n\
        Process 123: statement: UPDATE accounts SET balance = 100 WHERE id = 1;\n\
        Process 789: statement: UPDATE orders SET status = 'paid' WHERE account_id = 1;";

    #[test]
    fn test_extracts_wait_relations() {
        let extracted = extract(TWO_PROCESS_MESSAGE);
        assert_eq!(extracted.wait_relations.len(), 2);

        let first = &extracted.wait_relations[0];
        assert_eq!(first.waiting_pid, 123);
        assert_eq!(first.blocking_pid, 789);
        assert_eq!(first.descriptor.mode, LockMode::Share);
        assert_eq!(first.descriptor.lock_type, LockType::Transactionid);
        assert_eq!(first.descriptor.resource.as_deref(), Some("456"));

        let second = &extracted.wait_relations[1];
        assert_eq!(second.descriptor.mode, LockMode::Exclusive);
        assert_eq!(second.descriptor.lock_type, LockType::Relation);
        assert_eq!(second.descriptor.relation.as_deref(), Some("accounts"));
    }

    #[test]
    fn test_extracts_relation_names() {
        let extracted = extract(TWO_PROCESS_MESSAGE);
        assert!(extracted.relations.contains("accounts"));
    }

    #[test]
    fn test_strips_schema_qualifier() {
        let extracted =
            extract("deadlock detected\nProcess 1 waits for ShareLock on relation public.orders; blocked by process 2.");
        assert!(extracted.relations.contains("orders"));
        assert_eq!(
            extracted.wait_relations[0].descriptor.relation.as_deref(),
            Some("orders")
        );
    }

    #[test]
    fn test_extracts_process_contexts() {
        let extracted = extract(TWO_PROCESS_MESSAGE);
        let ctx = extracted.contexts.get(&123).expect("context for 123");
        assert_eq!(
            ctx.statement.as_deref(),
            Some("UPDATE accounts SET balance = 100 WHERE id = 1;")
        );
        assert!(extracted.contexts.contains_key(&789));
    }

    #[test]
    fn test_extracts_application_and_user() {
        let message = "deadlock detected\n\
            Process 42 waits for ShareLock on relation users; blocked by process 43.\n\
            Process 42: statement: SELECT 1 application_name: billing-worker user=svc_billing";
        let extracted = extract(message);
        let ctx = extracted.contexts.get(&42).unwrap();
        assert_eq!(ctx.application_name.as_deref(), Some("billing-worker"));
        assert_eq!(ctx.username.as_deref(), Some("svc_billing"));
    }

    #[test]
    fn test_extracts_explicit_lock_records() {
        let message = "deadlock detected\n\
            Process 55: RowExclusiveLock on relation payments granted\n\
            Process 55: ShareLock on transactionid 900 waiting";
        let extracted = extract(message);
        assert_eq!(extracted.lock_records.len(), 2);
        assert!(extracted.lock_records[0].granted);
        assert_eq!(extracted.lock_records[0].process_id, 55);
        assert!(!extracted.lock_records[1].granted);
        assert_eq!(
            extracted.lock_records[1].descriptor.lock_type,
            LockType::Transactionid
        );
    }

    #[test]
    fn test_truncated_message_extracts_nothing() {
        let extracted = extract("deadlock detected\nProcess 123 waits for");
        assert!(extracted.wait_relations.is_empty());
        assert!(extracted.lock_records.is_empty());
    }
}
