//! Lock-mode compatibility
//!
//! The standard PostgreSQL 8x8 conflict table, expressed as a const matrix
//! in `LockMode::KNOWN` order (weakest to strongest). `true` means the two
//! modes can be held on the same relation at the same time.

use crate::deadlock::models::{CompatibilityMatrix, Lock, LockMode};

/// rows/columns: AccessShare, RowShare, RowExclusive, ShareUpdateExclusive,
/// Share, ShareRowExclusive, Exclusive, AccessExclusive
const COMPATIBLE: [[bool; 8]; 8] = [
    [true, true, true, true, true, true, true, false],
    [true, true, true, true, true, true, false, false],
    [true, true, true, true, false, false, false, false],
    [true, true, true, false, false, false, false, false],
    [true, true, false, false, true, false, false, false],
    [true, true, false, false, false, false, false, false],
    [true, false, false, false, false, false, false, false],
    [false, false, false, false, false, false, false, false],
];

/// Whether two lock modes can coexist. Unresolved modes are treated as
/// incompatible: a manufactured edge is preferred over a missed one, even
/// though it can produce cycles a fully-resolved message would not.
pub fn modes_compatible(a: LockMode, b: LockMode) -> bool {
    match (a.matrix_index(), b.matrix_index()) {
        (Some(i), Some(j)) => COMPATIBLE[i][j],
        _ => false,
    }
}

/// Whether a waiting lock actually conflicts with a held lock. Locks on
/// different resources never conflict for this purpose.
pub fn locks_conflict(waiting: &Lock, held: &Lock) -> bool {
    match (waiting.resource_key(), held.resource_key()) {
        (Some(w), Some(h)) if w == h => !modes_compatible(waiting.lock_mode, held.lock_mode),
        _ => false,
    }
}

/// Export the matrix for the visualization payload and the reference CLI
pub fn export_matrix() -> CompatibilityMatrix {
    CompatibilityMatrix {
        modes: LockMode::KNOWN.iter().map(|m| m.as_token().to_string()).collect(),
        compatible: COMPATIBLE.iter().map(|row| row.to_vec()).collect(),
    }
}
