//! Set diffing between local and remote state
//!
//! Pure functions, no side effects. Both diffs are plain set subtraction:
//! creation is detected, deletion and in-place modification are not.

use super::newtypes::PathSet;

/// `a − b`: every path in `a` that is not in `b`
#[must_use]
pub fn difference(a: &PathSet, b: &PathSet) -> PathSet {
    a.difference(b).cloned().collect()
}

/// Files that appeared on disk since the previous snapshot
#[must_use]
pub fn newly_seen(current: &PathSet, previous: &PathSet) -> PathSet {
    difference(current, previous)
}

/// Of the newly seen files, those not yet present on the remote
#[must_use]
pub fn missing_remotely(newly_seen: &PathSet, remote: &PathSet) -> PathSet {
    difference(newly_seen, remote)
}

/// Of the newly seen files, those already present on the remote
#[must_use]
pub fn present_remotely(newly_seen: &PathSet, remote: &PathSet) -> PathSet {
    newly_seen.intersection(remote).cloned().collect()
}
