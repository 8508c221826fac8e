// SPDX-License-Identifier: MPL-2.0

//! Cross-cutting mute filtering over composite-ID lists.
//!
//! Two variants with deliberately distinct contracts: [`filter_strict`] is
//! an invariant check at a layer boundary and errors on malformed IDs;
//! [`filter_safe`] serves UI paths that may see stale or cross-version
//! data and must never hide content over a parse bug, so a malformed ID is
//! kept (fail-open) and traced. Do not collapse the two.

use crate::ids::{self, MalformedIdError};
use std::collections::HashSet;
use tracing::debug;

/// Drop IDs whose owner is muted. Errors on the first malformed ID.
///
/// Use only where upstream code guarantees well-formed composite IDs
/// (e.g. straight out of the sync engine).
pub fn filter_strict(
    ids: &[String],
    muted: &HashSet<String>,
) -> Result<Vec<String>, MalformedIdError> {
    let mut kept = Vec::with_capacity(ids.len());
    for id in ids {
        let (owner, _) = ids::decode(id)?;
        if !muted.contains(owner) {
            kept.push(id.clone());
        }
    }
    Ok(kept)
}

/// Drop IDs whose owner is muted; malformed IDs are KEPT in the output.
pub fn filter_safe(ids: &[String], muted: &HashSet<String>) -> Vec<String> {
    ids.iter()
        .filter(|id| match ids::decode_safe(id.as_str()) {
            Some((owner, _)) => !muted.contains(owner),
            None => {
                debug!(id = %id, "keeping unparseable id in filtered list");
                true
            }
        })
        .cloned()
        .collect()
}

/// Single-item check with the same fail-open policy: an unparseable ID is
/// reported as not muted.
pub fn is_muted(id: &str, muted: &HashSet<String>) -> bool {
    match ids::decode_safe(id) {
        Some((owner, _)) => muted.contains(owner),
        None => {
            debug!(id = %id, "treating unparseable id as not muted");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_safe_fails_open() {
        let out = filter_safe(&list(&["a:1", "not-valid", "b:2"]), &set(&["a"]));
        // The malformed entry is kept, the muted owner's entry is dropped
        assert_eq!(out, list(&["not-valid", "b:2"]));
    }

    #[test]
    fn test_filter_strict_fails_closed() {
        assert!(filter_strict(&list(&["a:1", "not-valid"]), &set(&[])).is_err());
    }

    #[test]
    fn test_filter_strict_drops_muted() {
        let out = filter_strict(&list(&["a:1", "b:2", "a:3"]), &set(&["a"])).unwrap();
        assert_eq!(out, list(&["b:2"]));
    }

    #[test]
    fn test_filters_with_empty_mute_set_keep_everything() {
        let input = list(&["a:1", "b:2"]);
        assert_eq!(filter_strict(&input, &set(&[])).unwrap(), input);
        assert_eq!(filter_safe(&input, &set(&[])), input);
    }

    #[test]
    fn test_is_muted_fail_open() {
        let muted = set(&["a"]);
        assert!(is_muted("a:1", &muted));
        assert!(!is_muted("b:2", &muted));
        assert!(!is_muted("not-valid", &muted));
    }
}
