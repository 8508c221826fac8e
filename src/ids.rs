// SPDX-License-Identifier: MPL-2.0

//! Composite identifier codec.
//!
//! Every record in the cache is keyed by a composite ID of the form
//! `<owner>:<local>`: an owner public key joined to a record-local
//! identifier. The local part may itself contain colons (URIs do), so
//! decoding always splits on the first colon only.

use thiserror::Error;

/// Separator between the owner and local segments of a composite ID.
pub const SEPARATOR: char = ':';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedIdError {
    #[error("composite id has no separator: {0:?}")]
    MissingSeparator(String),
    #[error("composite id has an empty segment: {0:?}")]
    EmptySegment(String),
}

/// Join an owner ID and a local ID into a composite ID.
///
/// Owner IDs are validated upstream to be colon-free, which is what makes
/// the round trip through [`decode`] unambiguous.
pub fn encode(owner_id: &str, local_id: &str) -> String {
    format!("{owner_id}{SEPARATOR}{local_id}")
}

/// Split a composite ID into `(owner, local)`.
///
/// Splits on the first colon only; both segments must be non-empty.
pub fn decode(composite: &str) -> Result<(&str, &str), MalformedIdError> {
    let (owner, local) = composite
        .split_once(SEPARATOR)
        .ok_or_else(|| MalformedIdError::MissingSeparator(composite.to_string()))?;

    if owner.is_empty() || local.is_empty() {
        return Err(MalformedIdError::EmptySegment(composite.to_string()));
    }

    Ok((owner, local))
}

/// Fail-open variant of [`decode`] for UI-facing filters that must never
/// hide content over a parse bug.
pub fn decode_safe(composite: &str) -> Option<(&str, &str)> {
    decode(composite).ok()
}
