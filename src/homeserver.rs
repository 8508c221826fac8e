// SPDX-License-Identifier: MPL-2.0

//! Write-through collaborator for user-owned records.
//!
//! The homeserver is a key-value store addressed by URI, written to by an
//! external signing client. This layer only dispatches requests to it (the
//! notification watermark lives there so other devices observe the same
//! read state); it never implements storage or signing itself.

use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HomeserverError {
    #[error("homeserver write failed: {0}")]
    Write(String),
    #[error("not authenticated")]
    NotAuthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Put,
    Delete,
}

/// Minimal request surface of the homeserver client.
pub trait Homeserver: Send + Sync + 'static {
    fn request(
        &self,
        action: Action,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> impl Future<Output = Result<(), HomeserverError>> + Send;
}
