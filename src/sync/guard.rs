// SPDX-License-Identifier: MPL-2.0

//! Supersession tokens for in-flight fetches.
//!
//! Initial fetches are not cancellable mid-flight; a caller that moved on
//! (component unmounted, user switched feeds) must instead discard the
//! resolved value. Each entry point takes a ticket from the guard and
//! checks it is still current before applying the result.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Issues tickets; starting a new request supersedes all earlier tickets.
#[derive(Clone, Default)]
pub struct RequestGuard {
    generation: Arc<AtomicU64>,
}

/// Proof of which request generation a result belongs to.
pub struct RequestTicket {
    generation: Arc<AtomicU64>,
    issued: u64,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new request, superseding every outstanding ticket.
    pub fn begin(&self) -> RequestTicket {
        let issued = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        RequestTicket {
            generation: Arc::clone(&self.generation),
            issued,
        }
    }

    /// Invalidate all outstanding tickets without starting a new request
    /// (e.g. on unmount/logout).
    pub fn cancel_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl RequestTicket {
    /// Whether the result belonging to this ticket should still be applied.
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.issued
    }
}
