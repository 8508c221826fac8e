// SPDX-License-Identifier: MPL-2.0

//! Background task spawner for fire-and-forget work.
//!
//! Background refreshes must never run on the caller's promise chain. When
//! the caller already lives inside a Tokio runtime (tests, the app shell)
//! tasks are spawned there; otherwise a small shared runtime is used.

use once_cell::sync::Lazy;
use std::future::Future;
use tokio::runtime::{Handle, Runtime};

/// Fallback runtime for callers outside any Tokio context.
/// Two worker threads are plenty for I/O-bound refresh work.
static RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("slipway-background")
        .build()
        .expect("failed to create background runtime")
});

/// Spawn a future without blocking the caller.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => handle.spawn(future),
        Err(_) => RUNTIME.spawn(future),
    }
}

/// Execute a future on the shared runtime, blocking until completion.
/// Use this from synchronous code that needs to call async functions.
#[allow(dead_code)]
pub fn block_on<F: Future>(future: F) -> F::Output {
    RUNTIME.block_on(future)
}
