//! Bridge for driving async futures from synchronous call sites.
//!
//! The engine's dispatch loop is synchronous; only the HTTP fetch adapter
//! needs to await anything. This module gives it a single entry point that
//! works both inside and outside an existing Tokio runtime.

use std::future::Future;

use anyhow::{Context, Result};
use tokio::runtime::Handle;

/// Run `future` to completion from synchronous code.
///
/// Inside an existing multi-threaded Tokio runtime the current worker is
/// released with `block_in_place`; otherwise a throwaway current-thread
/// runtime drives the future.
///
/// # Errors
///
/// Fails when no runtime exists and one cannot be built, or with whatever
/// error the future itself resolves to.
pub fn block_on<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match Handle::try_current() {
        Ok(handle) => tokio::task::block_in_place(|| handle.block_on(future)),
        Err(_) => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("build blocking runtime")?
            .block_on(future),
    }
}
