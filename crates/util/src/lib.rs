//! Shared helpers for the trawl workspace.
//!
//! Kept deliberately small: the engine and CLI pull individual functions
//! from here rather than linking a grab-bag of utilities.

pub mod async_runtime;
pub mod kv;

pub use async_runtime::block_on;
pub use kv::parse_key_value;
