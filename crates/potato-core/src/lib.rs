//! Foundational low-level utilities shared across Potato manager crates.
//!
//! Provides the atomic file-replacement helper used by the active
//! configuration store and the clock helpers used for activation receipts
//! and temp-file names.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::write_bytes_atomic;
pub use time_utils::{current_unix_timestamp_ms, current_unix_timestamp_nanos};
