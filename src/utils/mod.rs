//! Cross-cutting utilities.
//!
//! - [`fs`] - atomic writes and optional reads

pub mod fs;

pub use fs::{atomic_write, atomic_write_async, read_optional};
