//! Integration test suite for depgen
//!
//! End-to-end tests that run the `depgen` binary against temporary projects
//! and drive the library pipeline through the public API.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: exit codes, output formats and configuration errors of the binary
//! - **pipeline**: multi-product projects through the public library API

mod cli;
mod pipeline;
