//! Core types shared by every depgen subsystem.
//!
//! ## `error` - Error Handling
//!
//! - [`DepgenError`] - Enumerated failure modes, with [`DepgenError::is_fatal`]
//!   separating run-aborting errors from collected ones
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to the user-friendly format

pub mod error;

pub use error::{DepgenError, ErrorContext, user_friendly_error};

/// Result alias for pipeline internals that need a classified error.
pub type DepgenResult<T> = std::result::Result<T, DepgenError>;
