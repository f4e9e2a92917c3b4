//! Descriptor (XML manifest) reading and rewriting.
//!
//! A narrow, regex-driven reader for the handful of elements the dependency
//! pipeline cares about, and a rewriter that regenerates the
//! `<dependencies>` block while leaving the rest of the file untouched.
//!
//! - [`parser`] - extracts dependencies, aliases, content modules and includes
//! - [`rewriter`] - replaces the dependency block from a desired name list

pub mod parser;
pub mod rewriter;

pub use parser::{
    ParsedDescriptor, has_skip_marker, looks_like_dependency_markup, parse_descriptor,
    root_element,
};
pub use rewriter::update_dependencies;
