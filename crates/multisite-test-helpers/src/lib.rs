//! Shared test utilities for the multisite profile workspace.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with good error messages and `#[track_caller]`
//! - [`mock`] - Recording collaborators and a switchable failing store
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! multisite-test-helpers = { path = "crates/multisite-test-helpers" }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod mock;
pub mod must;
pub mod prelude;

pub use must::*;
