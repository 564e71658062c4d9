//! Profile storage for multi-tenant site group configuration
//!
//! A profile is a named, numerically identified bundle of settings shared by
//! the blogs of a site group. This crate keeps profile identities in a
//! key-value backing store and coordinates the repositories that hold a
//! profile's option values, option permissions and blog associations.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`keys`]: Storage key derivation and the property mapping table
//! - [`store`]: The `BackingStore` trait and an in-memory store
//! - [`storage`]: JSON file backed store with atomic writes
//! - [`allocator`]: Lowest-free profile id allocation
//! - [`repository`]: Core `ProfileRepository` struct and operations
//! - [`collaborators`]: Interfaces of the repositories a profile delegates to
//! - [`config`]: Repository configuration
//! - [`error`]: Error types for repository operations
//!
//! # Error Recovery
//!
//! No operation is transactional:
//! - Missing keys resolve to defaults and are never reported as errors
//! - Identity keys are written and removed through `BackingStore::apply_batch`,
//!   which stores like [`FileStorage`] commit with a single atomic write
//! - A cascading delete attempts every step and reports the ones that failed
//!
//! # Example
//!
//! ```ignore
//! use multisite_profile_repository::prelude::*;
//!
//! # fn example(collaborators: Collaborators) -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileStorage::open("site-options.json")?;
//! let repo = ProfileRepository::new(ProfileRepositoryConfig::default(), store, collaborators)?;
//!
//! repo.insert_default_profile()?;
//! let id = repo.insert("Sales", "Settings for the sales blogs")?;
//! for profile in repo.list_all()? {
//!     println!("{}: {}", profile.profile_id, profile.profile_name);
//! }
//! repo.delete(id)?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod allocator;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod keys;
pub mod prelude;
pub mod repository;
pub mod storage;
pub mod store;

pub use allocator::ProfileIdAllocator;
pub use config::ProfileRepositoryConfig;
pub use error::{
    CollaboratorError, FailedStep, MappingError, ProfileRepositoryError, StorageError,
};
pub use keys::{KeyDeriver, ProfileId, PropertyKind, PropertyMapping, StorageKey};
pub use repository::{Collaborators, DefaultProfile, ProfileRepository};
pub use storage::FileStorage;
pub use store::{BackingStore, MemoryStore};

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, ProfileRepositoryError>;
