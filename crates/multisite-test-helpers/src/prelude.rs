//! Convenience re-exports for common test utilities.
//!
//! ```rust,ignore
//! use multisite_test_helpers::prelude::*;
//! ```

pub use crate::must::{must, must_err, must_some, must_with};

pub use crate::mock::{
    FailingStore, MockCollaborators, OptionCall, RecordingBlogRepository,
    RecordingOptionRepository, StaticOptionProvider, profile_id,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
