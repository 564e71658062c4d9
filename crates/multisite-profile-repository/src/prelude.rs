//! Convenience re-exports for common types

pub use crate::allocator::ProfileIdAllocator;
pub use crate::collaborators::{
    BlogConfigurationRepository, OptionConfigurationRepository, OptionMetadata, OptionProvider,
    PermissionDisposition, TenancyCheck,
};
pub use crate::config::ProfileRepositoryConfig;
pub use crate::error::{
    CollaboratorError, FailedStep, MappingError, ProfileRepositoryError, StorageError,
};
pub use crate::keys::{
    KeyDeriver, PROFILE_NAME_PROPERTY, PermissionEffect, ProfileId, PropertyBinding, PropertyKind,
    PropertyMapping, StorageKey,
};
pub use crate::repository::{
    Collaborators, DefaultProfile, OptionInput, Profile, ProfileRepository, ProfileSummary,
};
pub use crate::storage::{FileStorage, StorageConfig};
pub use crate::store::{BackingStore, BatchOp, MemoryStore};
