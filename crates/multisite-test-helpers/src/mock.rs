//! Mock implementations for testing.
//!
//! This module provides recording implementations of the collaborator
//! traits a profile repository delegates to, and a store that can be told
//! to fail.

use multisite_profile_repository::collaborators::{
    BlogConfigurationRepository, OptionConfigurationRepository, OptionMetadata, OptionProvider,
    PermissionDisposition,
};
use multisite_profile_repository::store::{BackingStore, BatchOp, MemoryStore};
use multisite_profile_repository::{CollaboratorError, Collaborators, ProfileId, StorageError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Build a profile id, panicking on zero.
///
/// # Panics
///
/// Panics if `value` is zero.
#[track_caller]
pub fn profile_id(value: u32) -> ProfileId {
    match ProfileId::new(value) {
        Some(id) => id,
        None => panic!("profile_id: {value} is not a valid profile id"),
    }
}

/// A call received by [`RecordingOptionRepository`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionCall {
    DeleteValue {
        profile_id: ProfileId,
        option_name: String,
    },
    DeletePermission {
        profile_id: ProfileId,
        option_name: String,
    },
    PersistSanitizedPermission {
        profile_id: ProfileId,
        option_name: String,
        disposition: PermissionDisposition,
    },
}

impl OptionCall {
    pub fn option_name(&self) -> &str {
        match self {
            Self::DeleteValue { option_name, .. }
            | Self::DeletePermission { option_name, .. }
            | Self::PersistSanitizedPermission { option_name, .. } => option_name,
        }
    }
}

/// Option repository that records every call
#[derive(Debug, Default)]
pub struct RecordingOptionRepository {
    calls: Mutex<Vec<OptionCall>>,
    failing_options: Mutex<Vec<String>>,
}

impl RecordingOptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call concerning `option_name` (the call is still recorded)
    pub fn fail_option(&self, option_name: impl Into<String>) {
        self.failing_options.lock().push(option_name.into());
    }

    pub fn calls(&self) -> Vec<OptionCall> {
        self.calls.lock().clone()
    }

    pub fn persisted_permissions(&self) -> Vec<OptionCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, OptionCall::PersistSanitizedPermission { .. }))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: OptionCall) -> Result<(), CollaboratorError> {
        let fails = self
            .failing_options
            .lock()
            .iter()
            .any(|name| name == call.option_name());
        let option_name = call.option_name().to_string();
        self.calls.lock().push(call);

        if fails {
            return Err(CollaboratorError::new(format!(
                "mock failure for option {option_name}"
            )));
        }
        Ok(())
    }
}

impl OptionConfigurationRepository for RecordingOptionRepository {
    fn delete_value(
        &self,
        profile_id: ProfileId,
        option_name: &str,
    ) -> Result<(), CollaboratorError> {
        self.record(OptionCall::DeleteValue {
            profile_id,
            option_name: option_name.to_string(),
        })
    }

    fn delete_permission(
        &self,
        profile_id: ProfileId,
        option_name: &str,
    ) -> Result<(), CollaboratorError> {
        self.record(OptionCall::DeletePermission {
            profile_id,
            option_name: option_name.to_string(),
        })
    }

    fn persist_sanitized_permission(
        &self,
        profile_id: ProfileId,
        option_name: &str,
        disposition: PermissionDisposition,
    ) -> Result<(), CollaboratorError> {
        self.record(OptionCall::PersistSanitizedPermission {
            profile_id,
            option_name: option_name.to_string(),
            disposition,
        })
    }
}

/// Blog association repository that records deleted profile ids
#[derive(Debug, Default)]
pub struct RecordingBlogRepository {
    deleted: Mutex<Vec<ProfileId>>,
    fail_on_delete: bool,
}

impl RecordingBlogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure() -> Self {
        Self {
            fail_on_delete: true,
            ..Self::new()
        }
    }

    pub fn deleted(&self) -> Vec<ProfileId> {
        self.deleted.lock().clone()
    }
}

impl BlogConfigurationRepository for RecordingBlogRepository {
    fn delete_profile_associations(&self, profile_id: ProfileId) -> Result<(), CollaboratorError> {
        self.deleted.lock().push(profile_id);
        if self.fail_on_delete {
            return Err(CollaboratorError::new("mock association failure"));
        }
        Ok(())
    }
}

/// Option provider with a fixed list of non-transient options
#[derive(Debug, Clone, Default)]
pub struct StaticOptionProvider {
    options: BTreeMap<String, OptionMetadata>,
}

impl StaticOptionProvider {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: names
                .into_iter()
                .map(|name| (name.into(), OptionMetadata::default()))
                .collect(),
        }
    }
}

impl OptionProvider for StaticOptionProvider {
    fn non_transient(&self) -> BTreeMap<String, OptionMetadata> {
        self.options.clone()
    }
}

/// Memory store whose writes can be switched to fail
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("mock write failure".to_string()));
        }
        Ok(())
    }
}

impl BackingStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.check_writable()?;
        self.inner.delete(key)
    }

    fn list_keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner.list_keys_by_prefix(prefix)
    }

    fn apply_batch(&self, ops: &[BatchOp]) -> Result<(), StorageError> {
        self.check_writable()?;
        self.inner.apply_batch(ops)
    }
}

/// Every mock collaborator, shared with the repository under test
#[derive(Debug, Clone)]
pub struct MockCollaborators {
    pub options: Arc<RecordingOptionRepository>,
    pub blogs: Arc<RecordingBlogRepository>,
    pub option_provider: Arc<StaticOptionProvider>,
    pub multi_tenant: bool,
}

impl MockCollaborators {
    /// Multi-tenant mocks with the given non-transient options
    pub fn new<I, S>(option_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: Arc::new(RecordingOptionRepository::new()),
            blogs: Arc::new(RecordingBlogRepository::new()),
            option_provider: Arc::new(StaticOptionProvider::new(option_names)),
            multi_tenant: true,
        }
    }

    pub fn single_tenant(mut self) -> Self {
        self.multi_tenant = false;
        self
    }

    pub fn with_failing_blogs(mut self) -> Self {
        self.blogs = Arc::new(RecordingBlogRepository::with_failure());
        self
    }

    /// Collaborators handle to pass to the repository
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            options: self.options.clone(),
            blogs: self.blogs.clone(),
            option_provider: self.option_provider.clone(),
            tenancy: Arc::new(self.multi_tenant),
        }
    }
}

impl Default for MockCollaborators {
    fn default() -> Self {
        Self::new(["domain_controllers", "port", "sync_to_ad"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::must::{must, must_err};

    #[test]
    fn test_recording_option_repository() {
        let repo = RecordingOptionRepository::new();
        must(repo.delete_value(profile_id(1), "port"));
        must(repo.persist_sanitized_permission(
            profile_id(1),
            "profile_name",
            PermissionDisposition::DisabledForBlogAdmin,
        ));

        assert_eq!(repo.calls().len(), 2);
        assert_eq!(repo.persisted_permissions().len(), 1);

        repo.clear();
        assert!(repo.calls().is_empty());
    }

    #[test]
    fn test_failing_option_is_recorded() {
        let repo = RecordingOptionRepository::new();
        repo.fail_option("port");

        let _ = must_err(repo.delete_value(profile_id(2), "port"));
        must(repo.delete_value(profile_id(2), "other"));
        assert_eq!(repo.calls().len(), 2);
    }

    #[test]
    fn test_failing_store_switch() {
        let store = FailingStore::new();
        must(store.set("k", "v"));

        store.set_fail_writes(true);
        let _ = must_err(store.set("k", "w"));
        let _ = must_err(store.delete("k"));
        assert_eq!(must(store.get("k")), Some("v".to_string()));

        store.set_fail_writes(false);
        assert!(must(store.delete("k")));
    }
}
