//! Profile repository core implementation

use crate::Result;
use crate::allocator::ProfileIdAllocator;
use crate::collaborators::{
    BlogConfigurationRepository, OptionConfigurationRepository, OptionProvider, TenancyCheck,
};
use crate::config::ProfileRepositoryConfig;
use crate::error::{FailedStep, ProfileRepositoryError};
use crate::keys::{KeyDeriver, ProfileId, PropertyKind, PropertyMapping};
use crate::store::{BackingStore, BatchOp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A profile's identity as stored in the backing store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Numeric id
    pub id: ProfileId,
    /// Display name
    pub name: String,
    /// Free-form description, empty when unset
    pub description: String,
}

/// Id and name of a profile, as listed in the administration screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    /// Numeric id
    pub profile_id: ProfileId,
    /// Display name
    pub profile_name: String,
}

/// Submitted value of one option in a bulk update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionInput {
    /// Raw value to store
    pub option_value: String,
}

impl OptionInput {
    /// Wrap a value
    pub fn new(option_value: impl Into<String>) -> Self {
        Self {
            option_value: option_value.into(),
        }
    }
}

/// Outcome of [`ProfileRepository::insert_default_profile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultProfile {
    /// The default profile was created under this id
    Created(ProfileId),
    /// A profile already holds the default id; nothing was written
    AlreadyExists,
}

/// Repositories and checks the profile repository delegates to
#[derive(Clone)]
pub struct Collaborators {
    /// Per-profile option values and permissions
    pub options: Arc<dyn OptionConfigurationRepository + Send + Sync>,
    /// Blog to profile associations
    pub blogs: Arc<dyn BlogConfigurationRepository + Send + Sync>,
    /// Catalogue of persisted options
    pub option_provider: Arc<dyn OptionProvider + Send + Sync>,
    /// Multi-tenancy predicate
    pub tenancy: Arc<dyn TenancyCheck + Send + Sync>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Creates, updates and deletes profiles in a key-value backing store
///
/// Nothing is cached: every call reads or writes through the store.
/// Multi-key operations are not atomic. A failure part-way through
/// `insert`, `update_profile_data` or `delete` leaves the writes made so
/// far in place.
#[derive(Debug)]
pub struct ProfileRepository<S> {
    config: ProfileRepositoryConfig,
    keys: KeyDeriver,
    store: S,
    collaborators: Collaborators,
}

impl<S: BackingStore> ProfileRepository<S> {
    /// Create a repository with the default property mapping
    ///
    /// # Errors
    ///
    /// Returns [`ProfileRepositoryError::Config`] for an invalid configuration.
    pub fn new(
        config: ProfileRepositoryConfig,
        store: S,
        collaborators: Collaborators,
    ) -> Result<Self> {
        Self::with_mapping(config, PropertyMapping::default(), store, collaborators)
    }

    /// Create a repository with a custom property mapping
    ///
    /// # Errors
    ///
    /// Returns [`ProfileRepositoryError::Config`] for an invalid configuration.
    pub fn with_mapping(
        config: ProfileRepositoryConfig,
        mapping: PropertyMapping,
        store: S,
        collaborators: Collaborators,
    ) -> Result<Self> {
        config.validate()?;
        let keys = KeyDeriver::new(config.namespace_prefix.clone(), mapping);

        Ok(Self {
            config,
            keys,
            store,
            collaborators,
        })
    }

    /// Ids of all profiles, ascending
    ///
    /// Empty outside multi-tenant mode.
    pub fn list_all_ids(&self) -> Result<Vec<ProfileId>> {
        if !self.collaborators.tenancy.is_multi_tenant() {
            debug!("Not a multi-tenant installation, no profiles to list");
            return Ok(Vec::new());
        }

        let prefix = self.keys.name_prefix();
        let matched = self
            .store
            .list_keys_by_prefix(&prefix)
            .map_err(|e| ProfileRepositoryError::read_failed(prefix.as_str(), e))?;

        let mut ids: Vec<ProfileId> = matched
            .iter()
            .filter_map(|key| {
                let id = self.keys.parse_name_key(key);
                if id.is_none() {
                    warn!(key = %key, "Skipping key without a valid profile id");
                }
                id
            })
            .collect();
        ids.sort_unstable();

        debug!(count = ids.len(), "Listed profile ids");
        Ok(ids)
    }

    /// Id and name of all profiles
    pub fn list_all(&self) -> Result<Vec<ProfileSummary>> {
        self.list_all_ids()?
            .into_iter()
            .map(|profile_id| -> Result<ProfileSummary> {
                Ok(ProfileSummary {
                    profile_id,
                    profile_name: self.find_name(profile_id, None)?,
                })
            })
            .collect()
    }

    /// Name of a profile
    ///
    /// Falls back to `fallback`, or to the configured new-profile name, when
    /// no name is stored.
    pub fn find_name(&self, profile_id: ProfileId, fallback: Option<&str>) -> Result<String> {
        let fallback = fallback.unwrap_or(self.config.new_profile_name.as_str());
        self.read_or(profile_id, &PropertyKind::Name, fallback)
    }

    /// Description of a profile, empty when none is stored
    pub fn find_description(&self, profile_id: ProfileId) -> Result<String> {
        self.read_or(profile_id, &PropertyKind::Description, "")
    }

    /// Name and description of a profile, `None` if it does not exist
    pub fn find(&self, profile_id: ProfileId) -> Result<Option<Profile>> {
        let Some(name) = self.read(profile_id, &PropertyKind::Name)? else {
            return Ok(None);
        };

        Ok(Some(Profile {
            id: profile_id,
            name,
            description: self.find_description(profile_id)?,
        }))
    }

    /// Whether a name is stored for `profile_id`
    pub fn exists(&self, profile_id: ProfileId) -> Result<bool> {
        Ok(self.read(profile_id, &PropertyKind::Name)?.is_some())
    }

    /// Rename a profile
    pub fn update_name(&self, profile_id: ProfileId, name: &str) -> Result<()> {
        self.write(profile_id, &PropertyKind::Name, name)
    }

    /// Change the description of a profile
    pub fn update_description(&self, profile_id: ProfileId, description: &str) -> Result<()> {
        self.write(profile_id, &PropertyKind::Description, description)
    }

    /// Create a profile under the lowest free id
    pub fn insert(&self, name: &str, description: &str) -> Result<ProfileId> {
        let profile_id = self.allocator().find_free_id()?;
        self.write_identity(profile_id, name, description)?;

        info!(profile_id = %profile_id, name = %name, "Profile created");
        Ok(profile_id)
    }

    /// Create a profile under the lowest free id from submitted option data
    ///
    /// Only mapped properties are stored; see
    /// [`ProfileRepository::update_profile_data`].
    pub fn insert_profile_data(&self, data: &BTreeMap<String, OptionInput>) -> Result<ProfileId> {
        let profile_id = self.allocator().find_free_id()?;
        self.update_profile_data(data, profile_id)?;

        info!(
            profile_id = %profile_id,
            properties = data.len(),
            "Profile created from option data"
        );
        Ok(profile_id)
    }

    /// Create the installation's default profile under the first id
    ///
    /// Returns [`DefaultProfile::AlreadyExists`] without writing anything if
    /// that id is taken.
    pub fn insert_default_profile(&self) -> Result<DefaultProfile> {
        if self.exists(ProfileId::FIRST)? {
            debug!("Default profile already installed");
            return Ok(DefaultProfile::AlreadyExists);
        }

        let profile_id = self.insert(
            &self.config.default_profile_name,
            &self.config.default_profile_description,
        )?;
        info!(profile_id = %profile_id, "Default profile installed");
        Ok(DefaultProfile::Created(profile_id))
    }

    /// Store submitted option values for a profile
    ///
    /// Properties missing from the mapping table are skipped. For every
    /// mapped property the binding's permission effect, if any, is persisted
    /// before the value is written.
    pub fn update_profile_data(
        &self,
        data: &BTreeMap<String, OptionInput>,
        profile_id: ProfileId,
    ) -> Result<()> {
        for (property, input) in data {
            let Some((key, binding)) = self.keys.derive_key_for_property(property, profile_id)
            else {
                debug!(property = %property, "Skipping unmapped property");
                continue;
            };

            if let Some(effect) = &binding.permission_effect {
                self.collaborators
                    .options
                    .persist_sanitized_permission(
                        profile_id,
                        &effect.option_name,
                        effect.disposition,
                    )
                    .map_err(|e| {
                        ProfileRepositoryError::collaborator("persist_sanitized_permission", e)
                    })?;
            }

            self.store
                .set(key.as_str(), &input.option_value)
                .map_err(|e| ProfileRepositoryError::write_failed(key.as_str(), e))?;
            debug!(
                profile_id = %profile_id,
                property = %property,
                key = %key,
                "Stored profile property"
            );
        }

        Ok(())
    }

    /// Delete a profile and everything stored for it
    ///
    /// Removes the name and description, the value and permission of every
    /// non-transient option, and all blog associations. Every step is
    /// attempted even if an earlier one failed; nothing is rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileRepositoryError::CascadeIncomplete`] listing the steps
    /// that failed. A failed identity batch is recorded as
    /// [`ProfileRepositoryError::StorageWriteFailed`], a failed collaborator
    /// call as [`ProfileRepositoryError::Collaborator`].
    pub fn delete(&self, profile_id: ProfileId) -> Result<()> {
        info!(profile_id = %profile_id, "Deleting profile");

        let mut failed_steps = Vec::new();
        let mut record = |step: String, error: ProfileRepositoryError| {
            warn!(
                profile_id = %profile_id,
                step = %step,
                error = %error,
                "Profile deletion step failed"
            );
            failed_steps.push(FailedStep::new(step, error));
        };

        let name_key = self.keys.derive_key(profile_id, &PropertyKind::Name);
        let identity = [
            BatchOp::delete(name_key.clone()),
            BatchOp::delete(self.keys.derive_key(profile_id, &PropertyKind::Description)),
        ];
        if let Err(e) = self.store.apply_batch(&identity) {
            record(
                "delete name and description".to_string(),
                ProfileRepositoryError::write_failed(name_key, e),
            );
        }

        let options = self.collaborators.options.as_ref();
        for option_name in self.collaborators.option_provider.non_transient().keys() {
            if let Err(e) = options.delete_value(profile_id, option_name) {
                record(
                    format!("delete value of {option_name}"),
                    ProfileRepositoryError::collaborator("delete_value", e),
                );
            }
            if let Err(e) = options.delete_permission(profile_id, option_name) {
                record(
                    format!("delete permission of {option_name}"),
                    ProfileRepositoryError::collaborator("delete_permission", e),
                );
            }
        }

        if let Err(e) = self
            .collaborators
            .blogs
            .delete_profile_associations(profile_id)
        {
            record(
                "delete blog associations".to_string(),
                ProfileRepositoryError::collaborator("delete_profile_associations", e),
            );
        }

        if !failed_steps.is_empty() {
            return Err(ProfileRepositoryError::CascadeIncomplete {
                profile_id,
                failed_steps,
            });
        }

        info!(profile_id = %profile_id, "Profile deleted successfully");
        Ok(())
    }

    /// The repository configuration
    pub fn config(&self) -> &ProfileRepositoryConfig {
        &self.config
    }

    /// The key deriver used for every read and write
    pub fn keys(&self) -> &KeyDeriver {
        &self.keys
    }

    /// The backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    fn allocator(&self) -> ProfileIdAllocator<'_, S> {
        ProfileIdAllocator::new(&self.keys, &self.store)
    }

    fn write_identity(&self, profile_id: ProfileId, name: &str, description: &str) -> Result<()> {
        let name_key = self.keys.derive_key(profile_id, &PropertyKind::Name);
        let ops = [
            BatchOp::set(name_key.clone(), name),
            BatchOp::set(
                self.keys.derive_key(profile_id, &PropertyKind::Description),
                description,
            ),
        ];

        self.store
            .apply_batch(&ops)
            .map_err(|e| ProfileRepositoryError::write_failed(name_key, e))
    }

    fn read(&self, profile_id: ProfileId, kind: &PropertyKind) -> Result<Option<String>> {
        let key = self.keys.derive_key(profile_id, kind);
        self.store
            .get(key.as_str())
            .map_err(|e| ProfileRepositoryError::read_failed(key, e))
    }

    fn read_or(&self, profile_id: ProfileId, kind: &PropertyKind, default: &str) -> Result<String> {
        let key = self.keys.derive_key(profile_id, kind);
        self.store
            .get_or(key.as_str(), default)
            .map_err(|e| ProfileRepositoryError::read_failed(key, e))
    }

    fn write(&self, profile_id: ProfileId, kind: &PropertyKind, value: &str) -> Result<()> {
        let key = self.keys.derive_key(profile_id, kind);
        self.store
            .set(key.as_str(), value)
            .map_err(|e| ProfileRepositoryError::write_failed(key.as_str(), e))?;
        debug!(profile_id = %profile_id, key = %key, "Stored profile property");
        Ok(())
    }
}
