//! Interfaces of the repositories a profile repository delegates to
//!
//! Option values, option permissions and blog associations are owned by
//! other components. The profile repository only refers to them by profile
//! id, to seed a permission on bulk updates and to clean up on delete.

use crate::error::CollaboratorError;
use crate::keys::ProfileId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who may override an option within a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDisposition {
    /// Nobody may change the option
    DisabledForSuperAdmin,
    /// Only network-level administrators may change the option
    DisabledForBlogAdmin,
    /// Blog administrators may override the option
    Everyone,
}

/// Description of a configurable option
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionMetadata {
    /// Human readable title
    pub title: Option<String>,
    /// Value used when nothing is stored
    pub default_value: Option<String>,
}

/// Per-profile option values and permissions
pub trait OptionConfigurationRepository {
    /// Remove the stored value of `option_name` for a profile
    fn delete_value(
        &self,
        profile_id: ProfileId,
        option_name: &str,
    ) -> Result<(), CollaboratorError>;

    /// Remove the stored permission of `option_name` for a profile
    fn delete_permission(
        &self,
        profile_id: ProfileId,
        option_name: &str,
    ) -> Result<(), CollaboratorError>;

    /// Sanitize and persist the permission of `option_name` for a profile
    fn persist_sanitized_permission(
        &self,
        profile_id: ProfileId,
        option_name: &str,
        disposition: PermissionDisposition,
    ) -> Result<(), CollaboratorError>;
}

/// Associations between blogs and profiles
pub trait BlogConfigurationRepository {
    /// Detach every blog from the profile
    fn delete_profile_associations(&self, profile_id: ProfileId) -> Result<(), CollaboratorError>;
}

/// Catalogue of configurable options
pub trait OptionProvider {
    /// Options that are persisted per profile
    fn non_transient(&self) -> BTreeMap<String, OptionMetadata>;
}

/// Whether the installation runs as a multi-tenant site group
pub trait TenancyCheck {
    /// `true` in multi-tenant mode
    fn is_multi_tenant(&self) -> bool;
}

impl TenancyCheck for bool {
    fn is_multi_tenant(&self) -> bool {
        *self
    }
}
