//! Storage key derivation
//!
//! Every value a profile owns lives under a key of the form
//! `<namespace>p_<tag><profile id>`, for example `next_ad_int_p_n_3` for the
//! name of profile 3. The name and description tags are reserved; every
//! other tag comes from the [`PropertyMapping`] table.
//!
//! Tags are lowercase ASCII letters terminated by a single `_`. Since they
//! never contain digits, the boundary between tag and id is unambiguous and
//! two distinct `(profile id, kind)` pairs can never produce the same key.

use crate::collaborators::PermissionDisposition;
use crate::error::MappingError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// Fixed tag separating profile keys from the rest of the namespace
pub const PROFILE_TAG: &str = "p_";

/// Tag of the profile name key
pub const NAME_TAG: &str = "n_";

/// Tag of the profile description key
pub const DESCRIPTION_TAG: &str = "d_";

/// Logical property name of the profile name option
pub const PROFILE_NAME_PROPERTY: &str = "profile_name";

/// Positive numeric profile identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(NonZeroU32);

impl ProfileId {
    /// The lowest profile id, also used by the default profile
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Create a profile id, `None` for zero
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    /// Raw numeric value
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// The following id, `None` once the id space is exhausted
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when parsing a [`ProfileId`] from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid profile id: '{0}'")]
pub struct ParseProfileIdError(String);

impl FromStr for ProfileId {
    type Err = ParseProfileIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Reject signs and leading zeros so the textual form round-trips.
        if s.is_empty() || s.starts_with('0') || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseProfileIdError(s.to_string()));
        }
        s.parse::<NonZeroU32>()
            .map(Self)
            .map_err(|_parse| ParseProfileIdError(s.to_string()))
    }
}

/// A fully derived backing store key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<StorageKey> for String {
    fn from(key: StorageKey) -> Self {
        key.0
    }
}

/// Which property of a profile a key addresses
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// The profile name
    Name,
    /// The profile description
    Description,
    /// A mapped property with its own tag
    Custom(String),
}

impl PropertyKind {
    /// Tag inserted into the storage key
    pub fn tag(&self) -> &str {
        match self {
            Self::Name => NAME_TAG,
            Self::Description => DESCRIPTION_TAG,
            Self::Custom(tag) => tag,
        }
    }
}

/// Permission written whenever a mapped property is updated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionEffect {
    /// Option whose permission is persisted
    pub option_name: String,
    /// Disposition stored for it
    pub disposition: PermissionDisposition,
}

impl PermissionEffect {
    /// Create a permission effect
    pub fn new(option_name: impl Into<String>, disposition: PermissionDisposition) -> Self {
        Self {
            option_name: option_name.into(),
            disposition,
        }
    }
}

/// Where a logical property is stored and what it triggers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyBinding {
    /// Storage kind of the property
    pub kind: PropertyKind,
    /// Permission side effect, if any
    pub permission_effect: Option<PermissionEffect>,
}

impl PropertyBinding {
    /// Bind to `kind` without a side effect
    pub fn new(kind: PropertyKind) -> Self {
        Self {
            kind,
            permission_effect: None,
        }
    }

    /// Attach a permission side effect
    pub fn with_permission_effect(mut self, effect: PermissionEffect) -> Self {
        self.permission_effect = Some(effect);
        self
    }
}

/// Table from logical property name to its binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMapping {
    bindings: HashMap<String, PropertyBinding>,
}

impl PropertyMapping {
    /// An empty table
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Register `property`, validating its tag against the table
    ///
    /// # Errors
    ///
    /// Rejects a property that is already mapped, a malformed or reserved
    /// custom tag, and a custom tag another property already uses.
    pub fn insert(
        &mut self,
        property: impl Into<String>,
        binding: PropertyBinding,
    ) -> Result<(), MappingError> {
        let property = property.into();
        if self.bindings.contains_key(&property) {
            return Err(MappingError::DuplicateProperty(property));
        }

        if let PropertyKind::Custom(tag) = &binding.kind {
            validate_tag(tag)?;
            if let Some((owner, _)) = self
                .bindings
                .iter()
                .find(|(_, existing)| existing.kind == binding.kind)
            {
                return Err(MappingError::DuplicateTag {
                    tag: tag.clone(),
                    property: owner.clone(),
                });
            }
        }

        self.bindings.insert(property, binding);
        Ok(())
    }

    /// Builder form of [`PropertyMapping::insert`]
    ///
    /// # Errors
    ///
    /// See [`PropertyMapping::insert`].
    pub fn with(
        mut self,
        property: impl Into<String>,
        binding: PropertyBinding,
    ) -> Result<Self, MappingError> {
        self.insert(property, binding)?;
        Ok(self)
    }

    /// Binding for `property`
    pub fn get(&self, property: &str) -> Option<&PropertyBinding> {
        self.bindings.get(property)
    }

    /// Number of mapped properties
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no property is mapped
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for PropertyMapping {
    /// The profile name option, which locks its own permission for blog admins
    fn default() -> Self {
        let mut bindings = HashMap::new();
        bindings.insert(
            PROFILE_NAME_PROPERTY.to_string(),
            PropertyBinding::new(PropertyKind::Name).with_permission_effect(PermissionEffect::new(
                PROFILE_NAME_PROPERTY,
                PermissionDisposition::DisabledForBlogAdmin,
            )),
        );
        Self { bindings }
    }
}

fn validate_tag(tag: &str) -> Result<(), MappingError> {
    if tag == NAME_TAG || tag == DESCRIPTION_TAG {
        return Err(MappingError::ReservedTag(tag.to_string()));
    }

    let well_formed = tag
        .strip_suffix('_')
        .is_some_and(|letters| {
            !letters.is_empty() && letters.bytes().all(|b| b.is_ascii_lowercase())
        });
    if !well_formed {
        return Err(MappingError::InvalidTag(tag.to_string()));
    }

    Ok(())
}

/// Derives backing store keys for profile properties
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    namespace: String,
    mapping: PropertyMapping,
}

impl KeyDeriver {
    /// Create a deriver for `namespace` using `mapping` for bulk updates
    pub fn new(namespace: impl Into<String>, mapping: PropertyMapping) -> Self {
        Self {
            namespace: namespace.into(),
            mapping,
        }
    }

    /// Key of `kind` for `profile_id`
    pub fn derive_key(&self, profile_id: ProfileId, kind: &PropertyKind) -> StorageKey {
        StorageKey(format!(
            "{}{PROFILE_TAG}{}{profile_id}",
            self.namespace,
            kind.tag()
        ))
    }

    /// Key and binding of a logical property, `None` if it is not mapped
    pub fn derive_key_for_property(
        &self,
        property: &str,
        profile_id: ProfileId,
    ) -> Option<(StorageKey, &PropertyBinding)> {
        let binding = self.mapping.get(property)?;
        Some((self.derive_key(profile_id, &binding.kind), binding))
    }

    /// Prefix shared by all name keys
    pub fn name_prefix(&self) -> String {
        format!("{}{PROFILE_TAG}{NAME_TAG}", self.namespace)
    }

    /// Recover the profile id from a name key
    pub fn parse_name_key(&self, key: &str) -> Option<ProfileId> {
        key.strip_prefix(&self.name_prefix())?.parse().ok()
    }
}
