//! Profile id allocation
//!
//! There is no counter: the lowest id without a name key is free. The probe
//! and the caller's subsequent write are two separate store calls, so two
//! concurrent allocations can observe the same free id. Profiles are managed
//! by a single administrator at a time and the store offers no
//! test-and-set, so the window is left open.

use crate::error::ProfileRepositoryError;
use crate::keys::{KeyDeriver, ProfileId, PropertyKind};
use crate::store::BackingStore;
use tracing::debug;

/// Finds the lowest unused profile id
#[derive(Debug)]
pub struct ProfileIdAllocator<'a, S: ?Sized> {
    keys: &'a KeyDeriver,
    store: &'a S,
}

impl<'a, S: BackingStore + ?Sized> ProfileIdAllocator<'a, S> {
    /// Create an allocator probing `store` through `keys`
    pub fn new(keys: &'a KeyDeriver, store: &'a S) -> Self {
        Self { keys, store }
    }

    /// Scan upwards from 1 for the first id without a name key
    ///
    /// # Errors
    ///
    /// Fails if a probe cannot be read, or with
    /// [`ProfileRepositoryError::IdSpaceExhausted`] if every id is taken.
    pub fn find_free_id(&self) -> Result<ProfileId, ProfileRepositoryError> {
        let mut candidate = ProfileId::FIRST;
        loop {
            let key = self.keys.derive_key(candidate, &PropertyKind::Name);
            let taken = self
                .store
                .get(key.as_str())
                .map_err(|e| ProfileRepositoryError::read_failed(key.as_str(), e))?
                .is_some();

            if !taken {
                debug!(profile_id = %candidate, "Found free profile id");
                return Ok(candidate);
            }

            candidate = candidate
                .next()
                .ok_or(ProfileRepositoryError::IdSpaceExhausted)?;
        }
    }
}
