//! Thread-safe in-memory [`CredentialStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::CredentialKey,
	store::{CredentialStore, StoreError},
};

/// Thread-safe storage backend that keeps credentials in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<HashMap<CredentialKey, String>>>);
impl CredentialStore for MemoryStore {
	fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
		Ok(self.0.read().get(&key).cloned())
	}

	fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
		self.0.write().insert(key, value.to_owned());

		Ok(())
	}

	fn remove(&self, key: CredentialKey) -> Result<(), StoreError> {
		self.0.write().remove(&key);

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn set_get_remove_round_trip() {
		let store = MemoryStore::default();

		assert_eq!(
			store.get(CredentialKey::AccessToken).expect("Reads should succeed."),
			None
		);

		store
			.set(CredentialKey::AccessToken, "token-a")
			.expect("Writes should succeed.");

		assert_eq!(
			store.get(CredentialKey::AccessToken).expect("Reads should succeed."),
			Some("token-a".into())
		);

		store.remove(CredentialKey::AccessToken).expect("Removals should succeed.");

		assert_eq!(
			store.get(CredentialKey::AccessToken).expect("Reads should succeed."),
			None
		);
	}
}
