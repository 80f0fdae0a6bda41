//! Storage contracts and built-in credential-store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, CredentialSet},
};

/// Durable key/value persistence for credential blobs.
///
/// Operations are synchronous by contract; backends that would block should
/// front their own cache. Failures are caught and surfaced, never swallowed.
/// Only the coordinators mutate credentials through this trait.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the value stored under `key`, if present.
	fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError>;

	/// Persists or replaces the value stored under `key`.
	fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError>;

	/// Removes the value stored under `key`, if present.
	fn remove(&self, key: CredentialKey) -> Result<(), StoreError>;

	/// Loads the full credential pair; `None` unless both tokens are present.
	fn load_credentials(&self) -> Result<Option<CredentialSet>, StoreError> {
		let access = self.get(CredentialKey::AccessToken)?;
		let refresh = self.get(CredentialKey::RefreshToken)?;

		Ok(match (access, refresh) {
			(Some(access), Some(refresh)) => Some(CredentialSet::new(access, refresh)),
			_ => None,
		})
	}

	/// Persists both tokens of a freshly-issued credential pair.
	fn store_credentials(&self, credentials: &CredentialSet) -> Result<(), StoreError> {
		self.set(CredentialKey::AccessToken, credentials.access_token.expose())?;
		self.set(CredentialKey::RefreshToken, credentials.refresh_token.expose())
	}

	/// Replaces the access token in place after a successful refresh.
	fn store_access_token(&self, token: &str) -> Result<(), StoreError> {
		self.set(CredentialKey::AccessToken, token)
	}

	/// Destroys both tokens together (refresh failure or explicit logout).
	fn clear_credentials(&self) -> Result<(), StoreError> {
		self.remove(CredentialKey::AccessToken)?;
		self.remove(CredentialKey::RefreshToken)
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
