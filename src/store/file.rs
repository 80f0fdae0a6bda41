//! Simple file-backed [`CredentialStore`] for lightweight deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::CredentialKey,
	store::{CredentialStore, StoreError},
};

/// Persists credentials to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<CredentialKey, String>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { HashMap::new() };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<CredentialKey, String>, StoreError> {
		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let entries: Vec<(CredentialKey, String)> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(entries.into_iter().collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, contents: &HashMap<CredentialKey, String>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let snapshot: Vec<_> = contents.iter().collect();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CredentialStore for FileStore {
	fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
		Ok(self.inner.read().get(&key).cloned())
	}

	fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		guard.insert(key, value.to_owned());
		self.persist_locked(&guard)
	}

	fn remove(&self, key: CredentialKey) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		guard.remove(&key);
		self.persist_locked(&guard)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::env;
	// self
	use super::*;

	fn temp_store_path(tag: &str) -> PathBuf {
		env::temp_dir().join(format!("token-relay-store-{tag}-{}.json", std::process::id()))
	}

	#[test]
	fn persists_across_reopen() {
		let path = temp_store_path("reopen");

		{
			let store = FileStore::open(&path).expect("Opening a fresh store should succeed.");

			store
				.set(CredentialKey::RefreshToken, "refresh-persisted")
				.expect("Writes should persist to disk.");
		}

		let reopened = FileStore::open(&path).expect("Reopening the store should succeed.");

		assert_eq!(
			reopened.get(CredentialKey::RefreshToken).expect("Reads should succeed."),
			Some("refresh-persisted".into())
		);

		let _ = fs::remove_file(&path);
	}

	#[test]
	fn remove_is_durable() {
		let path = temp_store_path("remove");
		let store = FileStore::open(&path).expect("Opening a fresh store should succeed.");

		store
			.set(CredentialKey::AccessToken, "short-lived")
			.expect("Writes should persist to disk.");
		store.remove(CredentialKey::AccessToken).expect("Removals should persist to disk.");

		let reopened = FileStore::open(&path).expect("Reopening the store should succeed.");

		assert_eq!(
			reopened.get(CredentialKey::AccessToken).expect("Reads should succeed."),
			None
		);

		let _ = fs::remove_file(&path);
	}
}
