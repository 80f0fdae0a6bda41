//! Storage-SDK seam: backend contract, operation options, and error shapes.

// self
use crate::{_prelude::*, storage::sts::StsCredentials};

/// Boxed future returned by [`StorageBackend`] operations.
pub type StorageFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, BackendError>> + 'a + Send>>;

/// Error names an object-storage backend reports when its credentials are
/// stale or malformed. Any of these, or an HTTP 403, is auth-shaped.
const AUTH_SHAPED_NAMES: [&str; 3] =
	["InvalidAccessKeyId", "InvalidSecurityToken", "SecurityTokenExpired"];

/// Raw failure reported by a [`StorageBackend`] operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("{message}")]
pub struct BackendError {
	/// Backend error name (e.g. `InvalidAccessKeyId`), when the SDK reports one.
	pub name: Option<String>,
	/// Human-readable error payload.
	pub message: String,
	/// HTTP status code carried by the failure, when available.
	pub status: Option<u16>,
}
impl BackendError {
	/// Returns `true` when the failure points at the credentials rather than
	/// the operation: a known auth error name, or an HTTP 403.
	pub fn is_auth_shaped(&self) -> bool {
		self.name.as_deref().is_some_and(|name| AUTH_SHAPED_NAMES.contains(&name))
			|| self.status == Some(403)
	}
}

/// Error type produced by the object-storage coordinator's credential layer.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StorageError {
	/// The `/sts` exchange through the primary API failed.
	#[error("STS credential fetch failed: {message}.")]
	CredentialFetch {
		/// Human-readable failure summary shared by every attached caller.
		message: String,
	},
	/// Non-auth backend failure, surfaced unchanged.
	#[error("{0}")]
	Backend(#[from] BackendError),
}

/// Receipt returned for a completed object upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
	/// Object key the data now lives under.
	pub key: String,
	/// Entity tag reported by the backend, when available.
	pub etag: Option<String>,
}

/// Options applied when signing an object URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignUrlOptions {
	/// Signature validity window.
	pub expires_in: Duration,
	/// Optional `content-disposition` response-header override. Preview URLs
	/// never set one; download URLs always do.
	pub content_disposition: Option<String>,
}

/// Boxed future resolving with freshly-acquired STS credentials.
pub type StsFetchFuture = Pin<Box<dyn Future<Output = crate::error::Result<StsCredentials>> + Send>>;

/// Handle a storage SDK invokes from its own retry logic when it decides the
/// credentials it was constructed with have gone stale.
///
/// Invoking it invalidates the relay's credential cache and re-runs the
/// acquisition protocol, sharing any in-flight fetch.
#[derive(Clone)]
pub struct StsRefresher {
	inner: Arc<dyn Fn() -> StsFetchFuture + Send + Sync>,
}
impl StsRefresher {
	pub(crate) fn new(inner: impl Fn() -> StsFetchFuture + Send + Sync + 'static) -> Self {
		Self { inner: Arc::new(inner) }
	}

	/// Invalidates the cache and resolves with freshly-acquired credentials.
	pub async fn refresh(&self) -> crate::error::Result<StsCredentials> {
		(self.inner)().await
	}
}
impl Debug for StsRefresher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("StsRefresher(..)")
	}
}

/// Abstraction over object-storage SDKs.
///
/// A client is constructed per logical operation from the credentials that
/// are current at that instant; the relay hands the backend an
/// [`StsRefresher`] so the SDK's internal retry machinery can demand fresh
/// credentials without bypassing the cache discipline. Implementations must
/// not retry auth failures themselves beyond that hook: the bounded
/// retry-once policy lives in the coordinator.
pub trait StorageBackend
where
	Self: 'static + Send + Sync,
{
	/// SDK client handle bound to one credential snapshot.
	type Client: Send + Sync;

	/// Builds a client from the provided credential snapshot.
	fn connect(&self, credentials: &StsCredentials, refresher: StsRefresher) -> Self::Client;

	/// Uploads one object under `key`.
	fn put_object<'a>(
		&'a self,
		client: &'a Self::Client,
		key: &'a str,
		data: &'a [u8],
		content_type: &'a str,
	) -> StorageFuture<'a, UploadReceipt>;

	/// Produces a signed URL for `key` with the provided options.
	fn sign_url<'a>(
		&'a self,
		client: &'a Self::Client,
		key: &'a str,
		options: &'a SignUrlOptions,
	) -> StorageFuture<'a, String>;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn backend_error(name: Option<&str>, status: Option<u16>) -> BackendError {
		BackendError {
			name: name.map(str::to_owned),
			message: "storage failure".into(),
			status,
		}
	}

	#[test]
	fn named_auth_errors_are_auth_shaped() {
		assert!(backend_error(Some("InvalidAccessKeyId"), None).is_auth_shaped());
		assert!(backend_error(Some("SecurityTokenExpired"), None).is_auth_shaped());
		assert!(backend_error(Some("InvalidSecurityToken"), None).is_auth_shaped());
		assert!(!backend_error(Some("NoSuchBucket"), Some(404)).is_auth_shaped());
	}

	#[test]
	fn http_403_is_auth_shaped_without_a_name() {
		assert!(backend_error(None, Some(403)).is_auth_shaped());
		assert!(!backend_error(None, Some(500)).is_auth_shaped());
	}
}
