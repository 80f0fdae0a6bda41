//! Object-storage coordinator: STS credential caching, single-flight fetch,
//! and bounded auth retry around backend operations.

pub mod client;
pub mod sts;

pub use client::*;
pub use sts::*;

// self
use crate::{
	_prelude::*,
	api::{ApiClient, RequestDescriptor},
	http::{Method, Transport},
	obs::{self, OpKind, OpOutcome, OpSpan},
	singleflight::Singleflight,
};

/// Single-flight key guarding the STS credential fetch.
pub(crate) const STS_FLIGHT_KEY: &str = "sts-credentials";

/// Default path of the STS credential endpoint.
pub const DEFAULT_STS_PATH: &str = "/sts";

/// Default validity window for signed preview/download URLs.
pub const DEFAULT_SIGN_EXPIRY: Duration = Duration::seconds(3600);

/// Coordinates object-storage access on top of temporary STS credentials.
///
/// Credentials are a time-boxed cache: reused while fresh, fetched under
/// single-flight on a miss, and invalidated the moment the backend reports an
/// auth-shaped failure. Every operation retries at most once after such a
/// failure, with freshly fetched credentials; all other failures propagate
/// unchanged.
pub struct StorageCoordinator<C, B>
where
	C: ?Sized + Transport,
	B: StorageBackend,
{
	/// Primary-API coordinator used for the `/sts` exchange.
	pub api: ApiClient<C>,
	/// SDK seam the storage operations dispatch through.
	pub backend: Arc<B>,
	cache: Arc<StsCache>,
	sts_path: String,
	flights: Arc<Singleflight<StsCredentials, StorageError>>,
}
impl<C, B> StorageCoordinator<C, B>
where
	C: ?Sized + Transport,
	B: StorageBackend,
{
	/// Creates a coordinator over the provided API client and backend.
	pub fn new(api: ApiClient<C>, backend: impl Into<Arc<B>>) -> Self {
		Self {
			api,
			backend: backend.into(),
			cache: Arc::new(StsCache::default()),
			sts_path: DEFAULT_STS_PATH.into(),
			flights: Default::default(),
		}
	}

	/// Overrides the STS endpoint path (defaults to [`DEFAULT_STS_PATH`]).
	pub fn with_sts_path(mut self, path: impl Into<String>) -> Self {
		self.sts_path = path.into();

		self
	}

	/// Replaces the credential cache's soft TTL (defaults to [`STS_SOFT_TTL`]).
	pub fn with_soft_ttl(mut self, ttl: Duration) -> Self {
		self.cache = Arc::new(StsCache::new(ttl));

		self
	}

	/// Drops the cached credential snapshot so the next operation fetches.
	pub fn invalidate_credentials(&self) {
		self.cache.invalidate();
	}

	/// Resolves the current credential snapshot.
	///
	/// Fresh cache wins; otherwise the fetch runs under single-flight, so
	/// two concurrent cache misses still issue exactly one `/sts` call and
	/// share its outcome. The flight marker clears once the fetch settles,
	/// success or failure, so a later call can always retry.
	pub async fn credentials(&self) -> Result<StsCredentials> {
		if let Some(fresh) = self.cache.fresh(OffsetDateTime::now_utc()) {
			return Ok(fresh);
		}

		self.flights
			.run_exclusive(STS_FLIGHT_KEY, || self.lead_fetch())
			.await
			.map_err(Error::from)
	}

	async fn lead_fetch(&self) -> Result<StsCredentials, StorageError> {
		// A previous leader may have committed between our cache check and
		// winning the flight; serve its snapshot instead of refetching.
		if let Some(fresh) = self.cache.fresh(OffsetDateTime::now_utc()) {
			return Ok(fresh);
		}

		const KIND: OpKind = OpKind::StsFetch;

		let span = OpSpan::new(KIND, "lead_fetch");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let descriptor =
					RequestDescriptor::builder(Method::Get, self.sts_path.clone()).build();
				let payload: StsPayload = self
					.api
					.call(descriptor)
					.await
					.map_err(|err| StorageError::CredentialFetch { message: err.to_string() })?;
				let credentials =
					StsCredentials::from_payload(payload, OffsetDateTime::now_utc());

				self.cache.store(credentials.clone());

				Ok(credentials)
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	/// Builds a backend client from the current valid credentials.
	///
	/// The client carries an [`StsRefresher`] so the SDK's own retry logic
	/// can invalidate the cache and re-run acquisition without bypassing the
	/// single-flight discipline.
	pub async fn client(&self) -> Result<B::Client> {
		let credentials = self.credentials().await?;

		Ok(self.backend.connect(&credentials, self.refresher()))
	}

	/// Returns the refresher handle handed to every constructed client.
	pub fn refresher(&self) -> StsRefresher {
		let coordinator = self.clone();

		StsRefresher::new(move || {
			let coordinator = coordinator.clone();

			Box::pin(async move {
				coordinator.cache.invalidate();
				coordinator.credentials().await
			})
		})
	}

	/// Uploads `data` under `key`, inferring the content type from the key's
	/// suffix.
	pub async fn upload_object(&self, key: &str, data: &[u8]) -> Result<UploadReceipt> {
		let content_type = content_type_for(key);

		self.with_auth_retry(OpKind::Upload, async |client: &B::Client| {
			self.backend.put_object(client, key, data, content_type).await
		})
		.await
	}

	/// Signs an inline preview URL for `key`.
	///
	/// Preview URLs never carry a content-disposition override, so the
	/// object renders in place instead of downloading.
	pub async fn sign_preview_url(
		&self,
		key: &str,
		expires_in: Option<Duration>,
	) -> Result<String> {
		let options = SignUrlOptions {
			expires_in: expires_in.unwrap_or(DEFAULT_SIGN_EXPIRY),
			content_disposition: None,
		};

		self.with_auth_retry(OpKind::SignUrl, async |client: &B::Client| {
			self.backend.sign_url(client, key, &options).await
		})
		.await
	}

	/// Signs an attachment download URL for `key`.
	///
	/// The content-disposition override is always set; the filename defaults
	/// to the last path segment of the key.
	pub async fn sign_download_url(
		&self,
		key: &str,
		filename: Option<&str>,
		expires_in: Option<Duration>,
	) -> Result<String> {
		let name = match filename {
			Some(name) if !name.is_empty() => name,
			_ => key.rsplit('/').next().unwrap_or(key),
		};
		let options = SignUrlOptions {
			expires_in: expires_in.unwrap_or(DEFAULT_SIGN_EXPIRY),
			content_disposition: Some(format!(
				"attachment; filename={}",
				urlencoding::encode(name)
			)),
		};

		self.with_auth_retry(OpKind::SignUrl, async |client: &B::Client| {
			self.backend.sign_url(client, key, &options).await
		})
		.await
	}

	/// Runs `op` against a fresh client, retrying exactly once with freshly
	/// fetched credentials when the failure is auth-shaped.
	async fn with_auth_retry<T>(
		&self,
		kind: OpKind,
		op: impl AsyncFn(&B::Client) -> Result<T, BackendError>,
	) -> Result<T> {
		let span = OpSpan::new(kind, "with_auth_retry");

		obs::record_op_outcome(kind, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				let client = self.client().await?;

				match op(&client).await {
					Ok(value) => Ok(value),
					Err(err) if err.is_auth_shaped() => {
						#[cfg(feature = "tracing")]
						tracing::debug!(
							error = %err,
							"Auth-shaped storage failure; refetching credentials for one retry."
						);

						self.cache.invalidate();

						let client = self.client().await?;

						op(&client).await.map_err(|retry_err| {
							if retry_err.is_auth_shaped() {
								Error::StorageAuth {
									message: retry_err.to_string(),
									status: retry_err.status,
								}
							} else {
								StorageError::from(retry_err).into()
							}
						})
					},
					Err(err) => Err(StorageError::from(err).into()),
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(kind, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(kind, OpOutcome::Failure),
		}

		result
	}
}
impl<C, B> Clone for StorageCoordinator<C, B>
where
	C: ?Sized + Transport,
	B: StorageBackend,
{
	fn clone(&self) -> Self {
		Self {
			api: self.api.clone(),
			backend: Arc::clone(&self.backend),
			cache: Arc::clone(&self.cache),
			sts_path: self.sts_path.clone(),
			flights: Arc::clone(&self.flights),
		}
	}
}
impl<C, B> Debug for StorageCoordinator<C, B>
where
	C: ?Sized + Transport,
	B: StorageBackend,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StorageCoordinator")
			.field("sts_path", &self.sts_path)
			.field("soft_ttl", &self.cache.soft_ttl())
			.finish()
	}
}

/// Maps a key suffix onto the upload content type.
fn content_type_for(key: &str) -> &'static str {
	match key.rsplit('.').next() {
		Some("png") => "image/png",
		Some("jpg") | Some("jpeg") => "image/jpeg",
		Some("webp") => "image/webp",
		Some("svg") => "image/svg+xml",
		_ => "application/octet-stream",
	}
}
