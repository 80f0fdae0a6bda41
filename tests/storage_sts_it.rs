// std
use std::{
	collections::VecDeque,
	sync::{
		Arc, Mutex,
		atomic::{AtomicU32, Ordering},
	},
};
// crates.io
use serde_json::json;
use time::Duration;
use url::Url;
// self
use token_relay::{
	api::ApiClient,
	error::Error,
	http::{Request, Response, Transport, TransportFuture},
	storage::{
		BackendError, SignUrlOptions, StorageBackend, StorageCoordinator, StorageFuture,
		StsCredentials, StsRefresher, UploadReceipt,
	},
	store::{CredentialStore, MemoryStore},
};

/// Transport that answers every `/sts` exchange with a numbered credential
/// set, so tests can tell fetches apart.
struct StsTransport {
	hits: AtomicU32,
	fail: bool,
}
impl StsTransport {
	fn new() -> Self {
		Self { hits: AtomicU32::new(0), fail: false }
	}

	fn failing() -> Self {
		Self { hits: AtomicU32::new(0), fail: true }
	}

	fn hits(&self) -> u32 {
		self.hits.load(Ordering::SeqCst)
	}
}
impl Transport for StsTransport {
	fn send(&self, request: Request) -> TransportFuture<'_, Response> {
		Box::pin(async move {
			assert_eq!(request.url.path(), "/sts");

			let n = self.hits.fetch_add(1, Ordering::SeqCst) + 1;
			let envelope = if self.fail {
				json!({ "code": 0, "msg": "sts issuance failed" })
			} else {
				json!({
					"code": 200,
					"msg": "ok",
					"data": {
						"AccessKeyId": format!("STS.key-{n}"),
						"AccessKeySecret": "key-secret",
						"SecurityToken": "session-token",
					},
				})
			};
			let body = serde_json::to_vec(&envelope)
				.expect("Canned STS envelope should serialize.");

			Ok(Response { status: 200, body })
		})
	}
}

/// Client handle the mock backend mints per credential snapshot.
struct MockClient {
	access_key_id: String,
}

/// Backend with scripted failures; each queued failure is consumed by the
/// next operation, after which operations succeed.
#[derive(Default)]
struct MockBackend {
	operations: AtomicU32,
	scripted_failures: Mutex<VecDeque<BackendError>>,
	seen_key_ids: Mutex<Vec<String>>,
	last_sign_options: Mutex<Option<SignUrlOptions>>,
	last_refresher: Mutex<Option<StsRefresher>>,
}
impl MockBackend {
	fn script_failure(&self, failure: BackendError) {
		self.scripted_failures.lock().expect("Script lock should not be poisoned.").push_back(failure);
	}

	fn operations(&self) -> u32 {
		self.operations.load(Ordering::SeqCst)
	}

	fn seen_key_ids(&self) -> Vec<String> {
		self.seen_key_ids.lock().expect("Key-id lock should not be poisoned.").clone()
	}

	fn take_outcome(&self, client: &MockClient) -> Result<(), BackendError> {
		self.operations.fetch_add(1, Ordering::SeqCst);
		self.seen_key_ids
			.lock()
			.expect("Key-id lock should not be poisoned.")
			.push(client.access_key_id.clone());

		match self
			.scripted_failures
			.lock()
			.expect("Script lock should not be poisoned.")
			.pop_front()
		{
			Some(failure) => Err(failure),
			None => Ok(()),
		}
	}
}
impl StorageBackend for MockBackend {
	type Client = MockClient;

	fn connect(&self, credentials: &StsCredentials, refresher: StsRefresher) -> Self::Client {
		*self.last_refresher.lock().expect("Refresher lock should not be poisoned.") =
			Some(refresher);

		MockClient { access_key_id: credentials.access_key_id.clone() }
	}

	fn put_object<'a>(
		&'a self,
		client: &'a Self::Client,
		key: &'a str,
		_data: &'a [u8],
		_content_type: &'a str,
	) -> StorageFuture<'a, UploadReceipt> {
		Box::pin(async move {
			self.take_outcome(client)?;

			Ok(UploadReceipt { key: key.into(), etag: Some("etag-1".into()) })
		})
	}

	fn sign_url<'a>(
		&'a self,
		client: &'a Self::Client,
		key: &'a str,
		options: &'a SignUrlOptions,
	) -> StorageFuture<'a, String> {
		Box::pin(async move {
			self.take_outcome(client)?;

			*self
				.last_sign_options
				.lock()
				.expect("Options lock should not be poisoned.") = Some(options.clone());

			Ok(format!("https://bucket.example.com/{key}?signature=abc"))
		})
	}
}

fn auth_failure() -> BackendError {
	BackendError {
		name: Some("SecurityTokenExpired".into()),
		message: "The security token you provided has expired.".into(),
		status: Some(403),
	}
}

fn build_coordinator(
	transport: StsTransport,
) -> (StorageCoordinator<StsTransport, MockBackend>, Arc<StsTransport>, Arc<MockBackend>) {
	let transport = Arc::new(transport);
	let backend = Arc::new(MockBackend::default());
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let base_url = Url::parse("http://api.test").expect("Test base URL should parse.");
	let api = ApiClient::with_transport(store, base_url, transport.clone());
	let coordinator = StorageCoordinator::new(api, backend.clone());

	(coordinator, transport, backend)
}

#[tokio::test]
async fn concurrent_credential_requests_share_one_fetch() {
	let (coordinator, transport, _) = build_coordinator(StsTransport::new());
	let handles: Vec<_> = (0..4)
		.map(|_| {
			let coordinator = coordinator.clone();

			tokio::spawn(async move { coordinator.credentials().await })
		})
		.collect();

	for handle in handles {
		let credentials = handle
			.await
			.expect("Spawned credential task should not panic.")
			.expect("Every concurrent caller should share the fetched snapshot.");

		assert_eq!(credentials.access_key_id, "STS.key-1");
	}

	assert_eq!(transport.hits(), 1);
}

#[tokio::test]
async fn fresh_cache_is_reused_without_a_fetch() {
	let (coordinator, transport, _) = build_coordinator(StsTransport::new());
	let first = coordinator.credentials().await.expect("First acquisition should fetch.");
	let second = coordinator.credentials().await.expect("Second acquisition should hit cache.");

	assert_eq!(first, second);
	assert_eq!(transport.hits(), 1);
}

#[tokio::test]
async fn invalidate_forces_a_refetch() {
	let (coordinator, transport, _) = build_coordinator(StsTransport::new());
	let first = coordinator.credentials().await.expect("First acquisition should fetch.");

	coordinator.invalidate_credentials();

	let second = coordinator.credentials().await.expect("Post-invalidate acquisition should fetch.");

	assert_ne!(first.access_key_id, second.access_key_id);
	assert_eq!(transport.hits(), 2);
}

#[tokio::test]
async fn failed_fetches_are_never_cached() {
	let (coordinator, transport, _) = build_coordinator(StsTransport::failing());

	for _ in 0..2 {
		let err = coordinator
			.credentials()
			.await
			.expect_err("A failed issuance should surface to the caller.");

		assert!(matches!(err, Error::Storage(_)), "unexpected error: {err:?}");
	}

	// Each attempt fetched; no failure snapshot lingered in the cache.
	assert_eq!(transport.hits(), 2);
}

#[tokio::test]
async fn auth_shaped_failure_retries_once_with_fresh_credentials() {
	let (coordinator, transport, backend) = build_coordinator(StsTransport::new());

	backend.script_failure(auth_failure());

	let receipt = coordinator
		.upload_object("avatars/alice.png", b"bytes")
		.await
		.expect("Upload should succeed on the post-refetch retry.");

	assert_eq!(receipt.key, "avatars/alice.png");
	assert_eq!(backend.operations(), 2);
	assert_eq!(transport.hits(), 2);
	// The retry ran against the refetched snapshot, not the stale one.
	assert_eq!(backend.seen_key_ids(), vec!["STS.key-1".to_owned(), "STS.key-2".to_owned()]);
}

#[tokio::test]
async fn auth_failure_surviving_the_retry_is_terminal() {
	let (coordinator, _, backend) = build_coordinator(StsTransport::new());

	backend.script_failure(auth_failure());
	backend.script_failure(auth_failure());

	let err = coordinator
		.upload_object("avatars/alice.png", b"bytes")
		.await
		.expect_err("A second auth-shaped failure must not trigger another retry.");

	assert!(
		matches!(err, Error::StorageAuth { status: Some(403), .. }),
		"unexpected error: {err:?}"
	);
	assert_eq!(backend.operations(), 2);
}

#[tokio::test]
async fn non_auth_failures_are_not_retried() {
	let (coordinator, transport, backend) = build_coordinator(StsTransport::new());

	backend.script_failure(BackendError {
		name: None,
		message: "internal error".into(),
		status: Some(500),
	});

	let err = coordinator
		.upload_object("avatars/alice.png", b"bytes")
		.await
		.expect_err("Non-auth backend failures should surface unchanged.");

	assert!(matches!(err, Error::Storage(_)), "unexpected error: {err:?}");
	assert_eq!(backend.operations(), 1);
	assert_eq!(transport.hits(), 1);
}

#[tokio::test]
async fn preview_urls_never_carry_a_content_disposition() {
	let (coordinator, _, backend) = build_coordinator(StsTransport::new());
	let url = coordinator
		.sign_preview_url("avatars/alice.png", None)
		.await
		.expect("Preview signing should succeed.");

	assert!(url.contains("avatars/alice.png"));

	let options = backend
		.last_sign_options
		.lock()
		.expect("Options lock should not be poisoned.")
		.clone()
		.expect("The backend should have observed signing options.");

	assert_eq!(options.expires_in, Duration::seconds(3600));
	assert_eq!(options.content_disposition, None);
}

#[tokio::test]
async fn download_urls_default_the_filename_to_the_key_basename() {
	let (coordinator, _, backend) = build_coordinator(StsTransport::new());

	coordinator
		.sign_download_url("docs/reports/q3 report.pdf", None, Some(Duration::seconds(120)))
		.await
		.expect("Download signing should succeed.");

	let options = backend
		.last_sign_options
		.lock()
		.expect("Options lock should not be poisoned.")
		.clone()
		.expect("The backend should have observed signing options.");

	assert_eq!(options.expires_in, Duration::seconds(120));
	assert_eq!(
		options.content_disposition.as_deref(),
		Some("attachment; filename=q3%20report.pdf")
	);
}

#[tokio::test]
async fn download_urls_honor_an_explicit_filename() {
	let (coordinator, _, backend) = build_coordinator(StsTransport::new());

	coordinator
		.sign_download_url("docs/raw-key", Some("summary (final).pdf"), None)
		.await
		.expect("Download signing should succeed.");

	let options = backend
		.last_sign_options
		.lock()
		.expect("Options lock should not be poisoned.")
		.clone()
		.expect("The backend should have observed signing options.");

	assert_eq!(
		options.content_disposition.as_deref(),
		Some("attachment; filename=summary%20%28final%29.pdf")
	);
}

#[tokio::test]
async fn the_sdk_refresher_invalidates_and_refetches() {
	let (coordinator, transport, backend) = build_coordinator(StsTransport::new());
	let _ = coordinator.client().await.expect("Client construction should succeed.");
	let refresher = backend
		.last_refresher
		.lock()
		.expect("Refresher lock should not be poisoned.")
		.clone()
		.expect("Connecting should hand the backend a refresher.");
	let refreshed = refresher
		.refresh()
		.await
		.expect("The refresher should resolve with fresh credentials.");

	assert_eq!(refreshed.access_key_id, "STS.key-2");
	assert_eq!(transport.hits(), 2);
}
