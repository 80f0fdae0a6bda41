//! Primary-API coordinator: credential attachment, expiry detection, and
//! single-flight refresh with replayable waiters.

pub mod descriptor;
pub mod refresh;

pub use descriptor::*;
pub use refresh::*;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, CredentialSet, Secret},
	envelope::{self, Reply},
	error::ConfigError,
	http::{Method, Request, Transport},
	obs::{self, OpKind, OpOutcome, OpSpan},
	singleflight::Singleflight,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Coordinator specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Default path of the refresh-token endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/refresh";

/// Coordinates authenticated calls against the primary application API.
///
/// The coordinator owns the transport, the credential store, and the
/// refresh single-flight state so callers only ever see a plain result or a
/// typed failure. At most one refresh runs at a time; every call that
/// observes the in-flight refresh is queued and replayed in arrival order
/// once the refresh settles.
pub struct ApiClient<C>
where
	C: ?Sized + Transport,
{
	/// Transport used for every outbound call.
	pub transport: Arc<C>,
	/// Credential store holding the access/refresh token pair.
	pub store: Arc<dyn CredentialStore>,
	/// Base URL every descriptor path is resolved against.
	pub base_url: Url,
	/// Shared counters for refresh protocol outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	refresh_path: String,
	reauth_hook: Option<Arc<dyn Fn() + Send + Sync>>,
	refresh_flights: Arc<Singleflight<Secret, RefreshError>>,
}
impl<C> ApiClient<C>
where
	C: ?Sized + Transport,
{
	/// Creates a coordinator that reuses the caller-provided transport.
	pub fn with_transport(
		store: Arc<dyn CredentialStore>,
		base_url: Url,
		transport: impl Into<Arc<C>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			base_url,
			refresh_metrics: Default::default(),
			refresh_path: DEFAULT_REFRESH_PATH.into(),
			reauth_hook: None,
			refresh_flights: Default::default(),
		}
	}

	/// Overrides the refresh endpoint path (defaults to [`DEFAULT_REFRESH_PATH`]).
	pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Registers the "must re-authenticate" hook.
	///
	/// Fired exactly once per failed-refresh episode, after both stored
	/// tokens have been destroyed; intended to route the caller to a login
	/// flow.
	pub fn with_reauth_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
		self.reauth_hook = Some(Arc::new(hook));

		self
	}

	/// Executes one descriptor against the primary API.
	///
	/// Contract, in order:
	/// 1. a refresh is in progress and this descriptor is not the refresh
	///    call itself: queue as a waiter, replay once the refresh settles;
	/// 2. otherwise attach credentials per the descriptor's [`AuthMode`]
	///    and dispatch;
	/// 3. connectivity failures surface directly, never trigger a refresh;
	/// 4. an expiry signal on a non-retry descriptor enters the refresh
	///    protocol, then replays the descriptor once with the new token;
	/// 5. every other outcome maps onto the closed failure taxonomy.
	pub async fn call<T>(&self, descriptor: RequestDescriptor) -> Result<T>
	where
		T: DeserializeOwned,
	{
		const KIND: OpKind = OpKind::Call;

		let span = OpSpan::new(KIND, "call");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.run_call(descriptor)).await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	async fn run_call<T>(&self, descriptor: RequestDescriptor) -> Result<T>
	where
		T: DeserializeOwned,
	{
		if !descriptor.is_part_of_refresh_flow
			&& let Some(flight) = self.refresh_flights.current(REFRESH_FLIGHT_KEY)
		{
			// Arrived during a refresh: wait for it to settle, then replay
			// against the committed credential state. A failed refresh fails
			// every waiter without dispatching them.
			flight.join().await.map_err(Error::from)?;

			return self.dispatch(&descriptor).await?.into_result();
		}

		match self.dispatch(&descriptor).await? {
			Reply::ExpiredCredential { .. } if !descriptor.is_retry_attempt => {
				self.refresh_access_token().await?;

				self.dispatch(&descriptor.as_retry()).await?.into_result()
			},
			reply => reply.into_result(),
		}
	}

	/// Authenticates against a login-shaped endpoint and persists the issued
	/// credential pair.
	///
	/// The call is dispatched with [`AuthMode::None`]: login must never
	/// carry an Authorization header, even when a stale token is stored.
	pub async fn login(
		&self,
		path: impl Into<String>,
		payload: serde_json::Value,
	) -> Result<CredentialSet> {
		const KIND: OpKind = OpKind::Login;

		let span = OpSpan::new(KIND, "login");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let descriptor = RequestDescriptor::builder(Method::Post, path)
					.json(payload)
					.auth(AuthMode::None)
					.build();
				let tokens: LoginPayload = self.run_call(descriptor).await?;
				let access = tokens
					.access_token
					.filter(|token| !token.is_empty())
					.ok_or(ConfigError::MissingToken { field: "access_token" })?;
				let refresh = tokens
					.refresh_token
					.filter(|token| !token.is_empty())
					.ok_or(ConfigError::MissingToken { field: "refresh_token" })?;
				let credentials = CredentialSet::new(access, refresh);

				self.store.store_credentials(&credentials)?;

				Ok(credentials)
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	/// Destroys both stored tokens.
	pub fn logout(&self) -> Result<()> {
		self.store.clear_credentials()?;

		Ok(())
	}

	pub(crate) async fn dispatch<T>(&self, descriptor: &RequestDescriptor) -> Result<Reply<T>>
	where
		T: DeserializeOwned,
	{
		let request = self.assemble(descriptor)?;
		let response = self.transport.send(request).await?;

		envelope::classify(&response)
	}

	fn assemble(&self, descriptor: &RequestDescriptor) -> Result<Request> {
		let mut raw = self.base_url.as_str().trim_end_matches('/').to_owned();

		raw.push_str(&descriptor.path);

		let url = Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { source })?;
		let mut headers = Vec::with_capacity(descriptor.headers.len() + 2);

		headers.push(("Content-Type".into(), "application/json".into()));
		headers.extend(descriptor.headers.iter().cloned());

		match descriptor.auth {
			AuthMode::Bearer =>
				if let Some(token) = self.store.get(CredentialKey::AccessToken)? {
					headers.push(("Authorization".into(), format!("Bearer {token}")));
				},
			// Absence of the header, not an empty value.
			AuthMode::None => {},
		}

		let body = match &descriptor.body {
			Some(value) =>
				Some(serde_json::to_vec(value).map_err(ConfigError::BodySerialize)?),
			None => None,
		};

		Ok(Request { method: descriptor.method, url, headers, body })
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a coordinator backed by a fresh reqwest transport.
	pub fn new(store: Arc<dyn CredentialStore>, base_url: Url) -> Self {
		Self::with_transport(store, base_url, ReqwestTransport::default())
	}
}
impl<C> Clone for ApiClient<C>
where
	C: ?Sized + Transport,
{
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			store: Arc::clone(&self.store),
			base_url: self.base_url.clone(),
			refresh_metrics: Arc::clone(&self.refresh_metrics),
			refresh_path: self.refresh_path.clone(),
			reauth_hook: self.reauth_hook.clone(),
			refresh_flights: Arc::clone(&self.refresh_flights),
		}
	}
}
impl<C> Debug for ApiClient<C>
where
	C: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.base_url.as_str())
			.field("refresh_path", &self.refresh_path)
			.field("reauth_hook_set", &self.reauth_hook.is_some())
			.finish()
	}
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
	access_token: Option<String>,
	refresh_token: Option<String>,
}
