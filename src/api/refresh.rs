//! Refresh protocol: single-flight token rotation with queued-waiter replay.
//!
//! [`ApiClient::refresh_access_token`] is reachable from any call that
//! observes an expiry signal. However many calls discover expiry
//! concurrently, exactly one exchange against the refresh endpoint runs; the
//! rest attach to its eventual outcome. Success commits the new access token
//! to the credential store *before* the flight settles, so no waiter is ever
//! replayed ahead of the new credential state. Failure is terminal for the
//! credential epoch: both tokens are destroyed, the re-authentication hook
//! fires once, and every waiter resolves as [`Error::RefreshFailed`].

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	api::{ApiClient, RequestDescriptor},
	auth::{CredentialKey, Secret},
	error::ConfigError,
	http::{Method, Transport},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Single-flight key guarding the refresh protocol.
pub(crate) const REFRESH_FLIGHT_KEY: &str = "token-refresh";

/// Shared failure published to every waiter of a failed refresh episode.
///
/// Deliberately carries no payload: the episode's diagnostics belong to the
/// leader's log line, while every attached caller resolves uniformly as
/// [`Error::RefreshFailed`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshError;
impl From<RefreshError> for Error {
	fn from(_: RefreshError) -> Self {
		Error::RefreshFailed
	}
}

#[derive(Debug, Deserialize)]
struct RefreshPayload {
	access_token: Option<String>,
}

impl<C> ApiClient<C>
where
	C: ?Sized + Transport,
{
	/// Runs (or joins) the refresh protocol, resolving with the new access
	/// token once it is committed to the store.
	pub async fn refresh_access_token(&self) -> Result<Secret> {
		const KIND: OpKind = OpKind::Refresh;

		let span = OpSpan::new(KIND, "refresh_access_token");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.refresh_flights
					.run_exclusive(REFRESH_FLIGHT_KEY, || self.lead_refresh())
					.await
					.map_err(Error::from)
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	async fn lead_refresh(&self) -> Result<Secret, RefreshError> {
		self.refresh_metrics.record_attempt();

		match self.exchange_refresh_token().await {
			Ok(token) => {
				self.refresh_metrics.record_success();

				Ok(token)
			},
			Err(_err) => {
				// Terminal for this credential epoch: both tokens die
				// together and the caller layer is signalled exactly once.
				#[cfg(feature = "tracing")]
				tracing::warn!(error = %_err, "Token refresh failed; clearing credentials.");

				let _ = self.store.clear_credentials();

				if let Some(hook) = &self.reauth_hook {
					hook();
				}

				self.refresh_metrics.record_failure();

				Err(RefreshError)
			},
		}
	}

	async fn exchange_refresh_token(&self) -> Result<Secret> {
		let refresh_token = self
			.store
			.get(CredentialKey::RefreshToken)?
			.ok_or(ConfigError::MissingRefreshToken)?;
		let descriptor = RequestDescriptor::builder(Method::Post, self.refresh_path.clone())
			.json(serde_json::json!({ "refresh_token": refresh_token }))
			.part_of_refresh_flow()
			.build();
		let payload: RefreshPayload = self.dispatch(&descriptor).await?.into_result()?;
		let access = payload
			.access_token
			.filter(|token| !token.is_empty())
			.ok_or(ConfigError::MissingToken { field: "access_token" })?;

		// Commit before the flight settles so waiters replay against the
		// rotated token, never the expired one.
		self.store.store_access_token(&access)?;

		Ok(Secret::new(access))
	}
}
