//! Request descriptors for the primary-API coordinator.

// self
use crate::{_prelude::*, http::Method};

/// How the coordinator attaches credentials to a dispatched descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMode {
	/// Attach `Authorization: Bearer <token>` when a token is stored.
	#[default]
	Bearer,
	/// Guarantee the Authorization header is absent, not empty. Used by
	/// login and registration, which must never carry a stale token.
	None,
}

/// One logical primary-API call before credentials are attached.
///
/// `is_retry_attempt` prevents infinite refresh loops: a call that is itself
/// a post-refresh retry can never trigger a second refresh.
/// `is_part_of_refresh_flow` exempts the refresh call itself from being
/// queued behind its own refresh.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
	/// Path relative to the coordinator's base URL, with leading slash.
	pub path: String,
	/// HTTP method to dispatch.
	pub method: Method,
	/// Extra header name/value pairs.
	pub headers: Vec<(String, String)>,
	/// Optional JSON body.
	pub body: Option<serde_json::Value>,
	/// Credential attachment mode.
	pub auth: AuthMode,
	/// Set when this descriptor is a post-refresh replay of a failed call.
	pub is_retry_attempt: bool,
	/// Set on the refresh call itself so it bypasses the waiter queue.
	pub is_part_of_refresh_flow: bool,
}
impl RequestDescriptor {
	/// Returns a builder for the provided method + path.
	pub fn builder(method: Method, path: impl Into<String>) -> RequestDescriptorBuilder {
		RequestDescriptorBuilder::new(method, path)
	}

	/// Clones this descriptor as a post-refresh retry.
	pub(crate) fn as_retry(&self) -> Self {
		let mut retry = self.clone();

		retry.is_retry_attempt = true;

		retry
	}
}

/// Builder for [`RequestDescriptor`] values.
#[derive(Debug)]
pub struct RequestDescriptorBuilder {
	descriptor: RequestDescriptor,
}
impl RequestDescriptorBuilder {
	/// Creates a new builder seeded with the provided method + path.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		let path = path.into();
		let path = if path.starts_with('/') { path } else { format!("/{path}") };

		Self {
			descriptor: RequestDescriptor {
				path,
				method,
				headers: Vec::new(),
				body: None,
				auth: AuthMode::default(),
				is_retry_attempt: false,
				is_part_of_refresh_flow: false,
			},
		}
	}

	/// Appends one header pair.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.descriptor.headers.push((name.into(), value.into()));

		self
	}

	/// Sets the JSON body.
	pub fn json(mut self, body: serde_json::Value) -> Self {
		self.descriptor.body = Some(body);

		self
	}

	/// Overrides the credential attachment mode.
	pub fn auth(mut self, auth: AuthMode) -> Self {
		self.descriptor.auth = auth;

		self
	}

	/// Marks the descriptor as part of the refresh flow itself.
	pub fn part_of_refresh_flow(mut self) -> Self {
		self.descriptor.is_part_of_refresh_flow = true;

		self
	}

	/// Consumes the builder.
	pub fn build(self) -> RequestDescriptor {
		self.descriptor
	}
}
