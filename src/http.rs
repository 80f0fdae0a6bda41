//! Transport primitives for authenticated backend calls.
//!
//! The module exposes [`Transport`] so downstream crates can integrate custom
//! HTTP clients. A transport executes exactly one HTTP-like call and reports
//! either the raw status + body or a [`TransportError`]; all retry, refresh,
//! and queueing decisions belong to the coordinators layered above it.

// std
use std::ops::Deref;
// self
use crate::_prelude::*;
use crate::error::TransportError;

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, TransportError>> + 'a + Send>>;

/// HTTP methods the relay dispatches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP DELETE.
	Delete,
}
impl Method {
	/// Returns the canonical method string.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One fully-resolved outgoing call handed to a [`Transport`].
///
/// Headers are ordered pairs rather than a map so coordinators control
/// exactly what goes on the wire; in particular the Authorization header is
/// either present with a value or absent entirely, never empty.
#[derive(Clone, Debug)]
pub struct Request {
	/// HTTP method to dispatch.
	pub method: Method,
	/// Fully-resolved request URL.
	pub url: Url,
	/// Header name/value pairs in dispatch order.
	pub headers: Vec<(String, String)>,
	/// Optional request body bytes.
	pub body: Option<Vec<u8>>,
}

/// Raw response surfaced by a [`Transport`].
#[derive(Clone, Debug)]
pub struct Response {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body bytes.
	pub body: Vec<u8>,
}

/// Abstraction over HTTP stacks capable of executing one backend call.
///
/// The trait is the relay's only dependency on an HTTP implementation.
/// Implementations must be `Send + Sync + 'static` so coordinators can share
/// them behind `Arc` across concurrent callers, and the returned futures must
/// be `Send` for the lifetime of the in-flight operation.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Executes one call, resolving with the raw status + body or a
	/// connectivity failure. Implementations must not retry on their own.
	fn send(&self, request: Request) -> TransportFuture<'_, Response>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one
/// place. The relay never follows redirects for credentialed endpoints, so
/// configure any custom [`ReqwestClient`] accordingly before wrapping it.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: Request) -> TransportFuture<'_, Response> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder = client.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(Response { status, body })
		})
	}
}
