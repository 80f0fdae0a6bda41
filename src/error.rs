//! Relay-level error types shared across coordinators, stores, and transports.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential-store failure.
	#[error("{0}")]
	Store(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); never retried by the relay.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Object-storage backend failure that is not auth-shaped.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::storage::StorageError,
	),

	/// Backend answered with a non-200 HTTP status.
	#[error("Backend returned HTTP status {status}.")]
	Http {
		/// HTTP status code returned by the backend.
		status: u16,
	},
	/// Backend envelope carried a non-success business code.
	#[error("Backend rejected the request with business code {code}: {msg}.")]
	Business {
		/// Business code from the response envelope.
		code: i64,
		/// Human-readable message from the response envelope.
		msg: String,
	},
	/// Response envelope could not be decoded as JSON.
	#[error("Backend returned a malformed response envelope.")]
	EnvelopeParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code of the malformed response.
		status: u16,
	},
	/// Refresh endpoint failed or returned no usable token; the credential
	/// epoch is over and the caller must re-authenticate.
	#[error("Token refresh failed; re-authentication is required.")]
	RefreshFailed,
	/// Auth-shaped object-storage failure that survived the single retry.
	#[error("Object storage rejected the credentials: {message}.")]
	StorageAuth {
		/// Backend-supplied error name or message.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Configuration and validation failures raised by the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL or request path cannot be parsed.
	#[error("Request URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body cannot be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[from] serde_json::Error),
	/// Backend response omitted an expected token field.
	#[error("Backend response is missing the {field} field.")]
	MissingToken {
		/// Name of the absent token field.
		field: &'static str,
	},
	/// No refresh token is stored, so the refresh protocol cannot run.
	#[error("No refresh token is stored.")]
	MissingRefreshToken,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
