//! Business response envelope decoding and classification.
//!
//! The backend wraps every payload in `{ code, msg, data }`; `code == 200`
//! combined with HTTP 200 is the only success condition. Decoding happens
//! exactly once per response and produces a closed [`Reply`] variant set, so
//! the coordinator's retry logic never probes loose JSON fields.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::_prelude::*;

/// Business code attached to successful envelopes.
pub const CODE_SUCCESS: i64 = 200;
/// Business code for unspecified server-side failures.
pub const CODE_SERVER_ERROR: i64 = 0;
/// Business code for a generic authorization failure; combined with HTTP 401
/// it signals an expired credential.
pub const CODE_AUTH_ERROR: i64 = 1;
/// Business code signalling an expired access token on its own.
pub const CODE_TOKEN_EXPIRED: i64 = 2;
/// Business code for login failures.
pub const CODE_LOGIN_ERROR: i64 = 3;
/// Business code for rejected refresh tokens.
pub const CODE_REFRESH_TOKEN_ERROR: i64 = 4;

/// Wire envelope carried by every primary-API response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
	/// Business status code; [`CODE_SUCCESS`] means success.
	pub code: i64,
	/// Human-readable response message.
	#[serde(default)]
	pub msg: String,
	/// Response payload; failure envelopes usually omit it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
}

/// Closed classification of one backend response.
///
/// [`Reply::ExpiredCredential`] covers both expiry triggers: the dedicated
/// token-expired business code on its own, and HTTP 401 combined with the
/// generic auth-error code. The two remain independent triggers.
#[derive(Clone, Debug)]
pub enum Reply<T> {
	/// HTTP 200 with a success envelope; carries the decoded payload.
	Success(T),
	/// The response signals an expired or invalid access token.
	ExpiredCredential {
		/// Business code that carried the signal.
		code: i64,
		/// Message from the envelope.
		msg: String,
	},
	/// Non-200 HTTP status without an expiry signal.
	Http {
		/// HTTP status code.
		status: u16,
	},
	/// HTTP 200 with a non-success business code.
	Business {
		/// Business code from the envelope.
		code: i64,
		/// Message from the envelope.
		msg: String,
	},
}
impl<T> Reply<T> {
	/// Converts a non-success reply into its relay error, treating an expiry
	/// signal as a plain business failure. Used once refresh is no longer an
	/// option for the originating call.
	pub fn into_result(self) -> Result<T> {
		match self {
			Reply::Success(data) => Ok(data),
			Reply::ExpiredCredential { code, msg } | Reply::Business { code, msg } =>
				Err(Error::Business { code, msg }),
			Reply::Http { status } => Err(Error::Http { status }),
		}
	}
}

/// Classifies one raw response into a [`Reply`].
///
/// The envelope is parsed leniently for non-200 statuses: a 401 whose body is
/// not a valid envelope is still just an HTTP failure. Only an HTTP 200 with
/// an undecodable body is a hard parse error.
pub fn classify<T>(response: &crate::http::Response) -> Result<Reply<T>>
where
	T: DeserializeOwned,
{
	let envelope = parse_envelope(&response.body);

	if let Ok(envelope) = &envelope
		&& (envelope.code == CODE_TOKEN_EXPIRED
			|| (response.status == 401 && envelope.code == CODE_AUTH_ERROR))
	{
		return Ok(Reply::ExpiredCredential { code: envelope.code, msg: envelope.msg.clone() });
	}
	if response.status != 200 {
		return Ok(Reply::Http { status: response.status });
	}

	let envelope = envelope
		.map_err(|source| Error::EnvelopeParse { source, status: response.status })?;

	if envelope.code != CODE_SUCCESS {
		return Ok(Reply::Business { code: envelope.code, msg: envelope.msg });
	}

	let data = decode_payload(
		envelope.data.unwrap_or(serde_json::Value::Null),
		response.status,
	)?;

	Ok(Reply::Success(data))
}

fn parse_envelope(
	body: &[u8],
) -> Result<Envelope<serde_json::Value>, serde_path_to_error::Error<serde_json::Error>> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
}

fn decode_payload<T>(data: serde_json::Value, status: u16) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(data)
		.map_err(|source| Error::EnvelopeParse { source, status })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::Response;

	fn response(status: u16, body: &str) -> Response {
		Response { status, body: body.as_bytes().to_vec() }
	}

	#[test]
	fn success_requires_http_200_and_code_200() {
		let reply: Reply<String> =
			classify(&response(200, r#"{"code":200,"msg":"ok","data":"payload"}"#))
				.expect("Success envelope should classify cleanly.");

		assert!(matches!(reply, Reply::Success(ref data) if data == "payload"));
	}

	#[test]
	fn token_expired_code_triggers_regardless_of_http_status() {
		let reply: Reply<()> =
			classify(&response(200, r#"{"code":2,"msg":"token expired","data":null}"#))
				.expect("Expired envelope should classify cleanly.");

		assert!(matches!(reply, Reply::ExpiredCredential { code: CODE_TOKEN_EXPIRED, .. }));

		let reply: Reply<()> =
			classify(&response(500, r#"{"code":2,"msg":"token expired","data":null}"#))
				.expect("Expired envelope should classify cleanly at any status.");

		assert!(matches!(reply, Reply::ExpiredCredential { code: CODE_TOKEN_EXPIRED, .. }));
	}

	#[test]
	fn auth_error_code_requires_http_401() {
		let reply: Reply<()> =
			classify(&response(401, r#"{"code":1,"msg":"no permission","data":null}"#))
				.expect("401 auth-error envelope should classify cleanly.");

		assert!(matches!(reply, Reply::ExpiredCredential { code: CODE_AUTH_ERROR, .. }));

		let reply: Reply<()> =
			classify(&response(200, r#"{"code":1,"msg":"no permission","data":null}"#))
				.expect("200 auth-error envelope should classify cleanly.");

		assert!(matches!(reply, Reply::Business { code: CODE_AUTH_ERROR, .. }));
	}

	#[test]
	fn envelopes_without_a_data_field_still_classify() {
		let reply: Reply<()> = classify(&response(200, r#"{"code":2,"msg":"token expired"}"#))
			.expect("Failure envelopes may omit the data field entirely.");

		assert!(matches!(reply, Reply::ExpiredCredential { code: CODE_TOKEN_EXPIRED, .. }));
	}

	#[test]
	fn non_200_status_without_expiry_signal_is_http_failure() {
		let reply: Reply<()> = classify(&response(502, "upstream gone"))
			.expect("Unparseable non-200 bodies should classify as HTTP failures.");

		assert!(matches!(reply, Reply::Http { status: 502 }));
	}

	#[test]
	fn malformed_success_body_is_a_parse_error() {
		let result: Result<Reply<()>> = classify(&response(200, "not json"));

		assert!(matches!(result, Err(Error::EnvelopeParse { status: 200, .. })));
	}
}
