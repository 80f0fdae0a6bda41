//! Credential models shared by both coordinators.

pub mod secret;

pub use secret::*;

// self
use crate::_prelude::*;

/// Primary-API credential pair issued at login.
///
/// The access token rides on every authorized request; the refresh token is
/// only ever sent to the refresh endpoint. Both members live and die
/// together: created on successful login, destroyed together on refresh
/// failure or explicit logout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
	/// Short-lived bearer token attached to outgoing calls.
	pub access_token: Secret,
	/// Longer-lived token exchanged at the refresh endpoint.
	pub refresh_token: Secret,
}
impl CredentialSet {
	/// Builds a credential pair from raw token strings.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: Secret::new(access_token),
			refresh_token: Secret::new(refresh_token),
		}
	}
}

/// Well-known credential-store keys used by the relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialKey {
	/// Key under which the bearer access token is persisted.
	AccessToken,
	/// Key under which the refresh token is persisted.
	RefreshToken,
}
impl CredentialKey {
	/// Returns the stable storage key string.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialKey::AccessToken => "access_token",
			CredentialKey::RefreshToken => "refresh_token",
		}
	}
}
impl Display for CredentialKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
