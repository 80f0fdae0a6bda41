//! Temporary STS credentials and their time-boxed cache.

// self
use crate::{_prelude::*, auth::Secret};

/// Soft TTL applied to cached STS credentials.
///
/// The backing credentials hard-expire after 60 minutes; caching for 55
/// leaves margin so a call started near the boundary never races server-side
/// expiry.
pub const STS_SOFT_TTL: Duration = Duration::minutes(55);

/// One temporary credential snapshot issued by the `/sts` endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StsCredentials {
	/// Scoped access key identifier.
	pub access_key_id: String,
	/// Access key secret; callers must avoid logging it.
	pub access_key_secret: Secret,
	/// Session token bound to the key pair.
	pub security_token: Secret,
	/// Instant the snapshot was fetched; freshness is measured from here.
	pub fetched_at: OffsetDateTime,
}
impl StsCredentials {
	pub(crate) fn from_payload(payload: StsPayload, fetched_at: OffsetDateTime) -> Self {
		Self {
			access_key_id: payload.access_key_id,
			access_key_secret: Secret::new(payload.access_key_secret),
			security_token: Secret::new(payload.security_token),
			fetched_at,
		}
	}

	/// Returns how long ago this snapshot was fetched.
	pub fn age(&self, now: OffsetDateTime) -> Duration {
		now - self.fetched_at
	}
}

/// Wire payload of the `/sts` endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct StsPayload {
	#[serde(rename = "AccessKeyId")]
	pub access_key_id: String,
	#[serde(rename = "AccessKeySecret")]
	pub access_key_secret: String,
	#[serde(rename = "SecurityToken")]
	pub security_token: String,
}

/// Time-boxed cache holding at most one credential snapshot.
///
/// The cache is only ever mutated through [`store`](StsCache::store) and
/// [`invalidate`](StsCache::invalidate); acquisition and the auth-retry path
/// own those calls.
#[derive(Debug)]
pub struct StsCache {
	ttl: Duration,
	slot: RwLock<Option<StsCredentials>>,
}
impl StsCache {
	/// Creates an empty cache with the provided soft TTL.
	pub fn new(ttl: Duration) -> Self {
		Self { ttl, slot: RwLock::new(None) }
	}

	/// Returns the configured soft TTL.
	pub fn soft_ttl(&self) -> Duration {
		self.ttl
	}

	/// Returns the cached snapshot while it is strictly younger than the
	/// soft TTL; a snapshot exactly at the boundary is already stale.
	pub fn fresh(&self, now: OffsetDateTime) -> Option<StsCredentials> {
		self.slot
			.read()
			.as_ref()
			.filter(|credentials| credentials.age(now) < self.ttl)
			.cloned()
	}

	/// Replaces the cached snapshot.
	pub fn store(&self, credentials: StsCredentials) {
		*self.slot.write() = Some(credentials);
	}

	/// Drops the cached snapshot so the next acquisition fetches.
	pub fn invalidate(&self) {
		*self.slot.write() = None;
	}
}
impl Default for StsCache {
	fn default() -> Self {
		Self::new(STS_SOFT_TTL)
	}
}
