//! Action-bound CSRF tokens
//!
//! A nonce is `HMAC-SHA256(secret, "<tick>|<action>|<session>")` encoded as
//! lowercase hex. The tick advances every half lifetime, and a nonce is
//! accepted during the tick it was issued in and the one after, so a token
//! stays valid for between one half and one full lifetime.

use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Default nonce lifetime (one day)
pub const DEFAULT_NONCE_LIFETIME: Duration = Duration::from_secs(86_400);

/// Longest nonce lifetime (one year); longer values are capped
pub const MAX_NONCE_LIFETIME: Duration = Duration::from_secs(31_536_000);

/// Length of a generated secret in bytes
pub const SECRET_LENGTH: usize = 32;

/// Length of an encoded nonce (hex-encoded SHA-256 output)
pub const NONCE_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NonceError {
	#[error("nonce is missing")]
	Missing,
	#[error("nonce has an invalid format")]
	Malformed,
	#[error("nonce does not match the action or has expired")]
	Invalid,
	#[error("nonce secret must not be empty")]
	EmptySecret,
}

/// Which tick a verified nonce was issued in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceAge {
	/// Issued during the current half lifetime
	Current,
	/// Issued during the previous half lifetime
	Previous,
}

/// Issues and verifies action-bound tokens
pub trait NonceService: Send + Sync {
	fn create_nonce(&self, action: &str, session: &str) -> String;

	fn verify_nonce(&self, nonce: &str, action: &str, session: &str) -> Result<NonceAge, NonceError>;
}

/// HMAC-SHA256 nonce service
///
/// # Examples
///
/// ```
/// use coblocks_core::nonce::{HmacNonce, NonceAge, NonceService};
///
/// let nonces = HmacNonce::new(b"a-secret-that-is-long-enough-for-hmac".to_vec()).unwrap();
/// let token = nonces.create_nonce("coblocks-form-submit", "visitor-1");
///
/// assert_eq!(
///     nonces.verify_nonce(&token, "coblocks-form-submit", "visitor-1"),
///     Ok(NonceAge::Current)
/// );
/// assert!(nonces.verify_nonce(&token, "other-action", "visitor-1").is_err());
/// ```
#[derive(Clone)]
pub struct HmacNonce {
	secret: Vec<u8>,
	lifetime: Duration,
}

impl std::fmt::Debug for HmacNonce {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HmacNonce")
			.field("secret", &"[redacted]")
			.field("lifetime", &self.lifetime)
			.finish()
	}
}

impl HmacNonce {
	pub fn new(secret: Vec<u8>) -> Result<Self, NonceError> {
		if secret.is_empty() {
			return Err(NonceError::EmptySecret);
		}
		Ok(Self {
			secret,
			lifetime: DEFAULT_NONCE_LIFETIME,
		})
	}

	/// Create a service with a freshly generated random secret
	///
	/// Nonces issued by one random service are rejected by any other.
	pub fn random() -> Self {
		Self {
			secret: generate_secret(),
			lifetime: DEFAULT_NONCE_LIFETIME,
		}
	}

	/// Set the nonce lifetime, clamped to two seconds..[`MAX_NONCE_LIFETIME`]
	pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
		self.lifetime = lifetime.clamp(Duration::from_secs(2), MAX_NONCE_LIFETIME);
		self
	}

	pub fn lifetime(&self) -> Duration {
		self.lifetime
	}

	/// Tick number for a unix timestamp
	pub fn tick(&self, unix_time: i64) -> i64 {
		let half = (self.lifetime.as_secs() / 2) as i64;
		unix_time.saturating_add(half - 1).div_euclid(half)
	}

	fn sign(&self, tick: i64, action: &str, session: &str) -> String {
		let mut mac =
			HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
		mac.update(format!("{}|{}|{}", tick, action, session).as_bytes());
		hex::encode(mac.finalize().into_bytes())
	}

	pub fn create_nonce_at(&self, action: &str, session: &str, unix_time: i64) -> String {
		self.sign(self.tick(unix_time), action, session)
	}

	pub fn verify_nonce_at(
		&self,
		nonce: &str,
		action: &str,
		session: &str,
		unix_time: i64,
	) -> Result<NonceAge, NonceError> {
		if nonce.is_empty() {
			return Err(NonceError::Missing);
		}
		if nonce.len() != NONCE_LENGTH || !nonce.bytes().all(|b| b.is_ascii_hexdigit()) {
			return Err(NonceError::Malformed);
		}

		let nonce = nonce.to_ascii_lowercase();
		let tick = self.tick(unix_time);

		let current = self.sign(tick, action, session);
		if bool::from(current.as_bytes().ct_eq(nonce.as_bytes())) {
			return Ok(NonceAge::Current);
		}

		let previous = self.sign(tick.saturating_sub(1), action, session);
		if bool::from(previous.as_bytes().ct_eq(nonce.as_bytes())) {
			return Ok(NonceAge::Previous);
		}

		Err(NonceError::Invalid)
	}
}

impl NonceService for HmacNonce {
	fn create_nonce(&self, action: &str, session: &str) -> String {
		self.create_nonce_at(action, session, Utc::now().timestamp())
	}

	fn verify_nonce(&self, nonce: &str, action: &str, session: &str) -> Result<NonceAge, NonceError> {
		self.verify_nonce_at(nonce, action, session, Utc::now().timestamp())
	}
}

/// Generate a random secret of [`SECRET_LENGTH`] bytes
pub fn generate_secret() -> Vec<u8> {
	let mut secret = vec![0u8; SECRET_LENGTH];
	rand::thread_rng().fill_bytes(&mut secret);
	secret
}
