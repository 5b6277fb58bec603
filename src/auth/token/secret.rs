//! Secure token secret wrapper that redacts sensitive material.

// crates.io
use base64::{
	Engine as _,
	engine::general_purpose::{STANDARD, STANDARD_NO_PAD},
};
use rand::RngCore;
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Number of random bytes behind every refresh token (512 bits).
pub const REFRESH_SECRET_BYTES: usize = 64;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Draws [`REFRESH_SECRET_BYTES`] bytes from the thread-local CSPRNG and encodes them as
	/// padded standard base64.
	pub fn generate() -> Self {
		let mut bytes = [0_u8; REFRESH_SECRET_BYTES];

		rand::rng().fill_bytes(&mut bytes);

		Self(STANDARD.encode(bytes))
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Base64 (no padding) SHA-256 digest of the secret, safe to log or persist as a link.
	pub fn fingerprint(&self) -> String {
		fingerprint(&self.0)
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Fingerprints a raw token value the same way [`TokenSecret::fingerprint`] does.
pub fn fingerprint(raw: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(raw.as_bytes());

	STANDARD_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn generated_secrets_carry_512_bits() {
		let secret = TokenSecret::generate();
		let decoded =
			STANDARD.decode(secret.expose()).expect("Generated secret should be valid base64.");

		assert_eq!(decoded.len(), REFRESH_SECRET_BYTES);
		assert_eq!(secret.expose().len(), 88);
		assert_ne!(secret, TokenSecret::generate());
	}

	#[test]
	fn fingerprint_is_stable_and_hides_the_secret() {
		let secret = TokenSecret::new("refresh-value");

		assert_eq!(secret.fingerprint(), fingerprint("refresh-value"));
		assert!(!secret.fingerprint().contains("refresh-value"));
		assert_ne!(secret.fingerprint(), TokenSecret::new("other").fingerprint());
	}
}
