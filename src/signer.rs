//! Stateless HS256 access token issuance and validation.

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;
// self
use crate::{
	_prelude::*,
	auth::{Identity, TokenSecret, UserId},
	config::SigningConfig,
};

/// Claims carried by every access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
	/// Account identifier.
	pub sub: UserId,
	/// Account email.
	pub email: String,
	/// Display name.
	pub name: String,
	/// Unique token identifier.
	pub jti: String,
	/// Issuer.
	pub iss: String,
	/// Audience.
	pub aud: String,
	/// Issued-at (unix seconds).
	pub iat: i64,
	/// Expiry (unix seconds).
	pub exp: i64,
}
impl AccessClaims {
	/// Expiry as an instant.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		OffsetDateTime::from_unix_timestamp(self.exp).ok()
	}
}

/// Freshly signed access token.
#[derive(Clone, Debug)]
pub struct SignedAccessToken {
	/// Compact JWS; callers must avoid logging it.
	pub token: TokenSecret,
	/// The token's `jti`.
	pub jti: String,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
}

/// Creates and verifies access tokens with a symmetric key held only by the service.
#[derive(Clone)]
pub struct TokenSigner {
	encoding: EncodingKey,
	decoding: DecodingKey,
	issuer: String,
	audience: String,
	ttl: Duration,
}
impl TokenSigner {
	/// Builds a signer from the signing section of the engine configuration.
	pub fn new(config: &SigningConfig) -> Self {
		let secret = config.secret.expose().as_bytes();

		Self {
			encoding: EncodingKey::from_secret(secret),
			decoding: DecodingKey::from_secret(secret),
			issuer: config.issuer.clone(),
			audience: config.audience.clone(),
			ttl: config.access_token_ttl(),
		}
	}

	/// Lifetime stamped into every token.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Signs a token for `identity`, expiring `ttl` after `now`.
	pub fn issue(&self, identity: &Identity, now: OffsetDateTime) -> Result<SignedAccessToken> {
		let expires_at = now + self.ttl;
		let claims = AccessClaims {
			sub: identity.id.clone(),
			email: identity.email.clone(),
			name: identity.display_name.clone(),
			jti: Uuid::new_v4().to_string(),
			iss: self.issuer.clone(),
			aud: self.audience.clone(),
			iat: now.unix_timestamp(),
			exp: expires_at.unix_timestamp(),
		};
		let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
			.map_err(Error::Signing)?;

		Ok(SignedAccessToken { token: TokenSecret::new(token), jti: claims.jti, expires_at })
	}

	/// Verifies signature, issuer, audience, and expiry (zero leeway) against `now`.
	pub fn validate(&self, token: &str, now: OffsetDateTime) -> Result<AccessClaims> {
		let claims = self.decode(token)?;

		if now.unix_timestamp() >= claims.exp {
			return Err(Error::InvalidAccessToken);
		}

		Ok(claims)
	}

	/// Verifies everything but expiry.
	///
	/// Only meant for identifying the bearer of a token that just lapsed; never authorize a
	/// request with the result.
	pub fn validate_allow_expired(&self, token: &str) -> Result<AccessClaims> {
		self.decode(token)
	}

	fn decode(&self, token: &str) -> Result<AccessClaims> {
		jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &self.validation())
			.map(|data| data.claims)
			.map_err(|_| Error::InvalidAccessToken)
	}

	fn validation(&self) -> Validation {
		let mut validation = Validation::new(Algorithm::HS256);

		// Expiry is judged against the injected clock in `validate`.
		validation.validate_exp = false;
		validation.leeway = 0;
		validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
		validation.set_issuer(&[&self.issuer]);
		validation.set_audience(&[&self.audience]);

		validation
	}
}
impl Debug for TokenSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSigner")
			.field("issuer", &self.issuer)
			.field("audience", &self.audience)
			.field("ttl", &self.ttl)
			.finish_non_exhaustive()
	}
}
