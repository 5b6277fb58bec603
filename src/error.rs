//! Engine-level error types shared across the signer, stores, and session flows.

// self
use crate::_prelude::*;

/// Engine-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical engine error exposed by public APIs.
///
/// Variants stay distinct so logs and tests can tell them apart; callers crossing a trust
/// boundary should render [`Error::public`] instead of the variant itself.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure; the attempted operation did not take effect.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Identity directory failure.
	#[error(transparent)]
	Directory(#[from] crate::auth::DirectoryError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Registration input was rejected.
	#[error(transparent)]
	Registration(#[from] crate::auth::RegistrationError),

	/// No refresh record matched the presented token.
	#[error("Refresh token is not recognized.")]
	InvalidToken,
	/// A revoked refresh token was presented again.
	#[error("Refresh token was already consumed; every session of the user has been revoked.")]
	ReplayDetected,
	/// The refresh record's validity window has passed.
	#[error("Refresh token has expired.")]
	Expired,
	/// The lineage rotated as many times as its budget allows.
	#[error("Session expired due to inactivity.")]
	RenewalBudgetExhausted,
	/// The access token failed signature, issuer, audience, or expiry checks.
	#[error("Access token is invalid.")]
	InvalidAccessToken,
	/// Email or password did not match.
	#[error("Invalid email or password.")]
	InvalidCredentials,
	/// Registration collided with an existing account.
	#[error("A user with this email already exists.")]
	UserExists,
	/// Access token could not be signed.
	#[error("Access token could not be signed.")]
	Signing(#[source] jsonwebtoken::errors::Error),
}
impl Error {
	/// Returns `true` for every outcome that should send the caller back to the login page.
	pub fn is_unauthorized(&self) -> bool {
		matches!(
			self,
			Self::InvalidToken
				| Self::ReplayDetected
				| Self::Expired
				| Self::RenewalBudgetExhausted
				| Self::InvalidAccessToken
				| Self::InvalidCredentials
		)
	}

	/// Collapses the error into the coarse outcome safe to show to a client.
	pub fn public(&self) -> PublicError {
		match self {
			e if e.is_unauthorized() => PublicError::Unauthorized,
			Self::UserExists => PublicError::Conflict,
			Self::Registration(_) => PublicError::BadRequest,
			_ => PublicError::Unavailable,
		}
	}
}

/// Client-facing rendering of [`Error`] that never reveals which rejection occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum PublicError {
	/// Any token or credential rejection.
	#[error("Unauthorized, please re-authenticate.")]
	Unauthorized,
	/// The resource already exists.
	#[error("The request conflicts with an existing account.")]
	Conflict,
	/// The request payload was malformed.
	#[error("The request is invalid.")]
	BadRequest,
	/// A backing service failed.
	#[error("The service is temporarily unavailable.")]
	Unavailable,
}

/// Configuration and validation failures raised by the engine.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration payload could not be parsed.
	#[error("Session configuration is malformed.")]
	Parse {
		/// Structured parsing failure including the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The HMAC secret is too short for HS256.
	#[error("Signing secret must be at least {min} bytes.")]
	WeakSigningSecret {
		/// Minimum accepted length in bytes.
		min: usize,
	},
	/// A required text setting is blank.
	#[error("The `{field}` setting cannot be empty.")]
	Empty {
		/// Setting name.
		field: &'static str,
	},
	/// Refresh record builder validation failed.
	#[error("Unable to build refresh token record.")]
	RecordBuild(#[from] crate::auth::RefreshTokenRecordBuilderError),
	/// A lifetime or budget setting is zero.
	#[error("The `{field}` setting must be positive.")]
	NonPositive {
		/// Setting name.
		field: &'static str,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn unauthorized_cases_share_one_public_message() {
		let cases = [
			Error::InvalidToken,
			Error::ReplayDetected,
			Error::Expired,
			Error::RenewalBudgetExhausted,
			Error::InvalidAccessToken,
			Error::InvalidCredentials,
		];

		for case in cases {
			assert!(case.is_unauthorized());
			assert_eq!(case.public(), PublicError::Unauthorized);
			assert_eq!(case.public().to_string(), "Unauthorized, please re-authenticate.");
		}
	}

	#[test]
	fn storage_failures_are_not_unauthorized() {
		let error: Error = StoreError::Backend { message: "disk full".into() }.into();

		assert!(!error.is_unauthorized());
		assert_eq!(error.public(), PublicError::Unavailable);
		assert!(error.to_string().contains("disk full"));
	}

	#[test]
	fn conflicts_and_bad_input_map_to_distinct_public_errors() {
		assert_eq!(Error::UserExists.public(), PublicError::Conflict);
		assert_eq!(
			Error::Registration(crate::auth::RegistrationError::PasswordTooShort { min: 6 })
				.public(),
			PublicError::BadRequest
		);
	}
}
