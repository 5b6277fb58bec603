//! Identity directory contract consumed by the session engine.
//!
//! Password hashing and account storage live behind [`IdentityDirectory`]; the engine only ever
//! sees validated [`Identity`] values.

// self
use crate::{_prelude::*, auth::UserId};

/// Boxed future returned by [`IdentityDirectory`] methods.
pub type DirectoryFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, DirectoryError>> + 'a + Send>>;

/// Account lookup and credential verification implemented by the host application.
pub trait IdentityDirectory
where
	Self: Send + Sync,
{
	/// Resolves an account by its identifier.
	fn find_user_by_id<'a>(&'a self, id: &'a UserId) -> DirectoryFuture<'a, Option<Identity>>;

	/// Resolves an account by its (normalized) email address.
	fn find_user_by_email<'a>(&'a self, email: &'a str)
	-> DirectoryFuture<'a, Option<Identity>>;

	/// Checks a plaintext password against the stored credential.
	fn verify_password<'a>(
		&'a self,
		identity: &'a Identity,
		password: &'a str,
	) -> DirectoryFuture<'a, bool>;

	/// Creates an account and returns its identity.
	fn create_user(&self, user: NewUser) -> DirectoryFuture<'_, Identity>;
}

/// Failure reported by an [`IdentityDirectory`] implementation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum DirectoryError {
	/// The directory rejected the new account.
	#[error("Account could not be created: {reason}.")]
	Rejected {
		/// Directory-supplied reason.
		reason: String,
	},
	/// Backend-level failure.
	#[error("Identity directory failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Immutable view of an account attached to issued tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	/// Account identifier (`sub`).
	pub id: UserId,
	/// Primary email address.
	pub email: String,
	/// Human-readable name shown in the UI.
	pub display_name: String,
}

/// Account payload handed to [`IdentityDirectory::create_user`].
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
	/// Normalized email address.
	pub email: String,
	/// Plaintext password; the directory owns hashing.
	pub password: String,
	/// Human-readable name.
	pub display_name: String,
}
impl Debug for NewUser {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("NewUser")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.field("display_name", &self.display_name)
			.finish()
	}
}

/// Errors raised while validating a [`Registration`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum RegistrationError {
	/// The email is blank or not shaped like an address.
	#[error("Email address is invalid.")]
	InvalidEmail,
	/// The password is shorter than the minimum.
	#[error("Password must be at least {min} characters.")]
	PasswordTooShort {
		/// Minimum accepted length.
		min: usize,
	},
	/// The confirmation does not match the password.
	#[error("Password confirmation does not match.")]
	PasswordMismatch,
	/// The display name is blank.
	#[error("Display name is required.")]
	MissingDisplayName,
	/// The display name exceeds the maximum length.
	#[error("Display name exceeds {max} characters.")]
	DisplayNameTooLong {
		/// Maximum accepted length.
		max: usize,
	},
}

/// Sign-up form submitted by a prospective user.
#[derive(Clone, Deserialize)]
pub struct Registration {
	/// Email address.
	pub email: String,
	/// Plaintext password.
	pub password: String,
	/// Repeated password.
	pub confirm_password: String,
	/// Human-readable name.
	pub display_name: String,
}
impl Registration {
	/// Minimum password length accepted at sign-up.
	pub const MIN_PASSWORD_LEN: usize = 6;
	/// Maximum display name length accepted at sign-up.
	pub const MAX_DISPLAY_NAME_LEN: usize = 100;

	/// Validates the form and produces the normalized account payload.
	pub fn validate(self) -> Result<NewUser, RegistrationError> {
		let email = normalize_email(&self.email);

		if !looks_like_email(&email) {
			return Err(RegistrationError::InvalidEmail);
		}
		if self.password.chars().count() < Self::MIN_PASSWORD_LEN {
			return Err(RegistrationError::PasswordTooShort { min: Self::MIN_PASSWORD_LEN });
		}
		if self.password != self.confirm_password {
			return Err(RegistrationError::PasswordMismatch);
		}

		let display_name = self.display_name.trim();

		if display_name.is_empty() {
			return Err(RegistrationError::MissingDisplayName);
		}
		if display_name.chars().count() > Self::MAX_DISPLAY_NAME_LEN {
			return Err(RegistrationError::DisplayNameTooLong { max: Self::MAX_DISPLAY_NAME_LEN });
		}

		Ok(NewUser { email, password: self.password, display_name: display_name.to_owned() })
	}
}
impl Debug for Registration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Registration")
			.field("email", &self.email)
			.field("display_name", &self.display_name)
			.finish_non_exhaustive()
	}
}

/// Trims and lowercases an email address for lookups.
pub fn normalize_email(email: &str) -> String {
	email.trim().to_lowercase()
}

fn looks_like_email(email: &str) -> bool {
	match email.split_once('@') {
		Some((local, domain)) =>
			!local.is_empty()
				&& !domain.is_empty()
				&& !domain.contains('@')
				&& !email.chars().any(char::is_whitespace),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn registration() -> Registration {
		Registration {
			email: "  Ada@Example.com ".into(),
			password: "hunter22".into(),
			confirm_password: "hunter22".into(),
			display_name: " Ada Lovelace ".into(),
		}
	}

	#[test]
	fn valid_registration_is_normalized() {
		let user = registration().validate().expect("Registration fixture should validate.");

		assert_eq!(user.email, "ada@example.com");
		assert_eq!(user.display_name, "Ada Lovelace");
		assert_eq!(user.password, "hunter22");
	}

	#[test]
	fn invalid_fields_are_reported() {
		let mut bad_email = registration();

		bad_email.email = "not-an-email".into();

		assert_eq!(bad_email.validate().unwrap_err(), RegistrationError::InvalidEmail);

		let mut short = registration();

		short.password = "abc".into();
		short.confirm_password = "abc".into();

		assert_eq!(short.validate().unwrap_err(), RegistrationError::PasswordTooShort { min: 6 });

		let mut mismatch = registration();

		mismatch.confirm_password = "hunter23".into();

		assert_eq!(mismatch.validate().unwrap_err(), RegistrationError::PasswordMismatch);

		let mut nameless = registration();

		nameless.display_name = "   ".into();

		assert_eq!(nameless.validate().unwrap_err(), RegistrationError::MissingDisplayName);

		let mut long_name = registration();

		long_name.display_name = "x".repeat(101);

		assert_eq!(
			long_name.validate().unwrap_err(),
			RegistrationError::DisplayNameTooLong { max: 100 }
		);
	}

	#[test]
	fn debug_output_redacts_passwords() {
		let rendered = format!("{:?}", registration());

		assert!(!rendered.contains("hunter22"));

		let user = registration().validate().expect("Registration fixture should validate.");

		assert!(!format!("{user:?}").contains("hunter22"));
	}
}
