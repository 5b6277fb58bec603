//! Identifiers for accounts and refresh token lineages.

// std
use std::{borrow::Borrow, ops::Deref};
// crates.io
use uuid::Uuid;
// self
use crate::_prelude::*;

const USER_ID_MAX_LEN: usize = 128;

/// Error returned when a user id is malformed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum UserIdError {
	/// The id was empty.
	#[error("User id cannot be empty.")]
	Empty,
	/// The id contains whitespace.
	#[error("User id contains whitespace.")]
	ContainsWhitespace,
	/// The id is longer than the directory keys we accept.
	#[error("User id exceeds {max} bytes.")]
	TooLong {
		/// Maximum permitted length in bytes.
		max: usize,
	},
}

/// Opaque identifier of an account owned by the identity directory.
///
/// The engine never interprets the value; it only keys records and audit events by it.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);
impl UserId {
	/// Validates `value` as a directory key.
	pub fn new(value: impl Into<String>) -> Result<Self, UserIdError> {
		Self::try_from(value.into())
	}
}
impl Deref for UserId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for UserId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for UserId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<UserId> for String {
	fn from(value: UserId) -> Self {
		value.0
	}
}
impl TryFrom<String> for UserId {
	type Error = UserIdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		if value.is_empty() {
			return Err(UserIdError::Empty);
		}
		if value.chars().any(char::is_whitespace) {
			return Err(UserIdError::ContainsWhitespace);
		}
		if value.len() > USER_ID_MAX_LEN {
			return Err(UserIdError::TooLong { max: USER_ID_MAX_LEN });
		}

		Ok(Self(value))
	}
}
impl FromStr for UserId {
	type Err = UserIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for UserId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "User({})", self.0)
	}
}
impl Display for UserId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Identifier shared by every refresh record rotated from a single login.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineageId(Uuid);
impl LineageId {
	/// Starts a new lineage.
	pub fn generate() -> Self {
		Self(Uuid::new_v4())
	}

	/// Returns the underlying UUID.
	pub fn as_uuid(&self) -> Uuid {
		self.0
	}
}
impl Debug for LineageId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Lineage({})", self.0)
	}
}
impl Display for LineageId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		Display::fmt(&self.0, f)
	}
}
