//! Storage contracts and built-in store implementations for refresh token records.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{RefreshTokenRecord, UserId},
};

/// Boxed future returned by [`RefreshTokenStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for refresh token records.
///
/// Every read-modify-write method must be atomic with respect to every other method: a
/// concurrent caller observes a record either entirely before or entirely after a mutation.
pub trait RefreshTokenStore
where
	Self: Send + Sync,
{
	/// Inserts a brand-new record; an existing record with the same token is a fatal collision.
	fn insert(&self, record: RefreshTokenRecord) -> StoreFuture<'_, ()>;

	/// Fetches the unrevoked record matching `token`, expired or not.
	fn find_live<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshTokenRecord>>;

	/// Fetches the revoked record matching `token`.
	fn find_revoked<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshTokenRecord>>;

	/// Revokes `presented` and inserts `successor` as one unit, if `presented` is still unrevoked.
	fn rotate<'a>(
		&'a self,
		presented: &'a str,
		successor: RefreshTokenRecord,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, RotateOutcome>;

	/// Revokes a single record if it is still unrevoked.
	fn revoke<'a>(&'a self, token: &'a str, instant: OffsetDateTime)
	-> StoreFuture<'a, RevokeOutcome>;

	/// Revokes every unrevoked record owned by `user_id`, returning the records it revoked.
	fn revoke_all_live_for<'a>(
		&'a self,
		user_id: &'a UserId,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Vec<RefreshTokenRecord>>;

	/// Lists every unrevoked record owned by `user_id`.
	fn live_for<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, Vec<RefreshTokenRecord>>;

	/// Applies activity updates, skipping records revoked since they were read.
	///
	/// Each touch is applied whole or not at all; touches do not need to be atomic with each
	/// other. Returns how many were applied.
	fn touch_activity(&self, touches: Vec<ActivityTouch>) -> StoreFuture<'_, usize>;
}

/// Result of a rotation compare-and-set.
#[derive(Clone, Debug)]
pub enum RotateOutcome {
	/// The presented record was revoked and the successor inserted.
	Rotated,
	/// The presented record had already been revoked; nothing changed.
	AlreadyRevoked(RefreshTokenRecord),
	/// No record matched the presented token.
	Missing,
}

/// Result of a single-record revocation.
#[derive(Clone, Debug)]
pub enum RevokeOutcome {
	/// The record was live and is now revoked.
	Revoked(RefreshTokenRecord),
	/// The record had already been revoked.
	AlreadyRevoked,
	/// No record matched the token.
	Missing,
}

/// Activity-policy update for one record.
#[derive(Clone, PartialEq, Eq)]
pub struct ActivityTouch {
	/// Token of the record to update.
	pub token: String,
	/// New last-activity instant.
	pub last_activity_at: OffsetDateTime,
	/// New expiry instant.
	pub expires_at: OffsetDateTime,
	/// New rotation counter.
	pub refresh_count: u32,
	/// New extension counter.
	pub activity_extension_count: u32,
}
impl ActivityTouch {
	/// Writes the touch into `record`; the caller guarantees the tokens match.
	pub fn apply(&self, record: &mut RefreshTokenRecord) {
		record.last_activity_at = self.last_activity_at;
		record.expires_at = self.expires_at;
		record.refresh_count = self.refresh_count;
		record.activity_extension_count = self.activity_extension_count;
	}
}
impl Debug for ActivityTouch {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ActivityTouch")
			.field("token", &crate::auth::fingerprint(&self.token))
			.field("last_activity_at", &self.last_activity_at)
			.field("expires_at", &self.expires_at)
			.field("refresh_count", &self.refresh_count)
			.field("activity_extension_count", &self.activity_extension_count)
			.finish()
	}
}

/// Error type produced by [`RefreshTokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// A freshly generated token collided with an existing record.
	#[error("Refresh token collision detected; the random source is not trustworthy.")]
	DuplicateToken,
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// In-process record table shared by the built-in stores.
///
/// Records are keyed by token with a secondary index from user to tokens; the index covers
/// every record of the user, revoked or not, because records are never deleted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<RefreshTokenRecord>", into = "Vec<RefreshTokenRecord>")]
pub(crate) struct RecordTable {
	records: HashMap<String, RefreshTokenRecord>,
	by_user: HashMap<UserId, BTreeSet<String>>,
}
impl RecordTable {
	pub(crate) fn insert(&mut self, record: RefreshTokenRecord) -> Result<(), StoreError> {
		let token = record.token.expose().to_owned();

		if self.records.contains_key(&token) {
			return Err(StoreError::DuplicateToken);
		}

		self.by_user.entry(record.user_id.clone()).or_default().insert(token.clone());
		self.records.insert(token, record);

		Ok(())
	}

	pub(crate) fn find(&self, token: &str, revoked: bool) -> Option<RefreshTokenRecord> {
		self.records.get(token).filter(|record| record.is_revoked() == revoked).cloned()
	}

	pub(crate) fn rotate(
		&mut self,
		presented: &str,
		successor: RefreshTokenRecord,
		instant: OffsetDateTime,
	) -> Result<RotateOutcome, StoreError> {
		match self.records.get(presented) {
			Some(record) if record.is_revoked() =>
				return Ok(RotateOutcome::AlreadyRevoked(record.clone())),
			Some(_) => {},
			None => return Ok(RotateOutcome::Missing),
		}

		let token = successor.token.clone();

		self.insert(successor)?;

		if let Some(record) = self.records.get_mut(presented) {
			record.retire(instant, &token);
		}

		Ok(RotateOutcome::Rotated)
	}

	pub(crate) fn revoke(&mut self, token: &str, instant: OffsetDateTime) -> RevokeOutcome {
		let Some(record) = self.records.get_mut(token) else {
			return RevokeOutcome::Missing;
		};

		if record.revoke(instant) {
			RevokeOutcome::Revoked(record.clone())
		} else {
			RevokeOutcome::AlreadyRevoked
		}
	}

	pub(crate) fn revoke_all_live_for(
		&mut self,
		user_id: &UserId,
		instant: OffsetDateTime,
	) -> Vec<RefreshTokenRecord> {
		let Some(tokens) = self.by_user.get(user_id) else {
			return Vec::new();
		};
		let mut revoked = Vec::new();

		for token in tokens {
			let Some(record) = self.records.get_mut(token) else { continue };

			if record.revoke(instant) {
				revoked.push(record.clone());
			}
		}

		revoked
	}

	pub(crate) fn live_for(&self, user_id: &UserId) -> Vec<RefreshTokenRecord> {
		self.by_user
			.get(user_id)
			.into_iter()
			.flatten()
			.filter_map(|token| self.records.get(token))
			.filter(|record| !record.is_revoked())
			.cloned()
			.collect()
	}

	pub(crate) fn touch_activity(&mut self, touches: &[ActivityTouch]) -> usize {
		let mut applied = 0;

		for touch in touches {
			match self.records.get_mut(&touch.token) {
				Some(record) if !record.is_revoked() => {
					touch.apply(record);

					applied += 1;
				},
				_ => {},
			}
		}

		applied
	}

	pub(crate) fn len(&self) -> usize {
		self.records.len()
	}
}
impl From<Vec<RefreshTokenRecord>> for RecordTable {
	fn from(records: Vec<RefreshTokenRecord>) -> Self {
		let mut table = Self::default();

		for record in records {
			let token = record.token.expose().to_owned();

			table.by_user.entry(record.user_id.clone()).or_default().insert(token.clone());
			table.records.insert(token, record);
		}

		table
	}
}
impl From<RecordTable> for Vec<RefreshTokenRecord> {
	fn from(table: RecordTable) -> Self {
		let mut records: Vec<_> = table.records.into_values().collect();

		records.sort_by(|a, b| a.created_at.cmp(&b.created_at));

		records
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::error::Error;

	fn record(user: &str, token: &str) -> RefreshTokenRecord {
		RefreshTokenRecord::builder(UserId::new(user).expect("User fixture should be valid."))
			.token(token)
			.created_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Record fixture should build.")
	}

	#[test]
	fn store_error_converts_into_engine_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let engine_error: Error = store_error.clone().into();

		assert!(matches!(engine_error, Error::Storage(_)));
		assert!(engine_error.to_string().contains("database unreachable"));

		let source = StdError::source(&engine_error)
			.expect("Engine error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn table_rejects_duplicate_tokens() {
		let mut table = RecordTable::default();

		table.insert(record("u-1", "t-1")).expect("First insert should succeed.");

		assert_eq!(table.insert(record("u-2", "t-1")), Err(StoreError::DuplicateToken));
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn rotation_collision_leaves_the_presented_record_live() {
		let mut table = RecordTable::default();

		table.insert(record("u-1", "t-1")).expect("Insert should succeed.");
		table.insert(record("u-1", "t-2")).expect("Insert should succeed.");

		let outcome =
			table.rotate("t-1", record("u-1", "t-2"), macros::datetime!(2025-01-01 00:05 UTC));

		assert_eq!(outcome.unwrap_err(), StoreError::DuplicateToken);
		assert!(table.find("t-1", false).is_some());
	}

	#[test]
	fn snapshot_conversion_rebuilds_the_user_index() {
		let mut table = RecordTable::default();

		table.insert(record("u-1", "t-1")).expect("Insert should succeed.");
		table.insert(record("u-1", "t-2")).expect("Insert should succeed.");
		table.insert(record("u-2", "t-3")).expect("Insert should succeed.");

		let payload = serde_json::to_string(&table).expect("Table should serialize.");
		let restored: RecordTable =
			serde_json::from_str(&payload).expect("Table should deserialize.");
		let user = UserId::new("u-1").expect("User fixture should be valid.");

		assert_eq!(restored.len(), 3);
		assert_eq!(restored.live_for(&user).len(), 2);
	}
}
