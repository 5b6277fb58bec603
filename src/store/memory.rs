//! Thread-safe in-memory [`RefreshTokenStore`] implementation for single-process deployments
//! and tests.

// self
use crate::{
	_prelude::*,
	auth::{RefreshTokenRecord, UserId},
	store::{
		ActivityTouch, RecordTable, RefreshTokenStore, RevokeOutcome, RotateOutcome, StoreError,
		StoreFuture,
	},
};

type StoreMap = Arc<RwLock<RecordTable>>;

/// Thread-safe storage backend that keeps records in-process.
///
/// Every mutation holds the write lock for its whole read-check-write sequence, which gives the
/// per-record atomicity the rotation compare-and-set relies on.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of records ever stored, revoked ones included.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` if nothing has been stored yet.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn insert_now(map: StoreMap, record: RefreshTokenRecord) -> Result<(), StoreError> {
		map.write().insert(record)
	}

	fn find_now(map: StoreMap, token: &str, revoked: bool) -> Option<RefreshTokenRecord> {
		map.read().find(token, revoked)
	}

	fn rotate_now(
		map: StoreMap,
		presented: &str,
		successor: RefreshTokenRecord,
		instant: OffsetDateTime,
	) -> Result<RotateOutcome, StoreError> {
		map.write().rotate(presented, successor, instant)
	}
}
impl RefreshTokenStore for MemoryStore {
	fn insert(&self, record: RefreshTokenRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::insert_now(map, record) })
	}

	fn find_live<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::find_now(map, token, false)) })
	}

	fn find_revoked<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::find_now(map, token, true)) })
	}

	fn rotate<'a>(
		&'a self,
		presented: &'a str,
		successor: RefreshTokenRecord,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, RotateOutcome> {
		let map = self.0.clone();

		Box::pin(async move { Self::rotate_now(map, presented, successor, instant) })
	}

	fn revoke<'a>(
		&'a self,
		token: &'a str,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, RevokeOutcome> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().revoke(token, instant)) })
	}

	fn revoke_all_live_for<'a>(
		&'a self,
		user_id: &'a UserId,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Vec<RefreshTokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().revoke_all_live_for(user_id, instant)) })
	}

	fn live_for<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, Vec<RefreshTokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().live_for(user_id)) })
	}

	fn touch_activity(&self, touches: Vec<ActivityTouch>) -> StoreFuture<'_, usize> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().touch_activity(&touches)) })
	}
}
