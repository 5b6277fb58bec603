//! Simple file-backed [`RefreshTokenStore`] for single-node deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{RefreshTokenRecord, UserId},
	store::{
		ActivityTouch, RecordTable, RefreshTokenStore, RevokeOutcome, RotateOutcome, StoreError,
		StoreFuture,
	},
};

/// Persists refresh records to a JSON file after each mutation.
///
/// Mutations are staged on a copy of the table and only become visible once the snapshot has
/// been synced and renamed into place, so a failed write changes neither disk nor memory.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<RecordTable>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<RecordTable, StoreError> {
		if !path.exists() {
			return Ok(RecordTable::default());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(RecordTable::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist(&self, contents: &RecordTable) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	/// Runs `mutate` on a staged copy and commits it when `commit` says the change is real.
	fn stage<T>(
		&self,
		mutate: impl FnOnce(&mut RecordTable) -> Result<T, StoreError>,
		commit: impl FnOnce(&T) -> bool,
	) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let mut staged = guard.clone();
		let outcome = mutate(&mut staged)?;

		if commit(&outcome) {
			self.persist(&staged)?;

			*guard = staged;
		}

		Ok(outcome)
	}
}
impl RefreshTokenStore for FileStore {
	fn insert(&self, record: RefreshTokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.stage(|table| table.insert(record), |_| true) })
	}

	fn find_live<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		Box::pin(async move { Ok(self.inner.read().find(token, false)) })
	}

	fn find_revoked<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		Box::pin(async move { Ok(self.inner.read().find(token, true)) })
	}

	fn rotate<'a>(
		&'a self,
		presented: &'a str,
		successor: RefreshTokenRecord,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, RotateOutcome> {
		Box::pin(async move {
			self.stage(
				|table| table.rotate(presented, successor, instant),
				|outcome| matches!(outcome, RotateOutcome::Rotated),
			)
		})
	}

	fn revoke<'a>(
		&'a self,
		token: &'a str,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, RevokeOutcome> {
		Box::pin(async move {
			self.stage(
				|table| Ok(table.revoke(token, instant)),
				|outcome| matches!(outcome, RevokeOutcome::Revoked(_)),
			)
		})
	}

	fn revoke_all_live_for<'a>(
		&'a self,
		user_id: &'a UserId,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Vec<RefreshTokenRecord>> {
		Box::pin(async move {
			self.stage(
				|table| Ok(table.revoke_all_live_for(user_id, instant)),
				|revoked| !revoked.is_empty(),
			)
		})
	}

	fn live_for<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, Vec<RefreshTokenRecord>> {
		Box::pin(async move { Ok(self.inner.read().live_for(user_id)) })
	}

	fn touch_activity(&self, touches: Vec<ActivityTouch>) -> StoreFuture<'_, usize> {
		Box::pin(async move {
			self.stage(|table| Ok(table.touch_activity(&touches)), |applied| *applied > 0)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use time::macros;
	use tokio::runtime::Builder;
	// self
	use super::*;

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"session_engine_file_store_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn build_record(token: &str) -> RefreshTokenRecord {
		let user = UserId::new("user-demo").expect("Failed to build user fixture.");

		RefreshTokenRecord::builder(user)
			.token(token)
			.created_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Failed to build file-store test record.")
	}

	#[test]
	fn rotation_survives_reopen() {
		let path = temp_path("rotation");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Builder::new_current_thread()
			.build()
			.expect("Failed to build Tokio runtime for file store test.");
		let first = build_record("refresh-1");
		let lineage = first.lineage;

		rt.block_on(store.insert(first)).expect("Failed to insert fixture record.");

		let outcome = rt
			.block_on(store.rotate(
				"refresh-1",
				build_record("refresh-2"),
				macros::datetime!(2025-01-01 00:10 UTC),
			))
			.expect("Rotation should succeed.");

		assert!(matches!(outcome, RotateOutcome::Rotated));

		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let retired = rt
			.block_on(reopened.find_revoked("refresh-1"))
			.expect("Failed to query revoked record.")
			.expect("Revoked record should persist across reopen.");
		let live = rt
			.block_on(reopened.find_live("refresh-2"))
			.expect("Failed to query live record.")
			.expect("Successor should persist across reopen.");

		assert_eq!(retired.lineage, lineage);
		assert_eq!(retired.revoked_at, Some(macros::datetime!(2025-01-01 00:10 UTC)));
		assert_eq!(retired.replaced_by, Some(live.token.fingerprint()));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn failed_persist_leaves_memory_untouched() {
		let dir = temp_path("blocked");
		let store = FileStore::open(dir.join("records.json")).expect("Failed to open store.");
		let rt = Builder::new_current_thread()
			.build()
			.expect("Failed to build Tokio runtime for file store test.");

		// Turn the snapshot path into a directory so the final rename fails.
		fs::create_dir_all(store.path()).expect("Failed to block snapshot path.");

		let err = rt
			.block_on(store.insert(build_record("refresh-1")))
			.expect_err("Insert should fail when the snapshot cannot be replaced.");

		assert!(matches!(err, StoreError::Backend { .. }));
		assert!(
			rt.block_on(store.find_live("refresh-1"))
				.expect("Lookup should still succeed.")
				.is_none()
		);

		fs::remove_dir_all(&dir).unwrap_or_else(|e| {
			panic!("Failed to remove temporary store directory {}: {e}", dir.display())
		});
	}
}
