#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use parking_lot::Mutex;
use time::{OffsetDateTime, macros};
use tokio::sync::{Notify, Semaphore};
// self
use session_engine::{
	auth::{
		DirectoryError, DirectoryFuture, Identity, IdentityDirectory, NewUser, RefreshTokenRecord,
		UserId,
	},
	clock::ManualClock,
	config::SessionConfig,
	session::{AuditError, AuditSink, SecurityEvent, SessionManager},
	store::{
		ActivityTouch, MemoryStore, RefreshTokenStore, RevokeOutcome, RotateOutcome, StoreError,
		StoreFuture,
	},
};

pub const SIGNING_SECRET: &str = "integration-signing-secret-0123456789";
pub const ISSUER: &str = "session-engine-it";
pub const AUDIENCE: &str = "session-engine-it-clients";
pub const PASSWORD: &str = "correct horse";

pub fn start() -> OffsetDateTime {
	macros::datetime!(2025-06-01 08:00 UTC)
}

pub fn config() -> SessionConfig {
	SessionConfig::new(SIGNING_SECRET, ISSUER, AUDIENCE)
}

pub fn user_id(value: &str) -> UserId {
	UserId::new(value).expect("User identifier fixture should be valid.")
}

/// In-memory directory with one shared password for every account.
#[derive(Debug, Default)]
pub struct StaticDirectory {
	users: Mutex<Vec<Identity>>,
}
impl StaticDirectory {
	pub fn with_users(names: &[&str]) -> Self {
		let users = names
			.iter()
			.map(|name| Identity {
				id: user_id(name),
				email: format!("{name}@example.com"),
				display_name: name.to_string(),
			})
			.collect();

		Self { users: Mutex::new(users) }
	}

	pub fn identity(&self, name: &str) -> Identity {
		self.users
			.lock()
			.iter()
			.find(|identity| &*identity.id == name)
			.cloned()
			.expect("Directory fixture should contain the requested user.")
	}

	pub fn remove(&self, name: &str) {
		self.users.lock().retain(|identity| &*identity.id != name);
	}
}
impl IdentityDirectory for StaticDirectory {
	fn find_user_by_id<'a>(&'a self, id: &'a UserId) -> DirectoryFuture<'a, Option<Identity>> {
		Box::pin(async move {
			Ok(self.users.lock().iter().find(|identity| &identity.id == id).cloned())
		})
	}

	fn find_user_by_email<'a>(
		&'a self,
		email: &'a str,
	) -> DirectoryFuture<'a, Option<Identity>> {
		Box::pin(async move {
			Ok(self.users.lock().iter().find(|identity| identity.email == email).cloned())
		})
	}

	fn verify_password<'a>(
		&'a self,
		_: &'a Identity,
		password: &'a str,
	) -> DirectoryFuture<'a, bool> {
		Box::pin(async move { Ok(password == PASSWORD) })
	}

	fn create_user(&self, user: NewUser) -> DirectoryFuture<'_, Identity> {
		Box::pin(async move {
			let mut users = self.users.lock();
			let id = UserId::new(format!("user-{}", users.len() + 1))
				.map_err(|e| DirectoryError::Backend { message: e.to_string() })?;
			let identity = Identity { id, email: user.email, display_name: user.display_name };

			users.push(identity.clone());

			Ok(identity)
		})
	}
}

/// Audit sink that keeps every event for inspection.
#[derive(Debug, Default)]
pub struct RecordingAuditSink(Mutex<Vec<SecurityEvent>>);
impl RecordingAuditSink {
	pub fn events(&self) -> Vec<SecurityEvent> {
		self.0.lock().clone()
	}
}
impl AuditSink for RecordingAuditSink {
	fn emit(&self, event: &SecurityEvent) -> Result<(), AuditError> {
		self.0.lock().push(event.clone());

		Ok(())
	}
}

/// Audit sink that rejects every event.
#[derive(Debug, Default)]
pub struct FailingAuditSink;
impl AuditSink for FailingAuditSink {
	fn emit(&self, _: &SecurityEvent) -> Result<(), AuditError> {
		Err(AuditError::new("audit backend offline"))
	}
}

/// Store wrapper whose bulk operations fail while reads and rotations pass through.
#[derive(Clone, Debug, Default)]
pub struct FlakyStore {
	pub inner: MemoryStore,
}
impl FlakyStore {
	fn offline() -> StoreError {
		StoreError::Backend { message: "store offline".into() }
	}
}
impl RefreshTokenStore for FlakyStore {
	fn insert(&self, record: RefreshTokenRecord) -> StoreFuture<'_, ()> {
		self.inner.insert(record)
	}

	fn find_live<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		self.inner.find_live(token)
	}

	fn find_revoked<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		self.inner.find_revoked(token)
	}

	fn rotate<'a>(
		&'a self,
		presented: &'a str,
		successor: RefreshTokenRecord,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, RotateOutcome> {
		self.inner.rotate(presented, successor, instant)
	}

	fn revoke<'a>(
		&'a self,
		token: &'a str,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, RevokeOutcome> {
		self.inner.revoke(token, instant)
	}

	fn revoke_all_live_for<'a>(
		&'a self,
		_: &'a UserId,
		_: OffsetDateTime,
	) -> StoreFuture<'a, Vec<RefreshTokenRecord>> {
		Box::pin(async move { Err(Self::offline()) })
	}

	fn live_for<'a>(&'a self, _: &'a UserId) -> StoreFuture<'a, Vec<RefreshTokenRecord>> {
		Box::pin(async move { Err(Self::offline()) })
	}

	fn touch_activity(&self, _: Vec<ActivityTouch>) -> StoreFuture<'_, usize> {
		Box::pin(async move { Err(Self::offline()) })
	}
}

/// Store wrapper whose `live_for` parks until the gate is opened.
#[derive(Clone, Debug)]
pub struct GatedStore {
	pub inner: MemoryStore,
	entered: Arc<Notify>,
	gate: Arc<Semaphore>,
}
impl GatedStore {
	pub fn closed() -> Self {
		Self {
			inner: MemoryStore::default(),
			entered: Arc::new(Notify::new()),
			gate: Arc::new(Semaphore::new(0)),
		}
	}

	/// Resolves once some caller is parked in `live_for`.
	pub async fn wait_until_entered(&self) {
		self.entered.notified().await;
	}

	/// Lets parked and future `live_for` calls through.
	pub fn open(&self) {
		self.gate.add_permits(1);
	}
}
impl RefreshTokenStore for GatedStore {
	fn insert(&self, record: RefreshTokenRecord) -> StoreFuture<'_, ()> {
		self.inner.insert(record)
	}

	fn find_live<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		self.inner.find_live(token)
	}

	fn find_revoked<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		self.inner.find_revoked(token)
	}

	fn rotate<'a>(
		&'a self,
		presented: &'a str,
		successor: RefreshTokenRecord,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, RotateOutcome> {
		self.inner.rotate(presented, successor, instant)
	}

	fn revoke<'a>(
		&'a self,
		token: &'a str,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, RevokeOutcome> {
		self.inner.revoke(token, instant)
	}

	fn revoke_all_live_for<'a>(
		&'a self,
		user_id: &'a UserId,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Vec<RefreshTokenRecord>> {
		self.inner.revoke_all_live_for(user_id, instant)
	}

	fn live_for<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, Vec<RefreshTokenRecord>> {
		Box::pin(async move {
			self.entered.notify_one();

			let _permit = self
				.gate
				.acquire()
				.await
				.map_err(|_| StoreError::Backend { message: "gate closed".into() })?;

			self.inner.live_for(user_id).await
		})
	}

	fn touch_activity(&self, touches: Vec<ActivityTouch>) -> StoreFuture<'_, usize> {
		self.inner.touch_activity(touches)
	}
}

/// Fully wired manager over a memory store and a manual clock.
pub struct Harness {
	pub manager: SessionManager,
	pub store: MemoryStore,
	pub directory: Arc<StaticDirectory>,
	pub clock: ManualClock,
	pub audit: Arc<RecordingAuditSink>,
}
impl Harness {
	pub fn new(users: &[&str]) -> Self {
		Self::with_config(config(), users)
	}

	pub fn with_config(config: SessionConfig, users: &[&str]) -> Self {
		let store = MemoryStore::default();
		let directory = Arc::new(StaticDirectory::with_users(users));
		let clock = ManualClock::new(start());
		let audit = Arc::new(RecordingAuditSink::default());
		let manager = SessionManager::new(config, Arc::new(store.clone()), directory.clone())
			.expect("Session manager fixture should build.")
			.with_clock(Arc::new(clock.clone()))
			.with_audit_sink(audit.clone());

		Self { manager, store, directory, clock, audit }
	}

	pub async fn login(&self, name: &str) -> session_engine::session::AuthTokens {
		self.manager
			.login(&format!("{name}@example.com"), PASSWORD)
			.await
			.expect("Login fixture should succeed.")
	}

	pub async fn live_count(&self, name: &str) -> usize {
		self.store
			.live_for(&user_id(name))
			.await
			.expect("Listing live records should succeed.")
			.len()
	}
}
