//! Session lifecycle orchestration: issuance, rotation, replay containment, and activity
//! extension on top of a [`RefreshTokenStore`].
//!
//! [`SessionManager`] owns the signer, store, identity directory, clock, and audit sink so the
//! individual flows can focus on their state transitions. Everything it needs is injected at
//! construction; nothing is read from ambient global state.

pub mod activity;
pub mod replay;
pub mod rotation;
pub mod tracker;

pub use activity::*;
pub use replay::*;
pub use rotation::*;
pub use tracker::*;

// self
use crate::{
	_prelude::*,
	auth::{
		Carryover, Identity, IdentityDirectory, RefreshTokenRecord, Registration, TokenSecret,
		UserId, normalize_email,
	},
	clock::{Clock, SystemClock},
	config::SessionConfig,
	error::ConfigError,
	obs::{self, OpOutcome, OpSpan, SessionOp},
	signer::{AccessClaims, SignedAccessToken, TokenSigner},
	store::{RefreshTokenStore, RevokeOutcome},
};

/// Token pair handed to the transport layer after login, registration, or rotation.
#[derive(Clone, Debug)]
pub struct AuthTokens {
	/// Signed access token.
	pub access_token: TokenSecret,
	/// Opaque refresh token.
	pub refresh_token: TokenSecret,
	/// Access token expiry.
	pub access_token_expires_at: OffsetDateTime,
	/// Refresh record expiry.
	pub refresh_token_expires_at: OffsetDateTime,
	/// Configured access token lifetime, for cookie max-age.
	pub access_token_minutes: u32,
	/// Configured refresh token lifetime, for cookie max-age.
	pub refresh_token_minutes: u32,
	/// Account the pair belongs to.
	pub user_id: UserId,
	/// Account email.
	pub email: String,
	/// Account display name.
	pub display_name: String,
}

/// Coordinates the token lifecycle for one deployment.
#[derive(Clone)]
pub struct SessionManager {
	/// Refresh record persistence.
	pub store: Arc<dyn RefreshTokenStore>,
	/// Account lookups and credential checks.
	pub directory: Arc<dyn IdentityDirectory>,
	/// Access token signer.
	pub signer: TokenSigner,
	/// Source of "now" for every expiry decision.
	pub clock: Arc<dyn Clock>,
	/// Destination of security events.
	pub audit: Arc<dyn AuditSink>,
	/// Validated configuration.
	pub config: Arc<SessionConfig>,
	/// Activity extension rules derived from the configuration.
	pub activity_policy: ActivityPolicy,
	/// Shared counters for rotation outcomes.
	pub rotation_metrics: Arc<RotationMetrics>,
}
impl SessionManager {
	/// Validates `config` and wires a manager using the system clock and the tracing audit sink.
	pub fn new(
		config: SessionConfig,
		store: Arc<dyn RefreshTokenStore>,
		directory: Arc<dyn IdentityDirectory>,
	) -> Result<Self> {
		config.validate()?;

		Ok(Self {
			signer: TokenSigner::new(&config.signing),
			activity_policy: ActivityPolicy::new(&config.activity),
			config: Arc::new(config),
			store,
			directory,
			clock: Arc::new(SystemClock),
			audit: Arc::new(TracingAuditSink),
			rotation_metrics: Default::default(),
		})
	}

	/// Replaces the clock.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Replaces the audit sink.
	pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
		self.audit = audit;

		self
	}

	/// Starts a new lineage for an already verified identity.
	pub async fn issue(&self, identity: &Identity) -> Result<AuthTokens> {
		const OP: SessionOp = SessionOp::Issue;

		let span = OpSpan::new(OP, "issue");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let now = self.clock.now();
				let access = self.signer.issue(identity, now)?;
				let record = self.create_record(&identity.id, None, now)?;
				let tokens = self.token_pair(identity, access, &record);

				self.store.insert(record.clone()).await?;
				obs::lineage_event(OP, &record.user_id, &record.lineage, "Lineage started.");

				Ok(tokens)
			})
			.await;

		record_result(OP, &result);

		result
	}

	/// Verifies credentials through the directory and starts a new lineage.
	///
	/// Unknown emails and wrong passwords produce the same error.
	pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens> {
		let email = normalize_email(email);
		let identity =
			self.directory.find_user_by_email(&email).await?.ok_or(Error::InvalidCredentials)?;

		if !self.directory.verify_password(&identity, password).await? {
			return Err(Error::InvalidCredentials);
		}

		self.issue(&identity).await
	}

	/// Validates a sign-up form, creates the account, and starts a new lineage.
	pub async fn register(&self, registration: Registration) -> Result<AuthTokens> {
		let user = registration.validate()?;

		if self.directory.find_user_by_email(&user.email).await?.is_some() {
			return Err(Error::UserExists);
		}

		let identity = self.directory.create_user(user).await?;

		self.issue(&identity).await
	}

	/// Revokes one refresh token of `user_id`.
	///
	/// Tokens that are unknown, already dead, or owned by someone else are ignored; returns
	/// whether a record was revoked.
	pub async fn logout(&self, user_id: &UserId, refresh_token: &str) -> Result<bool> {
		const OP: SessionOp = SessionOp::Logout;

		let Some(record) = self.store.find_live(refresh_token).await? else {
			return Ok(false);
		};

		if &record.user_id != user_id {
			return Ok(false);
		}

		match self.store.revoke(refresh_token, self.clock.now()).await? {
			RevokeOutcome::Revoked(record) => {
				obs::lineage_event(OP, &record.user_id, &record.lineage, "Lineage logged out.");
				obs::record_op_outcome(OP, OpOutcome::Success);

				Ok(true)
			},
			RevokeOutcome::AlreadyRevoked | RevokeOutcome::Missing => Ok(false),
		}
	}

	/// Revokes every unrevoked refresh token of `user_id`.
	///
	/// Returns how many of them were still usable; expired rows are revoked too but not counted.
	pub async fn logout_all(&self, user_id: &UserId) -> Result<usize> {
		let now = self.clock.now();
		let revoked = self.store.revoke_all_live_for(user_id, now).await?;

		obs::record_op_outcome(SessionOp::Logout, OpOutcome::Success);

		Ok(sessions_ended(&revoked, now))
	}

	/// Validates an access token against the injected clock.
	pub fn authenticate(&self, access_token: &str) -> Result<AccessClaims> {
		self.signer.validate(access_token, self.clock.now())
	}

	/// Resolves the account behind a user id.
	pub async fn current_user(&self, user_id: &UserId) -> Result<Identity> {
		self.directory.find_user_by_id(user_id).await?.ok_or(Error::InvalidToken)
	}

	/// Builds a record for `user_id`, either starting a lineage or continuing `carryover`.
	pub fn create_record(
		&self,
		user_id: &UserId,
		carryover: Option<Carryover>,
		now: OffsetDateTime,
	) -> Result<RefreshTokenRecord> {
		let refresh = &self.config.refresh;
		let mut builder = RefreshTokenRecord::builder(user_id.clone())
			.created_at(now)
			.expires_in(refresh.refresh_token_ttl())
			.max_refresh_count(refresh.max_refresh_count)
			.max_activity_extensions(refresh.max_activity_extensions);

		if let Some(carryover) = carryover {
			builder = builder.carry_forward(carryover);
		}

		Ok(builder.build().map_err(ConfigError::from)?)
	}

	fn token_pair(
		&self,
		identity: &Identity,
		access: SignedAccessToken,
		record: &RefreshTokenRecord,
	) -> AuthTokens {
		AuthTokens {
			access_token: access.token,
			refresh_token: record.token.clone(),
			access_token_expires_at: access.expires_at,
			refresh_token_expires_at: record.expires_at,
			access_token_minutes: self.config.signing.access_token_minutes,
			refresh_token_minutes: self.config.refresh.refresh_token_minutes,
			user_id: identity.id.clone(),
			email: identity.email.clone(),
			display_name: identity.display_name.clone(),
		}
	}
}
impl Debug for SessionManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionManager")
			.field("signer", &self.signer)
			.field("activity_policy", &self.activity_policy)
			.finish_non_exhaustive()
	}
}

/// Counts revoked records that had not yet expired at `now`.
fn sessions_ended(revoked: &[RefreshTokenRecord], now: OffsetDateTime) -> usize {
	revoked.iter().filter(|record| !record.is_expired_at(now)).count()
}

fn record_result<T>(op: SessionOp, result: &Result<T>) {
	match result {
		Ok(_) => obs::record_op_outcome(op, OpOutcome::Success),
		Err(_) => obs::record_op_outcome(op, OpOutcome::Failure),
	}
}
