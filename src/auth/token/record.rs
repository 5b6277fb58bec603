//! Refresh token records, lifecycle helpers, and builders.

// self
use crate::{
	_prelude::*,
	auth::{LineageId, UserId, token::secret::TokenSecret},
};

/// Default renewal budget: 7 days at 4 rotations per hour.
pub const DEFAULT_MAX_REFRESH_COUNT: u32 = 672;
/// Default number of activity-driven expiry extensions per lineage.
pub const DEFAULT_MAX_ACTIVITY_EXTENSIONS: u32 = 10;

/// Current lifecycle status for a refresh record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
	/// Record is unrevoked and inside its validity window.
	Active,
	/// Record exceeded its expiry instant but was never revoked.
	Expired,
	/// Record has been revoked and is permanently dead.
	Revoked,
}

/// Errors produced by [`RefreshTokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum RefreshTokenRecordBuilderError {
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when the expiry does not fall after the creation instant.
	#[error("Expiry must be later than the creation instant.")]
	NonPositiveLifetime,
}

/// Persisted refresh token and the counters that bound its lineage.
///
/// Records only ever move forward: rotation revokes a record and appends its successor, the
/// replay guard revokes, and the activity policy pushes `expires_at` later. Nothing un-revokes.
#[derive(Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
	/// Opaque bearer secret; also the primary lookup key.
	pub token: TokenSecret,
	/// Owning account.
	pub user_id: UserId,
	/// Chain of records rotated from the same login.
	pub lineage: LineageId,
	/// Creation instant.
	pub created_at: OffsetDateTime,
	/// End of the validity window.
	pub expires_at: OffsetDateTime,
	/// Revocation instant if the record has been revoked.
	pub revoked_at: Option<OffsetDateTime>,
	/// Fingerprint of the successor token when the record was consumed by rotation.
	pub replaced_by: Option<String>,
	/// Rotations performed so far in this lineage since the last activity reset.
	pub refresh_count: u32,
	/// Rotation ceiling before forced re-authentication.
	pub max_refresh_count: u32,
	/// Last time the bearer was observed making a successful authenticated request.
	pub last_activity_at: OffsetDateTime,
	/// Activity-driven extensions applied so far.
	pub activity_extension_count: u32,
	/// Ceiling for activity-driven extensions.
	pub max_activity_extensions: u32,
}
impl RefreshTokenRecord {
	/// Returns a builder for a record owned by `user_id`.
	pub fn builder(user_id: UserId) -> RefreshTokenRecordBuilder {
		RefreshTokenRecordBuilder::new(user_id)
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> RecordStatus {
		if self.revoked_at.is_some() {
			return RecordStatus::Revoked;
		}
		if instant >= self.expires_at {
			return RecordStatus::Expired;
		}

		RecordStatus::Active
	}

	/// Returns `true` if the record is unrevoked and unexpired at the provided instant.
	pub fn is_live_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), RecordStatus::Active)
	}

	/// Returns `true` if the record has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), RecordStatus::Expired)
	}

	/// Returns `true` if the record has been revoked.
	pub fn is_revoked(&self) -> bool {
		self.revoked_at.is_some()
	}

	/// Returns `true` once the lineage has used its whole rotation budget.
	pub fn renewal_budget_exhausted(&self) -> bool {
		self.refresh_count >= self.max_refresh_count
	}

	/// Marks the record as revoked; returns `false` if it already was.
	///
	/// The first revocation instant wins so audits see when the record actually died.
	pub fn revoke(&mut self, instant: OffsetDateTime) -> bool {
		if self.revoked_at.is_some() {
			return false;
		}

		self.revoked_at = Some(instant);

		true
	}

	/// Revokes the record on behalf of a rotation, linking it to its successor.
	pub fn retire(&mut self, instant: OffsetDateTime, successor: &TokenSecret) -> bool {
		if !self.revoke(instant) {
			return false;
		}

		self.replaced_by = Some(successor.fingerprint());

		true
	}

	/// Counters the successor of this record inherits on rotation.
	pub fn successor_carryover(&self) -> Carryover {
		Carryover {
			lineage: self.lineage,
			refresh_count: self.refresh_count.saturating_add(1),
			max_refresh_count: self.max_refresh_count,
			last_activity_at: self.last_activity_at,
			activity_extension_count: self.activity_extension_count,
			max_activity_extensions: self.max_activity_extensions,
		}
	}
}
impl Debug for RefreshTokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshTokenRecord")
			.field("token", &self.token.fingerprint())
			.field("user_id", &self.user_id)
			.field("lineage", &self.lineage)
			.field("created_at", &self.created_at)
			.field("expires_at", &self.expires_at)
			.field("revoked_at", &self.revoked_at)
			.field("replaced_by", &self.replaced_by)
			.field("refresh_count", &self.refresh_count)
			.field("max_refresh_count", &self.max_refresh_count)
			.field("last_activity_at", &self.last_activity_at)
			.field("activity_extension_count", &self.activity_extension_count)
			.field("max_activity_extensions", &self.max_activity_extensions)
			.finish()
	}
}

/// Lineage state inherited by a record created through rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Carryover {
	/// Lineage the successor joins.
	pub lineage: LineageId,
	/// Rotation counter for the successor.
	pub refresh_count: u32,
	/// Rotation ceiling.
	pub max_refresh_count: u32,
	/// Last observed activity.
	pub last_activity_at: OffsetDateTime,
	/// Activity-driven extensions applied so far.
	pub activity_extension_count: u32,
	/// Ceiling for activity-driven extensions.
	pub max_activity_extensions: u32,
}

/// Builder for [`RefreshTokenRecord`].
#[derive(Clone, Debug)]
pub struct RefreshTokenRecordBuilder {
	user_id: UserId,
	token: Option<TokenSecret>,
	created_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	max_refresh_count: u32,
	max_activity_extensions: u32,
	carryover: Option<Carryover>,
}
impl RefreshTokenRecordBuilder {
	fn new(user_id: UserId) -> Self {
		Self {
			user_id,
			token: None,
			created_at: None,
			expires_at: None,
			expires_in: None,
			max_refresh_count: DEFAULT_MAX_REFRESH_COUNT,
			max_activity_extensions: DEFAULT_MAX_ACTIVITY_EXTENSIONS,
			carryover: None,
		}
	}

	/// Uses a caller-supplied secret instead of generating one.
	pub fn token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the creation instant.
	pub fn created_at(mut self, instant: OffsetDateTime) -> Self {
		self.created_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the creation instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Overrides the rotation budget of a fresh lineage.
	pub fn max_refresh_count(mut self, max: u32) -> Self {
		self.max_refresh_count = max;

		self
	}

	/// Overrides the extension budget of a fresh lineage.
	pub fn max_activity_extensions(mut self, max: u32) -> Self {
		self.max_activity_extensions = max;

		self
	}

	/// Continues an existing lineage instead of starting a new one.
	pub fn carry_forward(mut self, carryover: Carryover) -> Self {
		self.carryover = Some(carryover);

		self
	}

	/// Consumes the builder and produces a [`RefreshTokenRecord`].
	pub fn build(self) -> Result<RefreshTokenRecord, RefreshTokenRecordBuilderError> {
		let created_at = self.created_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => created_at + delta,
			(None, None) => return Err(RefreshTokenRecordBuilderError::MissingExpiry),
		};

		if expires_at <= created_at {
			return Err(RefreshTokenRecordBuilderError::NonPositiveLifetime);
		}

		let carryover = self.carryover.unwrap_or(Carryover {
			lineage: LineageId::generate(),
			refresh_count: 0,
			max_refresh_count: self.max_refresh_count,
			last_activity_at: created_at,
			activity_extension_count: 0,
			max_activity_extensions: self.max_activity_extensions,
		});

		Ok(RefreshTokenRecord {
			token: self.token.unwrap_or_else(TokenSecret::generate),
			user_id: self.user_id,
			lineage: carryover.lineage,
			created_at,
			expires_at,
			revoked_at: None,
			replaced_by: None,
			refresh_count: carryover.refresh_count,
			max_refresh_count: carryover.max_refresh_count,
			last_activity_at: carryover.last_activity_at,
			activity_extension_count: carryover.activity_extension_count,
			max_activity_extensions: carryover.max_activity_extensions,
		})
	}
}
