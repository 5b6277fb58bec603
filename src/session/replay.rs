//! Replay containment for consumed refresh tokens.
//!
//! A revoked token that comes back means a copy leaked. We cannot tell the attacker from the
//! user, so every live session of the owner is revoked and a [`SecurityEvent`] is emitted.

// self
use crate::{
	_prelude::*,
	auth::{LineageId, RefreshTokenRecord, UserId},
	obs::{self, SessionOp},
	session::SessionManager,
};

/// Security-relevant occurrence forwarded to an [`AuditSink`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecurityEvent {
	/// A consumed refresh token was presented again.
	RefreshTokenReplay {
		/// Owner of the replayed token.
		user_id: UserId,
		/// Lineage the replayed token belonged to.
		lineage: LineageId,
		/// Creation instant of the replayed record.
		token_issued_at: OffsetDateTime,
		/// When the replay was observed.
		detected_at: OffsetDateTime,
		/// Live records revoked in response.
		revoked_sessions: usize,
	},
}
impl SecurityEvent {
	/// Account the event concerns.
	pub fn user_id(&self) -> &UserId {
		match self {
			Self::RefreshTokenReplay { user_id, .. } => user_id,
		}
	}
}

/// Failure reported by an [`AuditSink`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Audit sink failure: {message}.")]
pub struct AuditError {
	/// Human-readable error payload.
	pub message: String,
}
impl AuditError {
	/// Wraps a sink-specific message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// Destination for security events.
///
/// Emission happens on the request path after the revocation has committed, so
/// implementations should be quick; a returned error is logged and otherwise ignored.
pub trait AuditSink
where
	Self: Send + Sync,
{
	/// Records one event.
	fn emit(&self, event: &SecurityEvent) -> Result<(), AuditError>;
}

/// Default sink that writes events to the `session_engine::security` tracing target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;
impl AuditSink for TracingAuditSink {
	fn emit(&self, event: &SecurityEvent) -> Result<(), AuditError> {
		obs::security_event(event);

		Ok(())
	}
}

impl SessionManager {
	/// Revokes every live session of the owner of `replayed` and reports the replay.
	///
	/// Always yields an error: [`Error::ReplayDetected`] once the revocation committed, or the
	/// storage failure that prevented it.
	pub async fn guard_replay(&self, replayed: &RefreshTokenRecord, now: OffsetDateTime) -> Error {
		let revoked = match self.store.revoke_all_live_for(&replayed.user_id, now).await {
			Ok(revoked) => revoked,
			Err(err) => {
				obs::background_failure(SessionOp::Replay, &replayed.user_id, &err);

				return err.into();
			},
		};
		let event = SecurityEvent::RefreshTokenReplay {
			user_id: replayed.user_id.clone(),
			lineage: replayed.lineage,
			token_issued_at: replayed.created_at,
			detected_at: now,
			revoked_sessions: super::sessions_ended(&revoked, now),
		};

		obs::record_op_outcome(SessionOp::Replay, obs::OpOutcome::Success);

		if let Err(err) = self.audit.emit(&event) {
			obs::audit_failed(&err);
		}

		Error::ReplayDetected
	}
}
