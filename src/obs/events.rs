// self
use crate::{
	_prelude::*,
	auth::{LineageId, UserId},
	obs::SessionOp,
	session::{AuditError, SecurityEvent},
};

/// Logs a security-relevant event at `WARN` (when tracing is enabled).
pub fn security_event(event: &SecurityEvent) {
	#[cfg(feature = "tracing")]
	{
		let SecurityEvent::RefreshTokenReplay {
			user_id,
			lineage,
			token_issued_at,
			detected_at,
			revoked_sessions,
		} = event;

		tracing::warn!(
			target: "session_engine::security",
			user_id = %user_id,
			lineage = %lineage,
			token_issued_at = %token_issued_at,
			detected_at = %detected_at,
			revoked_sessions,
			"Refresh token replay detected; revoked every live session of the user."
		);
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = event;
	}
}

/// Logs an audit sink failure that was swallowed.
pub fn audit_failed(error: &AuditError) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(
			target: "session_engine::security",
			error = %error,
			"Audit sink rejected a security event."
		);
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

/// Logs a background failure that was swallowed instead of surfacing to a request.
pub fn background_failure(op: SessionOp, user_id: &UserId, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			op = op.as_str(),
			user_id = %user_id,
			error = %error,
			"Background session work failed."
		);
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (op, user_id, error);
	}
}

/// Logs an activity job that never reached a worker.
pub fn activity_dropped(user_id: &UserId, reason: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(user_id = %user_id, reason, "Activity tracking job dropped.");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (user_id, reason);
	}
}

/// Logs a finished activity outcome discarded because nobody is draining the results stream.
pub fn activity_result_dropped(user_id: &UserId) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(user_id = %user_id, "Activity result dropped; results stream is full.");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = user_id;
	}
}

/// Logs a lineage-level lifecycle transition at `DEBUG`.
pub fn lineage_event(
	op: SessionOp,
	user_id: &UserId,
	lineage: &LineageId,
	message: &'static str,
) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(op = op.as_str(), user_id = %user_id, lineage = %lineage, "{message}");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (op, user_id, lineage, message);
	}
}
