//! Refresh token rotation with compare-and-set commits and replay escalation.
//!
//! [`SessionManager::rotate`] exchanges a live refresh token for a new access/refresh pair.
//! Every fallible step that is not a store write (identity lookup, signing, record build) runs
//! before the commit, so once [`RefreshTokenStore::rotate`] reports
//! [`RotateOutcome::Rotated`] the caller always receives the successor. Presenting a token that
//! is already revoked, or losing a concurrent race for the same token, hands control to the
//! replay guard.
//!
//! [`RefreshTokenStore::rotate`]: crate::store::RefreshTokenStore::rotate

mod metrics;

pub use self::metrics::RotationMetrics;

// self
use crate::{
	_prelude::*,
	auth::RefreshTokenRecord,
	obs::{self, OpOutcome, OpSpan, SessionOp},
	session::{AuthTokens, SessionManager},
	store::{RevokeOutcome, RotateOutcome},
};

impl SessionManager {
	/// Consumes `presented` and returns the next pair of its lineage.
	pub async fn rotate(&self, presented: &str) -> Result<AuthTokens> {
		const OP: SessionOp = SessionOp::Rotate;

		let span = OpSpan::new(OP, "rotate");

		obs::record_op_outcome(OP, OpOutcome::Attempt);
		self.rotation_metrics.record_attempt();

		let result = span.instrument(self.rotate_inner(presented)).await;

		match &result {
			Ok(_) => {
				self.rotation_metrics.record_success();
				obs::record_op_outcome(OP, OpOutcome::Success);
			},
			Err(err) => {
				if matches!(err, Error::ReplayDetected) {
					self.rotation_metrics.record_replay();
				}

				self.rotation_metrics.record_failure();
				obs::record_op_outcome(OP, OpOutcome::Failure);
			},
		}

		result
	}

	async fn rotate_inner(&self, presented: &str) -> Result<AuthTokens> {
		let now = self.clock.now();
		let Some(current) = self.store.find_live(presented).await? else {
			return match self.store.find_revoked(presented).await? {
				Some(revoked) => Err(self.guard_replay(&revoked, now).await),
				None => Err(Error::InvalidToken),
			};
		};

		if current.is_expired_at(now) {
			return Err(Error::Expired);
		}
		if current.renewal_budget_exhausted() {
			return Err(self.exhaust(&current, now).await);
		}

		let identity =
			self.directory.find_user_by_id(&current.user_id).await?.ok_or(Error::InvalidToken)?;
		let access = self.signer.issue(&identity, now)?;
		let successor =
			self.create_record(&current.user_id, Some(current.successor_carryover()), now)?;
		let tokens = self.token_pair(&identity, access, &successor);

		match self.store.rotate(presented, successor, now).await? {
			RotateOutcome::Rotated => {
				obs::lineage_event(
					SessionOp::Rotate,
					&current.user_id,
					&current.lineage,
					"Lineage rotated.",
				);

				Ok(tokens)
			},
			RotateOutcome::AlreadyRevoked(lost) => Err(self.guard_replay(&lost, now).await),
			RotateOutcome::Missing => Err(Error::InvalidToken),
		}
	}

	/// Revokes a record whose rotation budget is spent.
	///
	/// A concurrent revocation of the same record means the token was used twice, so that case
	/// escalates to the replay guard like any other lost race.
	async fn exhaust(&self, current: &RefreshTokenRecord, now: OffsetDateTime) -> Error {
		match self.store.revoke(current.token.expose(), now).await {
			Ok(RevokeOutcome::Revoked(record)) => {
				obs::lineage_event(
					SessionOp::Rotate,
					&record.user_id,
					&record.lineage,
					"Lineage rotation budget exhausted.",
				);

				Error::RenewalBudgetExhausted
			},
			Ok(RevokeOutcome::AlreadyRevoked) => self.guard_replay(current, now).await,
			Ok(RevokeOutcome::Missing) => Error::InvalidToken,
			Err(err) => err.into(),
		}
	}
}
