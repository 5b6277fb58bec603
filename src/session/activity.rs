//! Activity-driven expiry extension.
//!
//! Active users should not be forced to log in again every time the refresh window runs out.
//! Each authenticated request may bump `last_activity_at` (at most once per touch interval); when
//! a record is close to expiry the bump also pushes the expiry forward and resets the rotation
//! budget, up to a fixed number of extensions per lineage.

// self
use crate::{
	_prelude::*,
	auth::{RefreshTokenRecord, UserId},
	config::ActivityConfig,
	obs::{self, OpOutcome, OpSpan, SessionOp},
	session::SessionManager,
	store::ActivityTouch,
};

/// Pure decision rules for activity touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivityPolicy {
	/// Minimum spacing between two touches of the same record.
	pub touch_interval: Duration,
	/// Records expiring sooner than this are extended.
	pub extension_window: Duration,
	/// How far one extension pushes the expiry.
	pub extension_step: Duration,
}
impl ActivityPolicy {
	/// Derives the policy from configuration.
	pub fn new(config: &ActivityConfig) -> Self {
		Self {
			touch_interval: config.touch_interval(),
			extension_window: config.extension_window(),
			extension_step: config.extension_step(),
		}
	}

	/// Computes the update for `record` at `now`, or `None` when the record should be left alone.
	pub fn plan(&self, record: &RefreshTokenRecord, now: OffsetDateTime) -> Option<ActivityTouch> {
		if !record.is_live_at(now) || now - record.last_activity_at < self.touch_interval {
			return None;
		}

		let mut touch = ActivityTouch {
			token: record.token.expose().to_owned(),
			last_activity_at: now,
			expires_at: record.expires_at,
			refresh_count: record.refresh_count,
			activity_extension_count: record.activity_extension_count,
		};

		if record.expires_at - now < self.extension_window
			&& record.activity_extension_count < record.max_activity_extensions
		{
			touch.expires_at = record.expires_at + self.extension_step;
			touch.refresh_count = 0;
			touch.activity_extension_count += 1;
		}

		Some(touch)
	}
}

/// Summary of one activity pass over a user's live records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityReport {
	/// Account the pass ran for.
	pub user_id: UserId,
	/// Live records inspected.
	pub examined: usize,
	/// Records whose touch was applied.
	pub touched: usize,
	/// Touches planned as extensions; a subset of the planned touches.
	pub extended: usize,
}

impl SessionManager {
	/// Applies the activity policy to every live record of `user_id`.
	///
	/// Records revoked between the read and the write are skipped by the store, so `touched` can
	/// be lower than the number of planned touches.
	pub async fn record_activity(&self, user_id: &UserId) -> Result<ActivityReport> {
		const OP: SessionOp = SessionOp::Activity;

		let span = OpSpan::new(OP, "record_activity");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let now = self.clock.now();
				let live = self.store.live_for(user_id).await?;
				let mut extended = 0;
				let mut touches = Vec::new();

				for record in &live {
					let Some(touch) = self.activity_policy.plan(record, now) else {
						continue;
					};

					if touch.activity_extension_count > record.activity_extension_count {
						extended += 1;
					}

					touches.push(touch);
				}

				let touched = if touches.is_empty() {
					0
				} else {
					self.store.touch_activity(touches).await?
				};

				Ok(ActivityReport {
					user_id: user_id.clone(),
					examined: live.len(),
					touched,
					extended,
				})
			})
			.await;

		super::record_result(OP, &result);

		result
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn policy() -> ActivityPolicy {
		ActivityPolicy::new(&ActivityConfig::default())
	}

	fn record(created_at: OffsetDateTime, lifetime: Duration) -> RefreshTokenRecord {
		RefreshTokenRecord::builder(UserId::new("user-1").expect("User fixture should be valid."))
			.created_at(created_at)
			.expires_in(lifetime)
			.build()
			.expect("Record fixture should be valid.")
	}

	#[test]
	fn touches_are_rate_limited_to_the_interval() {
		let created = macros::datetime!(2025-01-01 00:00 UTC);
		let record = record(created, Duration::days(10));

		assert!(policy().plan(&record, created + Duration::minutes(59)).is_none());

		let touch = policy()
			.plan(&record, created + Duration::minutes(60))
			.expect("A touch is due after one hour.");

		assert_eq!(touch.last_activity_at, created + Duration::minutes(60));
		assert_eq!(touch.expires_at, record.expires_at);
		assert_eq!(touch.activity_extension_count, 0);
	}

	#[test]
	fn near_expiry_touch_extends_and_resets_budget() {
		let created = macros::datetime!(2025-01-01 00:00 UTC);
		let mut record = record(created, Duration::days(3));

		record.refresh_count = 40;

		let now = created + Duration::days(2);
		let touch = policy().plan(&record, now).expect("A touch is due.");

		assert_eq!(touch.expires_at, record.expires_at + Duration::days(7));
		assert_eq!(touch.refresh_count, 0);
		assert_eq!(touch.activity_extension_count, 1);
	}

	#[test]
	fn extensions_stop_at_the_lineage_ceiling() {
		let created = macros::datetime!(2025-01-01 00:00 UTC);
		let mut record = record(created, Duration::hours(5));

		record.activity_extension_count = record.max_activity_extensions;
		record.refresh_count = 9;

		let touch = policy().plan(&record, created + Duration::hours(2)).expect("A touch is due.");

		assert_eq!(touch.expires_at, record.expires_at);
		assert_eq!(touch.refresh_count, 9);
		assert_eq!(touch.activity_extension_count, record.max_activity_extensions);
	}

	#[test]
	fn dead_records_are_skipped() {
		let created = macros::datetime!(2025-01-01 00:00 UTC);
		let mut revoked = record(created, Duration::days(1));

		revoked.revoke(created);

		assert!(policy().plan(&revoked, created + Duration::hours(2)).is_none());

		let expired = record(created, Duration::minutes(30));

		assert!(policy().plan(&expired, created + Duration::hours(2)).is_none());
	}
}
