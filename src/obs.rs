//! Optional observability helpers for session operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to emit structured spans named `session_engine.op` with the
//!   `op` and `stage` fields, and to log security events and swallowed background failures.
//! - Enable `metrics` to increment the `session_engine_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod counter;
mod events;
mod span;

pub use counter::*;
pub use events::*;
pub use span::*;

// self
use crate::_prelude::*;

/// Session operations observed by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionOp {
	/// Initial token pair issuance (login or registration).
	Issue,
	/// Refresh token rotation.
	Rotate,
	/// Replay-triggered mass revocation.
	Replay,
	/// Activity extension pass.
	Activity,
	/// Explicit logout.
	Logout,
}
impl SessionOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionOp::Issue => "issue",
			SessionOp::Rotate => "rotate",
			SessionOp::Replay => "replay",
			SessionOp::Activity => "activity",
			SessionOp::Logout => "logout",
		}
	}
}
impl Display for SessionOp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an engine operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
