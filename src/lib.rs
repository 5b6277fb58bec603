//! Session and credential lifecycle engine: short-lived signed access tokens, single-use rotating
//! refresh tokens, replay detection with full-session revocation, and activity-based extension
//! with bounded renewal budgets.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod obs;
pub mod session;
pub mod signer;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

pub use jsonwebtoken;
pub use time;
#[cfg(test)] use color_eyre as _;
