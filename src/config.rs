//! Immutable engine configuration injected into every component at construction.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Minimum HMAC key length accepted for HS256 signing.
pub const MIN_SIGNING_SECRET_BYTES: usize = 32;

/// Complete engine configuration.
///
/// Every lifetime and budget defaults to the values the booking server shipped with; only the
/// signing section is mandatory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
	/// Access token signing parameters.
	pub signing: SigningConfig,
	/// Refresh record lifetimes and budgets.
	#[serde(default)]
	pub refresh: RefreshConfig,
	/// Activity extension policy knobs.
	#[serde(default)]
	pub activity: ActivityConfig,
	/// Background activity worker pool sizing.
	#[serde(default)]
	pub tracker: TrackerConfig,
}
impl SessionConfig {
	/// Creates a configuration with default lifetimes and budgets.
	pub fn new(
		secret: impl Into<String>,
		issuer: impl Into<String>,
		audience: impl Into<String>,
	) -> Self {
		Self {
			signing: SigningConfig {
				secret: TokenSecret::new(secret),
				issuer: issuer.into(),
				audience: audience.into(),
				access_token_minutes: SigningConfig::DEFAULT_ACCESS_TOKEN_MINUTES,
			},
			refresh: RefreshConfig::default(),
			activity: ActivityConfig::default(),
			tracker: TrackerConfig::default(),
		}
	}

	/// Parses and validates a JSON document, reporting the path of any malformed field.
	pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(payload);
		let config: Self = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::Parse { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Rejects configurations that would produce weak or degenerate sessions.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.signing.validate()?;
		self.refresh.validate()?;
		self.activity.validate()?;
		self.tracker.validate()
	}
}

/// Access token signing parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SigningConfig {
	/// Symmetric HS256 key.
	pub secret: TokenSecret,
	/// Expected `iss` claim.
	pub issuer: String,
	/// Expected `aud` claim.
	pub audience: String,
	/// Access token lifetime.
	#[serde(default = "SigningConfig::default_access_token_minutes")]
	pub access_token_minutes: u32,
}
impl SigningConfig {
	const DEFAULT_ACCESS_TOKEN_MINUTES: u32 = 15;

	fn default_access_token_minutes() -> u32 {
		Self::DEFAULT_ACCESS_TOKEN_MINUTES
	}

	/// Access token lifetime as a duration.
	pub fn access_token_ttl(&self) -> Duration {
		Duration::minutes(self.access_token_minutes.into())
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.secret.expose().len() < MIN_SIGNING_SECRET_BYTES {
			return Err(ConfigError::WeakSigningSecret { min: MIN_SIGNING_SECRET_BYTES });
		}
		if self.issuer.trim().is_empty() {
			return Err(ConfigError::Empty { field: "signing.issuer" });
		}
		if self.audience.trim().is_empty() {
			return Err(ConfigError::Empty { field: "signing.audience" });
		}

		positive("signing.access_token_minutes", self.access_token_minutes)
	}
}

/// Refresh record lifetimes and budgets applied to new lineages.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
	/// Validity window of each freshly created record.
	pub refresh_token_minutes: u32,
	/// Rotations allowed before forced re-authentication.
	pub max_refresh_count: u32,
	/// Activity-driven extensions allowed per lineage.
	pub max_activity_extensions: u32,
}
impl RefreshConfig {
	/// Refresh record lifetime as a duration.
	pub fn refresh_token_ttl(&self) -> Duration {
		Duration::minutes(self.refresh_token_minutes.into())
	}

	fn validate(&self) -> Result<(), ConfigError> {
		positive("refresh.refresh_token_minutes", self.refresh_token_minutes)?;
		positive("refresh.max_refresh_count", self.max_refresh_count)
	}
}
impl Default for RefreshConfig {
	fn default() -> Self {
		Self {
			refresh_token_minutes: 30,
			max_refresh_count: crate::auth::DEFAULT_MAX_REFRESH_COUNT,
			max_activity_extensions: crate::auth::DEFAULT_MAX_ACTIVITY_EXTENSIONS,
		}
	}
}

/// Activity extension policy knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
	/// Minimum spacing between two activity touches of the same record.
	pub touch_interval_minutes: u32,
	/// Records expiring sooner than this are extended.
	pub extension_window_hours: u32,
	/// How far each extension pushes the expiry.
	pub extension_step_days: u32,
}
impl ActivityConfig {
	/// Touch rate limit as a duration.
	pub fn touch_interval(&self) -> Duration {
		Duration::minutes(self.touch_interval_minutes.into())
	}

	/// Extension trigger window as a duration.
	pub fn extension_window(&self) -> Duration {
		Duration::hours(self.extension_window_hours.into())
	}

	/// Extension step as a duration.
	pub fn extension_step(&self) -> Duration {
		Duration::days(self.extension_step_days.into())
	}

	fn validate(&self) -> Result<(), ConfigError> {
		positive("activity.extension_step_days", self.extension_step_days)
	}
}
impl Default for ActivityConfig {
	fn default() -> Self {
		Self { touch_interval_minutes: 60, extension_window_hours: 48, extension_step_days: 7 }
	}
}

/// Background activity worker pool sizing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
	/// Pending jobs buffered before new ones are dropped; also caps unread results.
	pub queue_capacity: usize,
	/// Worker tasks draining the queue.
	pub workers: usize,
}
impl TrackerConfig {
	fn validate(&self) -> Result<(), ConfigError> {
		if self.queue_capacity == 0 {
			return Err(ConfigError::NonPositive { field: "tracker.queue_capacity" });
		}
		if self.workers == 0 {
			return Err(ConfigError::NonPositive { field: "tracker.workers" });
		}

		Ok(())
	}
}
impl Default for TrackerConfig {
	fn default() -> Self {
		Self { queue_capacity: 1024, workers: 4 }
	}
}

fn positive(field: &'static str, value: u32) -> Result<(), ConfigError> {
	if value == 0 { Err(ConfigError::NonPositive { field }) } else { Ok(()) }
}
