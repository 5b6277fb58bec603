//! Refresh token secrets and persisted records.

pub mod record;
pub mod secret;
