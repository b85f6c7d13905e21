//! GitHub App credentials: signed application keys and installation access tokens.

pub mod app_key;
pub mod installation;

pub use app_key::*;
pub use installation::*;

// self
use crate::_prelude::*;

/// Produces ready-to-send `Authorization` header values.
pub trait AuthorizationSource
where
	Self: Send + Sync,
{
	/// Returns the current header value, refreshing the underlying credential when needed.
	fn authorization_header(&self) -> Result<String>;
}
impl<F> AuthorizationSource for F
where
	F: Fn() -> Result<String> + Send + Sync,
{
	fn authorization_header(&self) -> Result<String> {
		self()
	}
}

/// Validates a cache lifetime against `(0, max]`.
pub(crate) fn validate_ttl(credential: &'static str, ttl: Duration, max: Duration) -> Result<Duration> {
	if !ttl.is_positive() || ttl > max {
		return Err(crate::error::ConfigError::TtlOutOfRange {
			credential,
			max_minutes: max.whole_minutes(),
			ttl,
		}
		.into());
	}

	Ok(ttl)
}
