//! Rate limit classification for GitHub responses.
//!
//! GitHub signals an exhausted quota with `403 Forbidden` plus `X-RateLimit-Remaining: 0`.
//! The classifier only needs a status accessor and a header accessor, so it works over any
//! response representation: use [`check_rate_limit_with`] / [`rate_limit_exceeded_with`]
//! with lookup closures, or the [`RateLimitedResponse`] shortcuts for the types this crate
//! knows about. Nothing here sleeps or retries; backoff is the caller's decision.

// self
use crate::{_prelude::*, http::HttpResponse};

/// Header carrying the maximum number of requests per window.
pub const RATE_LIMIT_MAXIMUM_HEADER: &str = "X-RateLimit-Limit";
/// Header carrying the epoch second at which the window resets.
pub const RATE_LIMIT_RESET_HEADER: &str = "X-RateLimit-Reset";
/// Header carrying the number of requests left in the window.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "X-RateLimit-Remaining";

const UNKNOWN: &str = "(unknown)";
const FORBIDDEN: u16 = 403;

/// Raised when GitHub reports that the request quota is exhausted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("Maximum requests to GitHub exceeded. Limit of {limit}, resets at {reset}.")]
pub struct RequestLimitExceeded {
	/// Value of `X-RateLimit-Limit`, or `(unknown)`.
	pub limit: String,
	/// Value of `X-RateLimit-Reset`, or `(unknown)`.
	pub reset: String,
}
impl RequestLimitExceeded {
	/// Creates a new error from raw header values.
	pub fn new(limit: impl Into<String>, reset: impl Into<String>) -> Self {
		Self { limit: limit.into(), reset: reset.into() }
	}

	/// Interprets the reset value as epoch seconds, when it is numeric.
	pub fn reset_at(&self) -> Option<OffsetDateTime> {
		let seconds = self.reset.trim().parse::<i64>().ok()?;

		OffsetDateTime::from_unix_timestamp(seconds).ok()
	}
}

/// Response types that expose a status code and named headers.
pub trait RateLimitedResponse {
	/// HTTP status code.
	fn status_code(&self) -> u16;

	/// Every value of `name`, in arrival order.
	fn header_values(&self, name: &str) -> Vec<String>;
}
impl RateLimitedResponse for HttpResponse {
	fn status_code(&self) -> u16 {
		self.status
	}

	fn header_values(&self, name: &str) -> Vec<String> {
		HttpResponse::header_values(self, name).into_iter().map(str::to_owned).collect()
	}
}
#[cfg(feature = "reqwest")]
impl RateLimitedResponse for reqwest::blocking::Response {
	fn status_code(&self) -> u16 {
		self.status().as_u16()
	}

	fn header_values(&self, name: &str) -> Vec<String> {
		self.headers()
			.get_all(name)
			.iter()
			.filter_map(|value| value.to_str().ok().map(str::to_owned))
			.collect()
	}
}

/// Fails with [`RequestLimitExceeded`] when `response` reports an exhausted quota.
pub fn check_rate_limit<R>(response: &R) -> Result<(), RequestLimitExceeded>
where
	R: ?Sized + RateLimitedResponse,
{
	check_rate_limit_with(response, |r| r.status_code(), |r, name| r.header_values(name))
}

/// Returns the [`RequestLimitExceeded`] value `response` represents, if any.
pub fn rate_limit_exceeded<R>(response: &R) -> Option<RequestLimitExceeded>
where
	R: ?Sized + RateLimitedResponse,
{
	rate_limit_exceeded_with(response, |r| r.status_code(), |r, name| r.header_values(name))
}

/// Throwing form over arbitrary responses; see [`rate_limit_exceeded_with`].
pub fn check_rate_limit_with<R, S, H>(
	response: &R,
	status_lookup: S,
	header_lookup: H,
) -> Result<(), RequestLimitExceeded>
where
	R: ?Sized,
	S: Fn(&R) -> u16,
	H: Fn(&R, &str) -> Vec<String>,
{
	match rate_limit_exceeded_with(response, status_lookup, header_lookup) {
		Some(err) => Err(err),
		None => Ok(()),
	}
}

/// Non-throwing form over arbitrary responses.
///
/// `header_lookup` returns every instance of the named header. The quota counts as
/// exhausted when the status is 403 and any `X-RateLimit-Remaining` instance is `"0"`.
pub fn rate_limit_exceeded_with<R, S, H>(
	response: &R,
	status_lookup: S,
	header_lookup: H,
) -> Option<RequestLimitExceeded>
where
	R: ?Sized,
	S: Fn(&R) -> u16,
	H: Fn(&R, &str) -> Vec<String>,
{
	if status_lookup(response) != FORBIDDEN {
		return None;
	}
	if !header_lookup(response, RATE_LIMIT_REMAINING_HEADER).iter().any(|value| value.trim() == "0")
	{
		return None;
	}

	let first_or_unknown = |name: &str| {
		header_lookup(response, name).into_iter().next().unwrap_or_else(|| UNKNOWN.to_owned())
	};
	let limit = first_or_unknown(RATE_LIMIT_MAXIMUM_HEADER);
	let reset = first_or_unknown(RATE_LIMIT_RESET_HEADER);

	tracing::debug!(%limit, %reset, "GitHub rate limit exhausted.");

	Some(RequestLimitExceeded { limit, reset })
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;

	fn response(status: u16, remaining: Option<&str>) -> HttpResponse {
		let mut response = HttpResponse::new(status, "")
			.with_header(RATE_LIMIT_MAXIMUM_HEADER, "5000")
			.with_header(RATE_LIMIT_RESET_HEADER, "1372700873");

		if let Some(value) = remaining {
			response = response.with_header(RATE_LIMIT_REMAINING_HEADER, value);
		}

		response
	}

	#[test]
	fn exhausted_quota_is_detected() {
		let err = check_rate_limit(&response(403, Some("0")))
			.expect_err("403 with no remaining requests should be rate limited.");

		assert_eq!(err, RequestLimitExceeded::new("5000", "1372700873"));
		assert_eq!(
			err.reset_at().map(OffsetDateTime::unix_timestamp),
			Some(1_372_700_873)
		);
	}

	#[test]
	fn remaining_quota_passes_through() {
		assert!(check_rate_limit(&response(403, Some("500"))).is_ok());
		assert!(check_rate_limit(&response(403, None)).is_ok());
		assert!(rate_limit_exceeded(&response(403, Some("500"))).is_none());
	}

	#[test]
	fn only_forbidden_status_triggers() {
		assert!(check_rate_limit(&response(100, Some("0"))).is_ok());
		assert!(check_rate_limit(&response(429, Some("0"))).is_ok());
		assert!(check_rate_limit(&response(200, Some("0"))).is_ok());
	}

	#[test]
	fn missing_limit_headers_default_to_unknown() {
		let bare = HttpResponse::new(403, "").with_header(RATE_LIMIT_REMAINING_HEADER, "0");
		let err = rate_limit_exceeded(&bare).expect("Bare 403 with zero remaining should match.");

		assert_eq!(err.limit, "(unknown)");
		assert_eq!(err.reset, "(unknown)");
		assert_eq!(err.reset_at(), None);
	}

	#[test]
	fn lookup_functions_work_over_foreign_types() {
		struct Foreign {
			code: u16,
			headers: HashMap<&'static str, Vec<String>>,
		}

		let foreign = Foreign {
			code: 403,
			headers: HashMap::from([
				(RATE_LIMIT_REMAINING_HEADER, vec!["0".to_owned()]),
				(RATE_LIMIT_MAXIMUM_HEADER, vec!["60".to_owned()]),
			]),
		};
		let err = check_rate_limit_with(
			&foreign,
			|r| r.code,
			|r, name| r.headers.get(name).cloned().unwrap_or_default(),
		)
		.expect_err("Foreign response should be classified as rate limited.");

		assert_eq!(err, RequestLimitExceeded::new("60", "(unknown)"));
	}
}
