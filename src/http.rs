//! Blocking transport primitives for GitHub requests.
//!
//! Every network call in the crate is expressed as an [`HttpRequest`] handed to an
//! [`HttpTransport`]. The transport returns the full [`HttpResponse`] (status, every header
//! instance, body bytes) so rate-limit classification and Link-header paging work the same
//! regardless of the HTTP stack. Calls block the current thread; the crate spawns no
//! threads and applies no timeout policy of its own.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::TransportError};

/// Header names sent by the crate.
pub mod header {
	/// `Accept`.
	pub const ACCEPT: &str = "Accept";
	/// `Authorization`.
	pub const AUTHORIZATION: &str = "Authorization";
	/// `Link`.
	pub const LINK: &str = "Link";
	/// `User-Agent`.
	pub const USER_AGENT: &str = "User-Agent";
}

/// Synchronous HTTP stack capable of executing GitHub requests.
///
/// Implementations must return non-success statuses as `Ok` responses; only failures to
/// obtain a response at all are [`TransportError`]s.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and buffers the whole response.
	fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// HTTP methods used against the GitHub API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
	/// `GET`.
	Get,
	/// `POST` with an empty body.
	Post,
}
impl HttpMethod {
	/// Returns the method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outbound request description.
#[derive(Clone, Debug)]
pub struct HttpRequest {
	/// Request method.
	pub method: HttpMethod,
	/// Absolute request URL.
	pub url: Url,
	/// Header name/value pairs in send order.
	pub headers: Vec<(&'static str, String)>,
}
impl HttpRequest {
	/// Creates a `GET` request.
	pub fn get(url: Url) -> Self {
		Self { method: HttpMethod::Get, url, headers: Vec::new() }
	}

	/// Creates a `POST` request with an empty body.
	pub fn post(url: Url) -> Self {
		Self { method: HttpMethod::Post, url, headers: Vec::new() }
	}

	/// Appends a header.
	pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
		self.headers.push((name, value.into()));

		self
	}

	/// Appends the `Authorization`, `Accept`, and `User-Agent` headers GitHub expects.
	pub(crate) fn github(self, authorization: String, media_type: &str, user_agent: &str) -> Self {
		self.header(header::AUTHORIZATION, authorization)
			.header(header::ACCEPT, media_type)
			.header(header::USER_AGENT, user_agent)
	}

	/// Returns the first value sent for `name`, compared case-insensitively.
	pub fn header_value(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

/// Buffered response returned by an [`HttpTransport`].
#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Reason phrase, when the transport knows it.
	pub reason: Option<String>,
	/// Every header instance in arrival order; repeated headers stay separate.
	pub headers: Vec<(String, String)>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Creates a response with the given status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into(), ..Default::default() }
	}

	/// Appends a header instance.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns every value of `name`, compared case-insensitively, in arrival order.
	pub fn header_values(&self, name: &str) -> Vec<&str> {
		self.headers
			.iter()
			.filter(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
			.collect()
	}

	/// Returns the reason phrase or an empty string.
	pub fn reason(&self) -> &str {
		self.reason.as_deref().unwrap_or_default()
	}

	/// Decodes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
	}
}

/// Thin wrapper around a blocking reqwest client so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub reqwest::blocking::Client);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client with reqwest defaults.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		Ok(Self(reqwest::blocking::Client::builder().build()?))
	}

	/// Wraps an existing blocking reqwest client.
	pub fn with_client(client: reqwest::blocking::Client) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
		let method = match request.method {
			HttpMethod::Get => reqwest::Method::GET,
			HttpMethod::Post => reqwest::Method::POST,
		};
		let mut builder = self.0.request(method, request.url);

		for (name, value) in request.headers {
			builder = builder.header(name, value);
		}
		if matches!(request.method, HttpMethod::Post) {
			builder = builder.body(Vec::new());
		}

		let response = builder.send()?;
		let status = response.status();
		let headers = response
			.headers()
			.iter()
			.filter_map(|(name, value)| {
				value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
			})
			.collect();
		let body = response.bytes()?.to_vec();

		Ok(HttpResponse {
			status: status.as_u16(),
			reason: status.canonical_reason().map(str::to_owned),
			headers,
			body,
		})
	}
}

/// Resolves the transport used when a builder was not given one.
pub(crate) fn default_transport(
	configured: Option<Arc<dyn HttpTransport>>,
) -> Result<Arc<dyn HttpTransport>> {
	if let Some(transport) = configured {
		return Ok(transport);
	}

	#[cfg(feature = "reqwest")]
	{
		Ok(Arc::new(ReqwestHttpClient::new().map_err(Error::from)?))
	}
	#[cfg(not(feature = "reqwest"))]
	{
		Err(crate::error::ConfigError::MissingTransport.into())
	}
}

/// Parses a required URL field.
pub(crate) fn parse_url(field: &'static str, value: &str) -> Result<Url> {
	Url::parse(value)
		.map_err(|source| crate::error::ConfigError::InvalidUrl { field, source }.into())
}

/// Rejects empty required text fields.
pub(crate) fn require_text(field: &'static str, value: String) -> Result<String> {
	if value.trim().is_empty() {
		return Err(crate::error::ConfigError::Empty { field }.into());
	}

	Ok(value)
}


#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn header_lookup_is_case_insensitive_and_keeps_repeats() {
		let response = HttpResponse::new(200, "[]")
			.with_header("link", "<https://a>; rel=\"next\"")
			.with_header("Link", "<https://b>; rel=\"last\"")
			.with_header("X-RateLimit-Remaining", "10");

		assert_eq!(response.header_values("LINK"), vec![
			"<https://a>; rel=\"next\"",
			"<https://b>; rel=\"last\""
		]);
		assert_eq!(response.header_values("x-ratelimit-remaining"), vec!["10"]);
		assert!(response.header_values("Retry-After").is_empty());
	}

	#[test]
	fn success_covers_only_2xx() {
		assert!(HttpResponse::new(200, "").is_success());
		assert!(HttpResponse::new(204, "").is_success());
		assert!(!HttpResponse::new(304, "").is_success());
		assert!(!HttpResponse::new(403, "").is_success());
	}

	#[test]
	fn github_headers_are_attached() {
		let url = Url::parse("https://api.github.com/repos/o/r").expect("Fixture URL should parse.");
		let request = HttpRequest::get(url).github("token abc".into(), "application/json", "agent");

		assert_eq!(request.header_value("authorization"), Some("token abc"));
		assert_eq!(request.header_value("accept"), Some("application/json"));
		assert_eq!(request.header_value("user-agent"), Some("agent"));
	}

	#[test]
	fn json_reports_failing_path() {
		#[derive(Debug, Deserialize)]
		struct Body {
			#[allow(dead_code)]
			token: String,
		}

		let err = HttpResponse::new(200, "{\"token\":5}")
			.json::<Body>()
			.expect_err("Numeric token should fail to deserialize.");

		assert_eq!(err.path().to_string(), "token");
	}

	#[test]
	fn required_fields_are_validated() {
		assert!(require_text("user agent", " ".into()).is_err());
		assert_eq!(require_text("user agent", "agent".into()).ok(), Some("agent".to_owned()));
		assert!(parse_url("repository URL", "not a url").is_err());
	}
}
