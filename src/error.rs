//! Crate-level error types shared across credentials, paging, and content helpers.

// self
use crate::{_prelude::*, obs::Operation, rate_limit::RequestLimitExceeded};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error used where the failing component is caller-supplied.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type JsonPathError = serde_path_to_error::Error<serde_json::Error>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Signing key or credential exchange failure.
	#[error(transparent)]
	KeyLoading(#[from] KeyLoadingError),
	/// GitHub reported that the request quota is exhausted.
	#[error(transparent)]
	RequestLimitExceeded(#[from] RequestLimitExceeded),
	/// Unsuccessful or undecodable response while paging.
	#[error(transparent)]
	Response(#[from] ResponseError),
	/// Invalid configuration detected at construction time.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// File content could not be loaded or decoded.
	#[error(transparent)]
	FileContent(#[from] FileContentError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// A page was requested after the iterator was exhausted.
	#[error("No more pages may be read from the provided GitHub endpoint.")]
	Exhausted,
}

/// Failures raised while producing or exchanging credentials.
#[derive(Debug, ThisError)]
pub enum KeyLoadingError {
	/// Reading the key from a file or the environment failed.
	#[error("Error reading signing key.")]
	Read {
		/// Underlying I/O failure.
		#[source]
		source: std::io::Error,
	},
	/// A caller-supplied key source failed.
	#[error("Private key source failed.")]
	Source {
		/// Failure reported by the key source.
		#[source]
		source: BoxError,
	},
	/// The key text is not a PEM-encoded RSA private key.
	#[error("Unable to parse valid private key data from provided content.")]
	InvalidKey {
		/// Parser failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Signing the claim set failed.
	#[error("Unable to sign the application token.")]
	Signing {
		/// Signer failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// GitHub answered the exchange with a non-success status.
	#[error("Request for {operation} failed ({status} - {message}).")]
	Exchange {
		/// Operation that issued the request.
		operation: Operation,
		/// HTTP status code.
		status: u16,
		/// Reason phrase reported with the status.
		message: String,
	},
	/// The exchange request did not complete.
	#[error("Error requesting {operation}.")]
	Transport {
		/// Operation that issued the request.
		operation: Operation,
		/// Transport failure.
		#[source]
		source: TransportError,
	},
	/// The exchange response body could not be deserialized.
	#[error("Error deserializing the {operation} response.")]
	Deserialize {
		/// Operation that issued the request.
		operation: Operation,
		/// Structured parsing failure.
		#[source]
		source: JsonPathError,
	},
}
impl KeyLoadingError {
	/// Wraps a failure reported by a custom key source.
	pub fn custom(src: impl Into<BoxError>) -> Self {
		Self::Source { source: src.into() }
	}
}

/// Failures surfaced while reading paged resources.
#[derive(Debug, ThisError)]
pub enum ResponseError {
	/// GitHub answered with a non-success status that was not rate limiting.
	#[error("Response returned unsuccessfully ({status}) from {url}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Requested URL.
		url: String,
	},
	/// The page body could not be decoded into items.
	#[error("Unable to decode the page returned from {url}.")]
	Decode {
		/// Requested URL.
		url: String,
		/// Decoder failure.
		#[source]
		source: BoxError,
	},
	/// The page request did not complete.
	#[error("Error reading response from GitHub.")]
	Transport(#[from] TransportError),
}

/// Configuration and validation failures raised at construction time.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A cache lifetime is outside the window GitHub honors.
	#[error("The {credential} cache lifetime must be within (0, {max_minutes}] minutes, got {ttl}.")]
	TtlOutOfRange {
		/// Credential kind being configured.
		credential: &'static str,
		/// Largest accepted lifetime in minutes.
		max_minutes: i64,
		/// Rejected lifetime.
		ttl: Duration,
	},
	/// A required text field was empty.
	#[error("The {field} must not be empty.")]
	Empty {
		/// Field name.
		field: &'static str,
	},
	/// A URL field could not be parsed.
	#[error("The {field} is not a valid URL.")]
	InvalidUrl {
		/// Field name.
		field: &'static str,
		/// Parser failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// No transport was configured and the default transport is disabled.
	#[error("No HTTP transport configured; enable the `reqwest` feature or supply one.")]
	MissingTransport,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Failures raised while loading repository file content.
#[derive(Debug, ThisError)]
pub enum FileContentError {
	/// The content envelope was not base64 encoded, usually because the path is a directory.
	#[error(
		"GitHub content responses are expected to be of base64 encoding, got {encoding} - check that requested path is a file."
	)]
	UnexpectedEncoding {
		/// Encoding reported by GitHub.
		encoding: String,
	},
	/// The content field was not valid base64.
	#[error("Error deserializing base64 from GitHub response.")]
	Base64 {
		/// Decoder failure.
		#[source]
		source: base64::DecodeError,
	},
	/// The decoded bytes were not UTF-8 text.
	#[error("GitHub file content is not valid UTF-8.")]
	Utf8 {
		/// Conversion failure.
		#[source]
		source: std::string::FromUtf8Error,
	},
	/// The response envelope was not the expected JSON shape.
	#[error("Error deserializing GitHub file content response.")]
	Deserialize {
		/// Structured parsing failure.
		#[source]
		source: JsonPathError,
	},
	/// The content request did not complete.
	#[error("Error requesting GitHub file content.")]
	Transport(#[from] TransportError),
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling GitHub.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling GitHub.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for TransportError {
	fn from(e: reqwest::Error) -> Self {
		Self::network(e)
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}
