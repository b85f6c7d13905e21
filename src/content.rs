//! Repository file content retrieval through the GitHub contents API.

// crates.io
use base64::{
	Engine,
	alphabet,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
// self
use crate::{
	_prelude::*,
	auth::AuthorizationSource,
	error::{ConfigError, FileContentError, ResponseError},
	http::{self, HttpRequest, HttpTransport},
	media,
	obs::{self, Operation},
	rate_limit,
};

const BASE64_ENCODING: &str = "base64";
const NOT_FOUND: u16 = 404;
// GitHub wraps the payload at 60 columns; padding is accepted either way.
const MIME: GeneralPurpose = GeneralPurpose::new(
	&alphabet::STANDARD,
	GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Deserialize)]
struct ContentResponse {
	encoding: String,
	content: String,
}

/// Builder for [`FileContentLoader`] values.
pub struct FileContentLoaderBuilder {
	user_agent: String,
	media_type: String,
	http_client: Option<Arc<dyn HttpTransport>>,
}
impl FileContentLoaderBuilder {
	/// Overrides the `Accept` header.
	pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
		self.media_type = media_type.into();

		self
	}

	/// Routes requests through a custom transport.
	pub fn http_client(mut self, http_client: Arc<dyn HttpTransport>) -> Self {
		self.http_client = Some(http_client);

		self
	}

	/// Validates the configuration and builds the loader.
	pub fn build(self) -> Result<FileContentLoader> {
		let user_agent = http::require_text("user agent", self.user_agent)?;
		let media_type = http::require_text("media type", self.media_type)?;
		let transport = http::default_transport(self.http_client)?;

		Ok(FileContentLoader { user_agent, media_type, transport })
	}
}
impl Debug for FileContentLoaderBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FileContentLoaderBuilder")
			.field("user_agent", &self.user_agent)
			.field("media_type", &self.media_type)
			.finish()
	}
}

/// Loads the text of single files from repositories.
#[derive(Clone)]
pub struct FileContentLoader {
	user_agent: String,
	media_type: String,
	transport: Arc<dyn HttpTransport>,
}
impl FileContentLoader {
	/// Creates a loader using the default transport and [`media::APP_PREVIEW`].
	pub fn new(user_agent: impl Into<String>) -> Result<Self> {
		Self::builder(user_agent).build()
	}

	/// Starts configuring a loader that identifies itself as `user_agent`.
	pub fn builder(user_agent: impl Into<String>) -> FileContentLoaderBuilder {
		FileContentLoaderBuilder {
			user_agent: user_agent.into(),
			media_type: media::APP_PREVIEW.to_owned(),
			http_client: None,
		}
	}

	/// Reads `path` at `git_ref` from the repository at `repository_url`.
	///
	/// Returns `Ok(None)` when GitHub answers `404`. Directories and symlinks fail with
	/// [`FileContentError::UnexpectedEncoding`] because GitHub does not base64 encode them.
	pub fn load_contents<A>(
		&self,
		authorization: &A,
		repository_url: &str,
		git_ref: &str,
		path: &str,
	) -> Result<Option<String>>
	where
		A: ?Sized + AuthorizationSource,
	{
		let url = contents_url(repository_url, git_ref, path)?;

		obs::observe(Operation::FileContent, "load", || {
			let request = HttpRequest::get(url.clone()).github(
				authorization.authorization_header()?,
				&self.media_type,
				&self.user_agent,
			);
			let response = self.transport.execute(request).map_err(FileContentError::from)?;

			if response.status == NOT_FOUND {
				tracing::debug!(%url, "File content not found.");

				return Ok(None);
			}
			if !response.is_success() {
				rate_limit::check_rate_limit(&response)?;

				return Err(
					ResponseError::Status { status: response.status, url: url.to_string() }.into()
				);
			}

			let contents = decode_content(&response).inspect_err(|e| {
				tracing::error!(%url, error = %e, "Error reading file contents.");
			})?;

			Ok(Some(contents))
		})
	}
}
impl Debug for FileContentLoader {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FileContentLoader")
			.field("user_agent", &self.user_agent)
			.field("media_type", &self.media_type)
			.finish()
	}
}

fn contents_url(repository_url: &str, git_ref: &str, path: &str) -> Result<Url> {
	let mut url = http::parse_url("repository URL", repository_url)?;

	url.path_segments_mut()
		.map_err(|_| ConfigError::InvalidUrl {
			field: "repository URL",
			source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
		})?
		.pop_if_empty()
		.push("contents")
		.extend(path.split('/').filter(|segment| !segment.is_empty()));
	url.query_pairs_mut().append_pair("ref", git_ref);

	Ok(url)
}

fn decode_content(response: &http::HttpResponse) -> Result<String, FileContentError> {
	let envelope: ContentResponse =
		response.json().map_err(|source| FileContentError::Deserialize { source })?;

	if envelope.encoding != BASE64_ENCODING {
		return Err(FileContentError::UnexpectedEncoding { encoding: envelope.encoding });
	}

	let encoded = envelope
		.content
		.bytes()
		.filter(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'/' | b'='))
		.collect::<Vec<_>>();
	let bytes = MIME.decode(encoded).map_err(|source| FileContentError::Base64 { source })?;

	String::from_utf8(bytes).map_err(|source| FileContentError::Utf8 { source })
}
