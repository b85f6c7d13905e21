//! Installation access tokens obtained by exchanging an [`ApplicationKey`].

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{ApplicationKey, AuthorizationSource, validate_ttl},
	cache::{Clock, ExpiringSupplier, SystemClock},
	error::{ConfigError, KeyLoadingError},
	http::{self, HttpRequest, HttpTransport},
	media,
	obs::{self, Operation},
	rate_limit,
};

/// GitHub expires installation tokens after one hour.
pub const INSTALLATION_TOKEN_MAX_TTL: Duration = Duration::minutes(60);
/// Default cache lifetime, two minutes short of [`INSTALLATION_TOKEN_MAX_TTL`].
pub const INSTALLATION_TOKEN_DEFAULT_TTL: Duration = Duration::minutes(58);

#[derive(Deserialize)]
struct AccessTokenResponse {
	token: String,
}

#[derive(Deserialize)]
struct InstallationResponse {
	access_tokens_url: String,
}

/// Builder for [`InstallationAccessToken`] values.
pub struct InstallationAccessTokenBuilder {
	access_tokens_url: String,
	app_key: Arc<ApplicationKey>,
	user_agent: String,
	media_type: String,
	ttl: Duration,
	http_client: Option<Arc<dyn HttpTransport>>,
	clock: Arc<dyn Clock>,
}
impl InstallationAccessTokenBuilder {
	/// Overrides the `Accept` header sent with the exchange request.
	pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
		self.media_type = media_type.into();

		self
	}

	/// Overrides the cache lifetime; must be within `(0, 60]` minutes.
	pub fn ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Routes the exchange through a custom transport.
	pub fn http_client(mut self, http_client: Arc<dyn HttpTransport>) -> Self {
		self.http_client = Some(http_client);

		self
	}

	/// Overrides the clock used for cache expiry.
	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Validates the configuration and builds the token.
	pub fn build(self) -> Result<InstallationAccessToken> {
		let url = http::parse_url("access tokens URL", &self.access_tokens_url)?;
		let user_agent = http::require_text("user agent", self.user_agent)?;
		let media_type = http::require_text("media type", self.media_type)?;
		let ttl = validate_ttl("installation token", self.ttl, INSTALLATION_TOKEN_MAX_TTL)?;
		let transport = http::default_transport(self.http_client)?;
		let exchange =
			Arc::new(TokenExchange { url, app_key: self.app_key, user_agent, media_type, transport });
		let token = {
			let exchange = exchange.clone();

			ExpiringSupplier::with_clock(ttl, self.clock, move || exchange.request_token())
		};

		Ok(InstallationAccessToken { exchange, ttl, token })
	}
}
impl Debug for InstallationAccessTokenBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InstallationAccessTokenBuilder")
			.field("access_tokens_url", &self.access_tokens_url)
			.field("user_agent", &self.user_agent)
			.field("media_type", &self.media_type)
			.field("ttl", &self.ttl)
			.finish()
	}
}

/// Renewable credential that authenticates as one installation of a GitHub App.
///
/// The header and bare-token accessors share one cache, so the exchange happens at most once
/// per lifetime window whichever accessor is used.
pub struct InstallationAccessToken {
	exchange: Arc<TokenExchange>,
	ttl: Duration,
	token: ExpiringSupplier<Zeroizing<String>>,
}
impl InstallationAccessToken {
	/// Builds a token for a known exchange URL with default settings.
	pub fn new(
		access_tokens_url: impl Into<String>,
		app_key: Arc<ApplicationKey>,
		user_agent: impl Into<String>,
	) -> Result<Self> {
		Self::builder(access_tokens_url, app_key, user_agent).build()
	}

	/// Starts configuring a token bound to `access_tokens_url`.
	pub fn builder(
		access_tokens_url: impl Into<String>,
		app_key: Arc<ApplicationKey>,
		user_agent: impl Into<String>,
	) -> InstallationAccessTokenBuilder {
		InstallationAccessTokenBuilder {
			access_tokens_url: access_tokens_url.into(),
			app_key,
			user_agent: user_agent.into(),
			media_type: media::APP_PREVIEW.to_owned(),
			ttl: INSTALLATION_TOKEN_DEFAULT_TTL,
			http_client: None,
			clock: Arc::new(SystemClock),
		}
	}

	/// Resolves the installation on `repository_url` and binds a token to it.
	///
	/// Performs one lookup request immediately.
	pub fn for_repository(
		repository_url: &str,
		app_key: Arc<ApplicationKey>,
		user_agent: impl Into<String>,
	) -> Result<Self> {
		Self::for_repository_with(repository_url, app_key, user_agent, media::APP_PREVIEW, None)
	}

	/// Same as [`for_repository`](Self::for_repository) with an explicit media type and transport.
	pub fn for_repository_with(
		repository_url: &str,
		app_key: Arc<ApplicationKey>,
		user_agent: impl Into<String>,
		media_type: impl Into<String>,
		http_client: Option<Arc<dyn HttpTransport>>,
	) -> Result<Self> {
		let user_agent = user_agent.into();
		let transport = http::default_transport(http_client)?;
		let access_tokens_url = resolve_access_tokens_url(
			repository_url,
			&app_key,
			&user_agent,
			Some(transport.clone()),
		)?;

		Self::builder(access_tokens_url, app_key, user_agent)
			.media_type(media_type)
			.http_client(transport)
			.build()
	}

	/// Returns `token <access-token>`.
	pub fn get(&self) -> Result<String> {
		self.header()
	}

	/// Returns `token <access-token>`, exchanging a new token when the cached one expired.
	pub fn header(&self) -> Result<String> {
		let token = self.token.get()?;

		Ok(format!("token {}", token.as_str()))
	}

	/// Returns the bare access token, for consumers such as native Git that take it directly.
	pub fn token(&self) -> Result<String> {
		Ok(self.token.get()?.as_str().to_owned())
	}

	/// Drops the cached token so the next call performs a fresh exchange.
	pub fn invalidate(&self) {
		self.token.invalidate();
	}

	/// Exchange endpoint this token is bound to.
	pub fn url(&self) -> &Url {
		&self.exchange.url
	}

	/// User agent sent with each exchange.
	pub fn user_agent(&self) -> &str {
		&self.exchange.user_agent
	}

	/// `Accept` header sent with each exchange.
	pub fn media_type(&self) -> &str {
		&self.exchange.media_type
	}

	/// Cache lifetime of exchanged tokens.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Application key used to authorize the exchange.
	pub fn app_key(&self) -> &Arc<ApplicationKey> {
		&self.exchange.app_key
	}
}
impl AuthorizationSource for InstallationAccessToken {
	fn authorization_header(&self) -> Result<String> {
		self.header()
	}
}
impl Debug for InstallationAccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InstallationAccessToken")
			.field("url", &self.exchange.url.as_str())
			.field("user_agent", &self.exchange.user_agent)
			.field("media_type", &self.exchange.media_type)
			.field("ttl", &self.ttl)
			.field("token", &"<redacted>")
			.finish()
	}
}

/// Looks up the access-token exchange URL of the installation on `repository_url`.
///
/// Useful when the URL itself should be cached by the caller. The lookup always requests the
/// [`media::APP_PREVIEW`] media type.
pub fn resolve_access_tokens_url(
	repository_url: &str,
	app_key: &ApplicationKey,
	user_agent: &str,
	http_client: Option<Arc<dyn HttpTransport>>,
) -> Result<String> {
	let mut url = http::parse_url("repository URL", repository_url)?;

	url.path_segments_mut()
		.map_err(|_| ConfigError::InvalidUrl {
			field: "repository URL",
			source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
		})?
		.pop_if_empty()
		.push("installation");

	let user_agent = http::require_text("user agent", user_agent.to_owned())?;
	let transport = http::default_transport(http_client)?;

	obs::observe(Operation::InstallationLookup, "resolve", || {
		let request =
			HttpRequest::get(url).github(app_key.get()?, media::APP_PREVIEW, &user_agent);
		let installation: InstallationResponse =
			exchange_json(Operation::InstallationLookup, transport.as_ref(), request)?;

		tracing::debug!(repository_url, "Resolved installation for repository.");

		Ok(installation.access_tokens_url)
	})
}

struct TokenExchange {
	url: Url,
	app_key: Arc<ApplicationKey>,
	user_agent: String,
	media_type: String,
	transport: Arc<dyn HttpTransport>,
}
impl TokenExchange {
	fn request_token(&self) -> Result<Zeroizing<String>> {
		obs::observe(Operation::InstallationToken, "exchange", || {
			let request = HttpRequest::post(self.url.clone()).github(
				self.app_key.get()?,
				&self.media_type,
				&self.user_agent,
			);
			let response: AccessTokenResponse =
				exchange_json(Operation::InstallationToken, self.transport.as_ref(), request)?;

			tracing::debug!(url = %self.url, "Exchanged application key for installation token.");

			Ok(Zeroizing::new(response.token))
		})
	}
}

fn exchange_json<T>(
	operation: Operation,
	transport: &dyn HttpTransport,
	request: HttpRequest,
) -> Result<T>
where
	T: DeserializeOwned,
{
	let response = transport
		.execute(request)
		.map_err(|source| KeyLoadingError::Transport { operation, source })?;

	if !response.is_success() {
		rate_limit::check_rate_limit(&response)?;

		return Err(KeyLoadingError::Exchange {
			operation,
			status: response.status,
			message: response.reason().to_owned(),
		}
		.into());
	}

	response.json().map_err(|source| KeyLoadingError::Deserialize { operation, source }.into())
}
