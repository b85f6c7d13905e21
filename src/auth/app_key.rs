//! Signed application keys used to authenticate as the GitHub App itself.
//!
//! An [`ApplicationKey`] turns the App's RSA private key into short-lived RS256 JWTs.
//! The private key is looked up through a [`PrivateKeySource`] on every regeneration, so a
//! key rotated outside the process is picked up at the next cache expiry. Only the signed
//! token is cached; the key text lives in a [`Zeroizing`] buffer for the duration of one
//! signing call.

// std
use std::path::PathBuf;
// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
// self
use crate::{
	_prelude::*,
	auth::{AuthorizationSource, validate_ttl},
	cache::{Clock, ExpiringSupplier, SystemClock},
	error::{BoxError, KeyLoadingError},
	http::require_text,
	obs::{self, Operation},
};

/// GitHub rejects application JWTs that live longer than ten minutes.
pub const APPLICATION_KEY_MAX_TTL: Duration = Duration::minutes(10);
/// Default cache lifetime, leaving headroom below [`APPLICATION_KEY_MAX_TTL`].
pub const APPLICATION_KEY_DEFAULT_TTL: Duration = Duration::minutes(8);

// Extra validity granted past the cache lifetime to absorb client/server clock drift.
const CLOCK_DRIFT_BUFFER: Duration = Duration::minutes(1);

/// Deferred lookup of the PEM-encoded private key issued for the App.
pub trait PrivateKeySource
where
	Self: Send + Sync,
{
	/// Returns the current key text.
	fn load_pem(&self) -> Result<Zeroizing<String>, KeyLoadingError>;
}
impl<F, E> PrivateKeySource for F
where
	F: Fn() -> Result<String, E> + Send + Sync,
	E: Into<BoxError>,
{
	fn load_pem(&self) -> Result<Zeroizing<String>, KeyLoadingError> {
		self().map(Zeroizing::new).map_err(KeyLoadingError::custom)
	}
}

/// Reads the private key from a file on every lookup.
#[derive(Clone, Debug)]
pub struct KeyFile(pub PathBuf);
impl KeyFile {
	/// Creates a source for `path`.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self(path.into())
	}
}
impl PrivateKeySource for KeyFile {
	fn load_pem(&self) -> Result<Zeroizing<String>, KeyLoadingError> {
		std::fs::read_to_string(&self.0)
			.map(Zeroizing::new)
			.map_err(|source| KeyLoadingError::Read { source })
	}
}

/// Reads the private key from an environment variable on every lookup.
#[derive(Clone, Debug)]
pub struct KeyEnv(pub String);
impl KeyEnv {
	/// Creates a source for the variable `name`.
	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}
}
impl PrivateKeySource for KeyEnv {
	fn load_pem(&self) -> Result<Zeroizing<String>, KeyLoadingError> {
		std::env::var(&self.0).map(Zeroizing::new).map_err(KeyLoadingError::custom)
	}
}

/// Claim set carried by application JWTs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppClaims {
	/// Issued-at, seconds since the Unix epoch.
	pub iat: i64,
	/// Expiration, seconds since the Unix epoch.
	pub exp: i64,
	/// App identifier.
	pub iss: String,
}

/// Builder for [`ApplicationKey`] values.
pub struct ApplicationKeyBuilder {
	app_id: String,
	key_source: Arc<dyn PrivateKeySource>,
	ttl: Duration,
	clock: Arc<dyn Clock>,
}
impl ApplicationKeyBuilder {
	/// Overrides the cache lifetime; must be within `(0, 10]` minutes.
	pub fn ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Overrides the clock used for claims and cache expiry.
	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Validates the configuration and builds the key.
	pub fn build(self) -> Result<ApplicationKey> {
		let app_id = require_text("application identifier", self.app_id)?;
		let ttl = validate_ttl("application key", self.ttl, APPLICATION_KEY_MAX_TTL)?;
		let signer = Signer {
			app_id: app_id.clone(),
			key_source: self.key_source,
			ttl,
			clock: self.clock.clone(),
		};
		let header = ExpiringSupplier::with_clock(ttl, self.clock, move || {
			signer.sign().map(|jwt| format!("Bearer {jwt}")).map_err(Error::from)
		});

		Ok(ApplicationKey { app_id, ttl, header })
	}
}
impl Debug for ApplicationKeyBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApplicationKeyBuilder")
			.field("app_id", &self.app_id)
			.field("ttl", &self.ttl)
			.finish()
	}
}

/// Renewable credential that authenticates as a GitHub App outside any installation.
pub struct ApplicationKey {
	app_id: String,
	ttl: Duration,
	header: ExpiringSupplier<String>,
}
impl ApplicationKey {
	/// Builds a key with the default lifetime and the system clock.
	pub fn new(
		app_id: impl Into<String>,
		key_source: impl PrivateKeySource + 'static,
	) -> Result<Self> {
		Self::builder(app_id, key_source).build()
	}

	/// Starts configuring a key for `app_id`.
	pub fn builder(
		app_id: impl Into<String>,
		key_source: impl PrivateKeySource + 'static,
	) -> ApplicationKeyBuilder {
		ApplicationKeyBuilder {
			app_id: app_id.into(),
			key_source: Arc::new(key_source),
			ttl: APPLICATION_KEY_DEFAULT_TTL,
			clock: Arc::new(SystemClock),
		}
	}

	/// Returns `Bearer <jwt>`, signing a fresh token when the cached one expired.
	pub fn get(&self) -> Result<String> {
		self.header.get()
	}

	/// App identifier used as the JWT issuer.
	pub fn app_id(&self) -> &str {
		&self.app_id
	}

	/// Cache lifetime of signed tokens.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}
}
impl AuthorizationSource for ApplicationKey {
	fn authorization_header(&self) -> Result<String> {
		self.get()
	}
}
impl Debug for ApplicationKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApplicationKey")
			.field("app_id", &self.app_id)
			.field("ttl", &self.ttl)
			.field("header", &"<redacted>")
			.finish()
	}
}

struct Signer {
	app_id: String,
	key_source: Arc<dyn PrivateKeySource>,
	ttl: Duration,
	clock: Arc<dyn Clock>,
}
impl Signer {
	fn sign(&self) -> Result<String, KeyLoadingError> {
		obs::observe(Operation::AppToken, "sign", || {
			let pem = self.key_source.load_pem()?;
			let key = EncodingKey::from_rsa_pem(pem.as_bytes())
				.map_err(|source| KeyLoadingError::InvalidKey { source })?;

			drop(pem);

			let now = self.clock.now();
			let lifetime = (self.ttl + CLOCK_DRIFT_BUFFER).min(APPLICATION_KEY_MAX_TTL);
			let claims = AppClaims {
				iat: now.unix_timestamp(),
				exp: (now + lifetime).unix_timestamp(),
				iss: self.app_id.clone(),
			};

			tracing::debug!(app_id = %self.app_id, exp = claims.exp, "Signing application token.");

			jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
				.map_err(|source| KeyLoadingError::Signing { source })
		})
	}
}
