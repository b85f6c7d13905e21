//! GitHub App authentication for Rust: signed app JWTs, cached installation tokens,
//! rate-limit classification, and Link-header paging in one blocking client crate.
//!
//! Call [`init`] once during process startup before issuing requests.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod content;
pub mod error;
pub mod http;
pub mod media;
pub mod obs;
pub mod paging;
pub mod rate_limit;
pub mod webhook;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ApplicationKey, KeyFile},
		cache::ManualClock,
	};

	/// Application identifier used by integration fixtures.
	pub const TEST_APP_ID: &str = "42";
	/// User agent sent by integration fixtures.
	pub const TEST_USER_AGENT: &str = "github-app-broker-tests";

	/// Path to the PKCS#1 RSA private key checked into `tests/fixtures`.
	pub fn test_private_key_path() -> std::path::PathBuf {
		std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/app-private-key.pem")
	}

	/// Reads the RSA public key matching [`test_private_key_path`].
	pub fn test_public_key_pem() -> String {
		let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
			.join("tests/fixtures/app-public-key.pem");

		std::fs::read_to_string(path).expect("Failed to read the public key fixture.")
	}

	/// Builds an [`ApplicationKey`] backed by the fixture key file and a manual clock.
	pub fn test_application_key(clock: &ManualClock) -> Arc<ApplicationKey> {
		let key = ApplicationKey::builder(TEST_APP_ID, KeyFile::new(test_private_key_path()))
			.clock(Arc::new(clock.clone()))
			.build()
			.expect("Failed to build the fixture application key.");

		Arc::new(key)
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;
	pub use zeroize::Zeroizing;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tracing_subscriber as _};

// std
use std::sync::Once;

static INIT: Once = Once::new();

/// Performs process-wide, one-time initialization.
///
/// Installs the rustls `ring` crypto provider as the process default so TLS stacks in the
/// same process agree on one provider. Safe to call repeatedly; only the first call has an
/// effect. Nothing in this crate performs global registration implicitly.
pub fn init() {
	INIT.call_once(|| {
		#[cfg(feature = "reqwest")]
		{
			if rustls::crypto::ring::default_provider().install_default().is_err() {
				tracing::debug!("A rustls crypto provider was already installed.");
			}
		}
	});
}

/// Returns `true` once [`init`] has completed.
pub fn is_initialized() -> bool {
	INIT.is_completed()
}
