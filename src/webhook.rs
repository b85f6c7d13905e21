//! Authenticity checks for GitHub webhook deliveries.
//!
//! GitHub signs each delivery with the webhook secret and sends the hex HMAC in
//! `X-Hub-Signature` (SHA-1, `sha1=` prefix) and `X-Hub-Signature-256` (SHA-256, `sha256=`
//! prefix). Comparison is constant time.

// crates.io
use hmac::{Hmac, Mac, digest::KeyInit};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;
// self
use crate::_prelude::*;

/// Header carrying the SHA-1 signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";
/// Header carrying the SHA-256 signature.
pub const SIGNATURE_256_HEADER: &str = "X-Hub-Signature-256";

type SecretSource = Arc<dyn Fn() -> Zeroizing<String> + Send + Sync>;

/// Verifies webhook payloads against a shared secret.
///
/// The secret source is consulted on every verification, so rotated secrets apply immediately.
#[derive(Clone)]
pub struct WebhookVerifier {
	secret: SecretSource,
}
impl WebhookVerifier {
	/// Creates a verifier that looks up the secret through `secret_source`.
	pub fn new<F>(secret_source: F) -> Self
	where
		F: 'static + Send + Sync + Fn() -> String,
	{
		Self { secret: Arc::new(move || Zeroizing::new(secret_source())) }
	}

	/// Creates a verifier for a fixed secret.
	pub fn with_secret(secret: impl Into<String>) -> Self {
		let secret = Zeroizing::new(secret.into());

		Self { secret: Arc::new(move || secret.clone()) }
	}

	/// Checks an `X-Hub-Signature` value (`sha1=<hex>`) against `payload`.
	///
	/// A missing header is never legitimate.
	pub fn is_payload_legitimate(&self, signature: Option<&str>, payload: impl AsRef<[u8]>) -> bool {
		self.verify::<Hmac<Sha1>>("sha1=", signature, payload.as_ref())
	}

	/// Checks an `X-Hub-Signature-256` value (`sha256=<hex>`) against `payload`.
	pub fn is_payload_legitimate_sha256(
		&self,
		signature: Option<&str>,
		payload: impl AsRef<[u8]>,
	) -> bool {
		self.verify::<Hmac<Sha256>>("sha256=", signature, payload.as_ref())
	}

	fn verify<M>(&self, prefix: &str, signature: Option<&str>, payload: &[u8]) -> bool
	where
		M: Mac + KeyInit,
	{
		let Some(expected) = signature
			.and_then(|value| value.trim().strip_prefix(prefix))
			.and_then(|encoded| hex::decode(encoded).ok())
		else {
			return false;
		};
		let secret = (self.secret)();
		let Ok(mut mac) = <M as Mac>::new_from_slice(secret.as_bytes()) else {
			return false;
		};

		mac.update(payload);

		let legitimate: bool = mac.finalize().into_bytes().as_slice().ct_eq(&expected).into();

		if !legitimate {
			tracing::warn!(algorithm = prefix.trim_end_matches('='), "Webhook signature mismatch.");
		}

		legitimate
	}
}
impl Debug for WebhookVerifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WebhookVerifier").field("secret", &"<redacted>").finish()
	}
}
