//! Observability helpers for credential, paging, and content operations.
//!
//! # Feature Flags
//!
//! - Spans named `github_app_broker.op` carry the `op` (operation) and `stage` (call site)
//!   fields and are always emitted through `tracing`.
//! - Enable `metrics` to increment the `github_app_broker_operation_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Network-backed operations performed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Signing a new application JWT.
	AppToken,
	/// Exchanging the application JWT for an installation token.
	InstallationToken,
	/// Resolving the installation behind a repository.
	InstallationLookup,
	/// Fetching one page of a paginated collection.
	PageFetch,
	/// Loading repository file content.
	FileContent,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::AppToken => "app_token",
			Operation::InstallationToken => "installation_token",
			Operation::InstallationLookup => "installation_lookup",
			Operation::PageFetch => "page_fetch",
			Operation::FileContent => "file_content",
		}
	}

	/// Returns a human-readable description used in error messages.
	pub const fn describe(self) -> &'static str {
		match self {
			Operation::AppToken => "application token",
			Operation::InstallationToken => "installation token",
			Operation::InstallationLookup => "installation lookup",
			Operation::PageFetch => "page fetch",
			Operation::FileContent => "file content",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.describe())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `body` inside an operation span, recording attempt and result outcomes.
pub(crate) fn observe<T, E>(
	op: Operation,
	stage: &'static str,
	body: impl FnOnce() -> Result<T, E>,
) -> Result<T, E> {
	let _guard = OperationSpan::new(op, stage).entered();

	record_outcome(op, Outcome::Attempt);

	let result = body();

	match &result {
		Ok(_) => record_outcome(op, Outcome::Success),
		Err(_) => record_outcome(op, Outcome::Failure),
	}

	result
}
