// self
use crate::{_prelude::*, obs::Operation};

/// A span builder used by blocking operations.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(op: Operation, stage: &'static str) -> Self {
		let span = tracing::info_span!("github_app_broker.op", op = op.as_str(), stage);

		Self { span }
	}

	/// Enters the span for the remainder of the calling scope.
	pub fn entered(self) -> OperationSpanGuard {
		OperationSpanGuard { _guard: self.span.entered() }
	}
}

/// RAII guard returned by [`OperationSpan::entered`].
pub struct OperationSpanGuard {
	_guard: tracing::span::EnteredSpan,
}
impl Debug for OperationSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OperationSpanGuard(..)")
	}
}
