// self
use crate::{_prelude::*, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by broker flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("wiki_action_broker.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits an info-level event when a privileged action completes (actor, target, wiki).
pub fn record_action_success(action: &str, actor: &str, target: &str, wiki: &str) {
	#[cfg(feature = "tracing")]
	tracing::info!(action, actor, target, wiki, "Action completed.");
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (action, actor, target, wiki);
	}
}

/// Emits a warn-level event carrying full remote diagnostic detail; end users only ever
/// see a generic localized message.
pub fn record_remote_failure(stage: &str, status: Option<u16>, detail: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(stage, status, detail, "Remote call failed.");
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, status, detail);
	}
}

/// Emits a warn-level event for a non-fatal credential-store write failure.
pub fn record_store_failure(operation: &str, detail: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(operation, detail, "Credential store write failed.");
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, detail);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn events_are_noop_without_tracing() {
		record_action_success("block", "123456", "Vandal", "https://wiki.example/w/");
		record_remote_failure("block", Some(502), "HTTP 502");
		record_store_failure("upsert", "database unreachable");
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
