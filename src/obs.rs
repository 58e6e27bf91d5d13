//! Optional observability helpers for flow sessions.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `flow_executor.stage` with the
//!   `component` (challenge tag) and `op` (call site) fields.
//! - Enable `metrics` to increment the `flow_executor_submit_total` counter for every
//!   submit attempt and outcome, labeled by `component` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each submit or retry attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubmitLabel {
	/// Entry into a submit or retry operation.
	Attempt,
	/// The flow advanced to the next challenge or ended successfully.
	Advanced,
	/// Local validation blocked the submission before any network call.
	Invalid,
	/// A duplicate submit was dropped while another was in flight.
	Ignored,
	/// Transient transport failure; the session awaits an explicit retry.
	Transient,
	/// The session ended in failure.
	Failure,
	/// A late result arrived for a released session and was discarded.
	Discarded,
}
impl SubmitLabel {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SubmitLabel::Attempt => "attempt",
			SubmitLabel::Advanced => "advanced",
			SubmitLabel::Invalid => "invalid",
			SubmitLabel::Ignored => "ignored",
			SubmitLabel::Transient => "transient",
			SubmitLabel::Failure => "failure",
			SubmitLabel::Discarded => "discarded",
		}
	}
}
impl Display for SubmitLabel {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
