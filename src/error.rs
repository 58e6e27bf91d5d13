//! Executor-level error types shared across stages, the registry, and transports.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical executor error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Challenge names a component no stage factory was registered for.
	///
	/// Fatal to the current session; surfaced to end users as a generic unsupported-step
	/// message rather than the raw tag.
	#[error("No stage is registered for component `{component}`.")]
	UnknownStage {
		/// Component tag carried by the offending challenge.
		component: String,
	},
	/// Local pre-submit validation failure; never reaches the transport.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// A stage was asked to bind a challenge tagged for a different component.
	#[error(transparent)]
	BindMismatch(#[from] BindMismatchError),
	/// Transport failure while exchanging a response for the next challenge.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// No flow session is active.
	#[error("No flow session is active.")]
	NoSession,
	/// The session finished or was abandoned before the operation could apply.
	#[error("The flow session has already finished or was abandoned.")]
	SessionClosed,
	/// Operation is not valid for the session's current state.
	#[error("Operation is not permitted while the session is {state}.")]
	InvalidState {
		/// Stable label of the state the session was in.
		state: &'static str,
	},
}

/// Field-scoped validation failure raised before a response leaves its stage.
///
/// Carries one entry per failing field so callers can attach inline markers next to the
/// corresponding inputs and re-render without losing user-entered state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("Validation failed for: {}.", self.field_list())]
pub struct ValidationError {
	/// Individual field failures, in the order they were detected.
	pub errors: Vec<FieldError>,
}
impl ValidationError {
	/// Creates an empty error to accumulate field failures into.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a failure for the named field.
	pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
		self.errors.push(FieldError { field: field.into(), message: message.into() });
	}

	/// Builder-style variant of [`push`](Self::push).
	pub fn with_field(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
		self.push(field, message);

		self
	}

	/// Message recorded for the named field, if any.
	pub fn for_field(&self, field: &str) -> Option<&str> {
		self.errors.iter().find(|e| e.field == field).map(|e| e.message.as_str())
	}

	/// Returns `true` when no field failed.
	pub fn is_empty(&self) -> bool {
		self.errors.is_empty()
	}

	/// Converts the accumulator into a result: `Ok` when empty, `Err(self)` otherwise.
	pub fn into_result(self) -> Result<(), Self> {
		if self.is_empty() { Ok(()) } else { Err(self) }
	}

	fn field_list(&self) -> String {
		self.errors.iter().map(|e| e.field.as_str()).collect::<Vec<_>>().join(", ")
	}
}

/// Single field failure inside a [`ValidationError`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
	/// Wire name of the failing field (e.g. `name`, `token`).
	pub field: String,
	/// Human-readable message for the inline marker.
	pub message: String,
}

/// A stage was bound against a challenge whose component tag is not its own.
///
/// Programming-defect class: the executor `debug_assert!`s on it during development and
/// degrades to the [`Error::UnknownStage`] path in release builds.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Stage for `{expected}` cannot bind a challenge tagged `{actual}`.")]
pub struct BindMismatchError {
	/// Component tag the stage was registered under.
	pub expected: &'static str,
	/// Component tag the challenge actually carried.
	pub actual: String,
}

/// Failures raised by [`ChallengeTransport`](crate::transport::ChallengeTransport)
/// implementations.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Temporary upstream failure; the retained response may be resubmitted after explicit
	/// user re-confirmation.
	#[error("Flow endpoint failed transiently: {message}.")]
	Transient {
		/// Server- or transport-supplied summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Server explicitly rejected the flow (e.g. expired session); ends the session.
	#[error("Flow endpoint rejected the session: {message}.")]
	Permanent {
		/// Server-supplied rejection summary.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Flow endpoint responded with malformed JSON that could not be parsed.
	#[error("Flow endpoint returned malformed JSON.")]
	ChallengeParse {
		/// Structured parsing failure with the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the flow endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the flow endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Returns `true` for failures that are safe to surface with a retry affordance.
	///
	/// Malformed payloads count as transient: a proxy error page or truncated body is
	/// indistinguishable from an upstream hiccup at this layer.
	pub fn is_transient(&self) -> bool {
		!matches!(self, Self::Permanent { .. })
	}

	/// HTTP status associated with the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Transient { status, .. }
			| Self::Permanent { status, .. }
			| Self::ChallengeParse { status, .. } => *status,
			Self::Network { .. } | Self::Io(_) => None,
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for TransportError {
	fn from(e: reqwest::Error) -> Self {
		Self::network(e)
	}
}
