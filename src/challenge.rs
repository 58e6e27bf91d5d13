//! Wire data model for server-driven flow steps.
//!
//! A [`Challenge`] is the server's opaque description of the next required user step; its
//! `component` tag selects the stage that renders it and its remaining fields are only
//! interpreted by that stage. A [`Response`] is the client-built answer carrying the same
//! step identity, and [`FlowAdvance`] classifies what the transport handed back.

// crates.io
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, error::TransportError};

/// Component tag ending a flow successfully.
pub const TERMINAL_SUCCESS: &str = "terminal-success";
/// Component tag ending a flow with an unrecoverable failure.
pub const TERMINAL_FAILURE: &str = "terminal-failure";
/// Component tag sending the user agent elsewhere to continue.
pub const REDIRECT_COMPONENT: &str = "xak-flow-redirect";

/// Server-issued description of the next required user step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
	/// Component tag selecting the stage implementation.
	pub component: String,
	/// Optional display metadata for the running flow.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub flow_info: Option<FlowInfo>,
	/// Step-specific payload interpreted by the bound stage.
	#[serde(flatten)]
	pub fields: Map<String, Value>,
}
impl Challenge {
	/// Creates a challenge with the given component tag and no step fields.
	pub fn new(component: impl Into<String>) -> Self {
		Self { component: component.into(), flow_info: None, fields: Map::new() }
	}

	/// Attaches display metadata.
	pub fn with_flow_info(mut self, info: FlowInfo) -> Self {
		self.flow_info = Some(info);

		self
	}

	/// Adds a step field by wire name.
	pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
		self.fields.insert(name.into(), value);

		self
	}

	/// Looks up a single step field by wire name.
	pub fn field(&self, name: &str) -> Option<&Value> {
		self.fields.get(name)
	}

	/// Flow title carried by the display metadata, if any.
	pub fn title(&self) -> Option<&str> {
		self.flow_info.as_ref().and_then(|info| info.title.as_deref())
	}

	/// Decodes the step fields into a stage-owned shape, reporting the failing path.
	pub fn decode_fields<T>(&self) -> Result<T, TransportError>
	where
		T: DeserializeOwned,
	{
		serde_path_to_error::deserialize(Value::Object(self.fields.clone()))
			.map_err(|source| TransportError::ChallengeParse { source, status: None })
	}
}

/// Display metadata shared by every step of a flow.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowInfo {
	/// Title displayed above the active stage.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
}
impl FlowInfo {
	/// Creates metadata carrying only a title.
	pub fn titled(title: impl Into<String>) -> Self {
		Self { title: Some(title.into()) }
	}
}

/// Client-built answer to exactly one challenge.
///
/// The embedded component tag is the step identity: the executor only ever submits a
/// response against the challenge most recently bound, so cross-step reuse is impossible.
/// Stages construct responses; the executor never does.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Response {
	component: String,
	#[serde(flatten)]
	payload: Map<String, Value>,
}
impl Response {
	/// Creates a response answering the challenge tagged `component`.
	pub fn new(component: impl Into<String>, payload: Map<String, Value>) -> Self {
		Self { component: component.into(), payload }
	}

	/// Component tag of the challenge this response answers.
	pub fn component(&self) -> &str {
		&self.component
	}

	/// Step-specific payload fields.
	pub fn payload(&self) -> &Map<String, Value> {
		&self.payload
	}

	/// Looks up a single payload field by wire name.
	pub fn field(&self, name: &str) -> Option<&Value> {
		self.payload.get(name)
	}
}

/// Flow-ending result after which no further challenges are issued.
#[derive(Clone, Debug, PartialEq)]
pub enum TerminalOutcome {
	/// Flow completed successfully.
	Success,
	/// Server ended the flow unrecoverably.
	Failure {
		/// Server-supplied reason, when one was given.
		reason: Option<String>,
	},
	/// User agent must be sent to another location to continue.
	Redirect {
		/// Destination the flow handed control to.
		to: Url,
	},
}
impl TerminalOutcome {
	/// Failure outcome shown when a challenge names an unregistered component.
	pub fn unsupported_step() -> Self {
		Self::Failure { reason: Some("This flow step is not supported.".into()) }
	}

	/// Returns `true` for the success outcome.
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success)
	}
}

/// Either the next challenge of a running flow or its terminal outcome.
#[derive(Clone, Debug, PartialEq)]
pub enum FlowAdvance {
	/// The flow continues with another step.
	Next(Challenge),
	/// The flow ended; the session must not submit again.
	Terminal(TerminalOutcome),
}
impl FlowAdvance {
	/// Classifies a decoded challenge payload into the next step or a terminal outcome.
	pub fn from_challenge(challenge: Challenge) -> Self {
		match challenge.component.as_str() {
			TERMINAL_SUCCESS => Self::Terminal(TerminalOutcome::Success),
			TERMINAL_FAILURE => {
				let reason =
					challenge.field("error").and_then(Value::as_str).map(str::to_owned);

				Self::Terminal(TerminalOutcome::Failure { reason })
			},
			REDIRECT_COMPONENT =>
				match challenge
					.field("to")
					.and_then(Value::as_str)
					.and_then(|raw| Url::parse(raw).ok())
				{
					Some(to) => Self::Terminal(TerminalOutcome::Redirect { to }),
					None => Self::Terminal(TerminalOutcome::Failure {
						reason: Some("Redirect challenge is missing a destination.".into()),
					}),
				},
			_ => Self::Next(challenge),
		}
	}
}
