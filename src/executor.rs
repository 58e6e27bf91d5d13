//! Flow session state machine driving challenge rendering and single-submit exchanges.
//!
//! The executor is single-threaded in spirit: every transition happens on a
//! user-interaction or network-callback boundary, never concurrently with another. The
//! session lives behind a mutex so the entry into [`FlowState::Submitting`] is
//! synchronous — once a response is accepted for dispatch, no further input or duplicate
//! submit can slip in before the in-flight call resolves. A session abandoned while a
//! call is in flight is simply released; the late result fails the identity check and is
//! discarded.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	challenge::{FlowAdvance, Response, TerminalOutcome},
	error::{TransportError, ValidationError},
	obs::{self, StageSpan, SubmitLabel},
	registry::StageRegistry,
	stage::{FieldValue, FlowStage},
	transport::ChallengeTransport,
	view::StageView,
};

const SESSION_ID_LEN: usize = 16;

/// States of the flow controller state machine.
///
/// Transitions: `Idle → AwaitingChallenge → Rendering → Submitting → (Rendering |
/// Terminal)`. `Rendering → Submitting` only happens after a response builds locally;
/// a validation failure keeps the session at `Rendering` with inline errors and no
/// network call.
#[derive(Clone, Debug, PartialEq)]
pub enum FlowState {
	/// No session.
	Idle,
	/// Transport call in flight for the first or next challenge.
	AwaitingChallenge,
	/// A bound stage is displayed, waiting for a user-triggered submit.
	Rendering,
	/// Exactly one submission is in flight; further submits are dropped.
	Submitting,
	/// The flow ended; only diagnostics remain readable.
	Terminal(TerminalOutcome),
}
impl FlowState {
	/// Stable label for spans, metrics, and error messages.
	pub const fn as_str(&self) -> &'static str {
		match self {
			FlowState::Idle => "idle",
			FlowState::AwaitingChallenge => "awaiting-challenge",
			FlowState::Rendering => "rendering",
			FlowState::Submitting => "submitting",
			FlowState::Terminal(_) => "terminal",
		}
	}
}
impl Display for FlowState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome of a single submit (or retry) attempt.
#[derive(Debug)]
pub enum SubmitOutcome {
	/// Next challenge installed; the session is rendering again.
	NextChallenge,
	/// The flow ended with the contained outcome.
	Terminal(TerminalOutcome),
	/// Local validation failed; inline markers were installed and no network call was
	/// made.
	Invalid(ValidationError),
	/// A submission is already in flight; this attempt was dropped without a transport
	/// call.
	AlreadySubmitting,
	/// Transient transport failure; prior input is preserved and [`FlowExecutor::retry`]
	/// resubmits after explicit user re-confirmation.
	TransientFailure(TransportError),
	/// The session was released while the call was in flight; the late result was
	/// dropped without touching any state.
	Discarded,
}

struct FlowSession {
	id: String,
	state: FlowState,
	stage: Option<Box<dyn FlowStage>>,
	pending: Option<Response>,
	history: Vec<String>,
}
impl FlowSession {
	fn awaiting() -> Self {
		Self {
			id: random_string(SESSION_ID_LEN),
			state: FlowState::AwaitingChallenge,
			stage: None,
			pending: None,
			history: Vec::new(),
		}
	}

	fn finish(&mut self, outcome: TerminalOutcome) {
		self.stage = None;
		self.pending = None;
		self.state = FlowState::Terminal(outcome);
	}
}

/// Drives the challenge/response loop for one flow session at a time.
///
/// The registry is shared read-only across executors; session state is never shared
/// across sessions.
pub struct FlowExecutor<T>
where
	T: ?Sized + ChallengeTransport,
{
	transport: Arc<T>,
	registry: Arc<StageRegistry>,
	session: Mutex<Option<FlowSession>>,
}
impl<T> FlowExecutor<T>
where
	T: ?Sized + ChallengeTransport,
{
	/// Creates an executor sharing the given transport and stage registry.
	pub fn new(transport: impl Into<Arc<T>>, registry: Arc<StageRegistry>) -> Self {
		Self { transport: transport.into(), registry, session: Mutex::new(None) }
	}

	/// Current state of the session ([`FlowState::Idle`] when none is active).
	pub fn state(&self) -> FlowState {
		self.session.lock().as_ref().map(|s| s.state.clone()).unwrap_or(FlowState::Idle)
	}

	/// Diagnostic trail of past challenge component tags, oldest first.
	///
	/// Retained through terminal states; never used for replay.
	pub fn history(&self) -> Vec<String> {
		self.session.lock().as_ref().map(|s| s.history.clone()).unwrap_or_default()
	}

	/// Enters the flow: fetches the first challenge and binds its stage.
	///
	/// A transport failure here releases the session again; the caller decides whether
	/// to re-enter the flow.
	pub async fn begin(&self) -> Result<FlowState> {
		let span = StageSpan::new("initial", "begin");
		let id = {
			let mut slot = self.session.lock();

			if let Some(session) = slot.as_ref() {
				return Err(Error::InvalidState { state: session.state.as_str() });
			}

			let session = FlowSession::awaiting();
			let id = session.id.clone();

			*slot = Some(session);

			id
		};

		match span.instrument(self.transport.initial()).await {
			Ok(advance) => self.install(&id, advance),
			Err(err) => {
				let mut slot = self.session.lock();

				if slot.as_ref().is_some_and(|s| s.id == id) {
					*slot = None;
				}

				Err(err.into())
			},
		}
	}

	/// Pure view of the current session state.
	///
	/// Suspended states ([`FlowState::AwaitingChallenge`], [`FlowState::Submitting`])
	/// render a loading placeholder so the UI accepts no input while a call is in
	/// flight.
	pub fn render(&self) -> StageView {
		let slot = self.session.lock();

		match slot.as_ref() {
			None => StageView::default(),
			Some(session) => match &session.state {
				FlowState::AwaitingChallenge | FlowState::Submitting => StageView::loading(),
				FlowState::Rendering =>
					session.stage.as_ref().map(|stage| stage.render()).unwrap_or_default(),
				FlowState::Idle | FlowState::Terminal(_) => StageView::default(),
			},
		}
	}

	/// Forwards a user edit to the bound stage; only valid while rendering.
	pub fn apply_input(&self, field: &str, value: FieldValue) -> Result<()> {
		let mut slot = self.session.lock();
		let session = slot.as_mut().ok_or(Error::NoSession)?;

		if session.state != FlowState::Rendering {
			return Err(Error::InvalidState { state: session.state.as_str() });
		}
		if let Some(stage) = session.stage.as_mut() {
			stage.apply_input(field, value);
		}

		Ok(())
	}

	/// Builds the active stage's response and submits it exactly once.
	///
	/// The state moves to [`FlowState::Submitting`] synchronously, so a second submit
	/// while one is pending observes `Submitting` and is dropped without a transport
	/// call.
	pub async fn submit(&self) -> Result<SubmitOutcome> {
		let (id, component, response) = {
			let mut slot = self.session.lock();
			let session = slot.as_mut().ok_or(Error::NoSession)?;

			let component =
				session.stage.as_ref().map(|stage| stage.component()).unwrap_or("unknown");

			match session.state {
				FlowState::Submitting => {
					obs::record_submit_outcome(component, SubmitLabel::Ignored);

					return Ok(SubmitOutcome::AlreadySubmitting);
				},
				FlowState::Rendering => {},
				_ => return Err(Error::InvalidState { state: session.state.as_str() }),
			}

			let stage = session.stage.as_mut().ok_or(Error::SessionClosed)?;

			match stage.build_response() {
				Ok(response) => {
					session.state = FlowState::Submitting;
					session.pending = Some(response.clone());

					(session.id.clone(), component, response)
				},
				Err(validation) => {
					stage.on_error(&validation);
					obs::record_submit_outcome(component, SubmitLabel::Invalid);

					return Ok(SubmitOutcome::Invalid(validation));
				},
			}
		};

		self.dispatch(id, component, response).await
	}

	/// Resubmits the retained response after an explicit user re-confirmation.
	///
	/// Only valid after a transient failure left the session rendering with a pending
	/// response. The executor never retries silently, because the failed submit may
	/// already have mutated server state.
	pub async fn retry(&self) -> Result<SubmitOutcome> {
		let (id, component, response) = {
			let mut slot = self.session.lock();
			let session = slot.as_mut().ok_or(Error::NoSession)?;

			match session.state {
				FlowState::Submitting => return Ok(SubmitOutcome::AlreadySubmitting),
				FlowState::Rendering => {},
				_ => return Err(Error::InvalidState { state: session.state.as_str() }),
			}

			let response = session
				.pending
				.clone()
				.ok_or(Error::InvalidState { state: session.state.as_str() })?;
			let component = session
				.stage
				.as_ref()
				.map(|stage| stage.component())
				.unwrap_or("unknown");

			session.state = FlowState::Submitting;

			(session.id.clone(), component, response)
		};

		self.dispatch(id, component, response).await
	}

	/// Abandons the session (navigation away) and returns its diagnostic history.
	///
	/// An in-flight transport call is not force-aborted; its result fails the session
	/// identity check on arrival and is discarded.
	pub fn abandon(&self) -> Option<Vec<String>> {
		self.session.lock().take().map(|session| session.history)
	}

	async fn dispatch(
		&self,
		id: String,
		component: &'static str,
		response: Response,
	) -> Result<SubmitOutcome> {
		let span = StageSpan::new(component, "submit");

		obs::record_submit_outcome(component, SubmitLabel::Attempt);

		match span.instrument(self.transport.submit(&response)).await {
			Ok(advance) => match self.install(&id, advance) {
				Ok(FlowState::Terminal(outcome)) => {
					let label = if outcome.is_success() {
						SubmitLabel::Advanced
					} else {
						SubmitLabel::Failure
					};

					obs::record_submit_outcome(component, label);

					Ok(SubmitOutcome::Terminal(outcome))
				},
				Ok(_) => {
					obs::record_submit_outcome(component, SubmitLabel::Advanced);

					Ok(SubmitOutcome::NextChallenge)
				},
				Err(Error::SessionClosed) => {
					obs::record_submit_outcome(component, SubmitLabel::Discarded);

					Ok(SubmitOutcome::Discarded)
				},
				Err(err) => {
					obs::record_submit_outcome(component, SubmitLabel::Failure);

					Err(err)
				},
			},
			Err(err) => {
				let mut slot = self.session.lock();
				let Some(session) = slot.as_mut().filter(|s| s.id == id) else {
					obs::record_submit_outcome(component, SubmitLabel::Discarded);

					return Ok(SubmitOutcome::Discarded);
				};

				if err.is_transient() {
					// Prior input and the built response stay put; resubmission happens
					// only through an explicit `retry` confirmation.
					session.state = FlowState::Rendering;

					obs::record_submit_outcome(component, SubmitLabel::Transient);

					Ok(SubmitOutcome::TransientFailure(err))
				} else {
					let outcome = TerminalOutcome::Failure { reason: Some(err.to_string()) };

					session.finish(outcome.clone());
					obs::record_submit_outcome(component, SubmitLabel::Failure);

					Ok(SubmitOutcome::Terminal(outcome))
				}
			},
		}
	}

	/// Applies a transport result to the session, if it is still the live one.
	fn install(&self, id: &str, advance: FlowAdvance) -> Result<FlowState> {
		let mut slot = self.session.lock();
		let Some(session) = slot.as_mut().filter(|s| s.id == id) else {
			return Err(Error::SessionClosed);
		};

		match advance {
			FlowAdvance::Terminal(outcome) => session.finish(outcome),
			FlowAdvance::Next(challenge) => {
				session.history.push(challenge.component.clone());

				let mut stage = match self.registry.resolve(&challenge.component) {
					Ok(stage) => stage,
					Err(err) => {
						// Unknown component is fatal to the session; the user sees a
						// generic unsupported-step failure instead of the raw tag.
						session.finish(TerminalOutcome::unsupported_step());

						return Err(err);
					},
				};

				if let Err(err) = stage.bind(challenge) {
					debug_assert!(
						!matches!(err, Error::BindMismatch(_)),
						"registry resolved a stage whose tag does not match: {err}"
					);
					session.finish(TerminalOutcome::unsupported_step());

					return Err(err);
				}

				session.stage = Some(stage);
				session.pending = None;
				session.state = FlowState::Rendering;
			},
		}

		Ok(session.state.clone())
	}
}
impl<T> Debug for FlowExecutor<T>
where
	T: ?Sized + ChallengeTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FlowExecutor")
			.field("state", &self.state())
			.field("registry", &self.registry)
			.finish()
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::Value;
	// self
	use super::*;
	use crate::{_preludet::build_scripted_executor, challenge::Challenge};

	#[test]
	fn executor_starts_idle() {
		let (_, executor) = build_scripted_executor();

		assert_eq!(executor.state(), FlowState::Idle);
		assert!(executor.history().is_empty());
		assert_eq!(executor.render(), StageView::default());
	}

	#[tokio::test]
	async fn begin_installs_the_first_challenge() {
		let (transport, executor) = build_scripted_executor();

		transport.push(Ok(FlowAdvance::Next(
			Challenge::new("ak-stage-consent").with_field("token", Value::String("T".into())),
		)));

		let state = executor.begin().await.expect("Entering the flow should succeed.");

		assert_eq!(state, FlowState::Rendering);
		assert_eq!(executor.history(), vec!["ak-stage-consent".to_owned()]);
	}

	#[tokio::test]
	async fn begin_twice_is_rejected() {
		let (transport, executor) = build_scripted_executor();

		transport.push(Ok(FlowAdvance::Next(
			Challenge::new("ak-stage-consent").with_field("token", Value::String("T".into())),
		)));
		executor.begin().await.expect("First entry should succeed.");

		let err = executor.begin().await.expect_err("Re-entering an active flow should fail.");

		assert!(matches!(err, Error::InvalidState { state: "rendering" }));
	}

	#[tokio::test]
	async fn failed_begin_releases_the_session() {
		let (transport, executor) = build_scripted_executor();

		transport.push(Err(TransportError::Permanent {
			message: "flow not found".into(),
			status: Some(404),
		}));

		let err = executor.begin().await.expect_err("Failed entry should propagate.");

		assert!(matches!(err, Error::Transport(_)));
		assert_eq!(executor.state(), FlowState::Idle);
	}
}
