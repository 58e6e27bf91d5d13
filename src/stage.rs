//! Stage capability contract and built-in stage implementations.

pub mod consent;
pub mod dual_select;
pub mod radius;

pub use consent::ConsentStage;
pub use dual_select::{DualSelectPage, DualSelectPair, PairProvider, SelectedSelector};
pub use radius::RadiusProviderFormStage;

// self
use crate::{
	_prelude::*,
	challenge::{Challenge, Response},
	error::{BindMismatchError, ValidationError},
	view::StageView,
};

/// Value of one user edit pushed into a stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
	/// Free-form text input.
	Text(String),
	/// Toggle/checkbox input.
	Bool(bool),
	/// Multi-select association keys (dual-select widgets).
	Keys(Vec<String>),
}

/// Capability implemented by every concrete flow stage: render one challenge, collect one
/// response.
///
/// A stage owns its working copy of any resource being edited; nothing is shared across
/// stages. Rendering is a pure function of the bound challenge plus local edits and must
/// not touch session state.
pub trait FlowStage
where
	Self: Send,
{
	/// Component tag the stage renders; must equal its registry key.
	fn component(&self) -> &'static str;

	/// Stores the challenge for rendering.
	///
	/// Implementations accept any challenge whose tag matches [`component`](Self::component)
	/// and fail fast on a mismatch; that failure is a programming defect, not a
	/// user-recoverable condition.
	fn bind(&mut self, challenge: Challenge) -> Result<()>;

	/// Pure view of the bound challenge plus local editable state.
	fn render(&self) -> StageView;

	/// Records a user edit. Unknown field names are ignored.
	fn apply_input(&mut self, _field: &str, _value: FieldValue) {}

	/// Validates local state against the challenge's required fields and builds the
	/// outgoing response. Called exactly once per submit action; a failure blocks
	/// submission and never reaches the transport.
	fn build_response(&self) -> Result<Response, ValidationError>;

	/// Installs server- or locally-reported field errors for the next render without
	/// losing user-entered state. The default implementation ignores them.
	fn on_error(&mut self, _errors: &ValidationError) {}
}

/// Verifies a challenge's tag against the stage's registration key before binding.
pub fn ensure_component(
	expected: &'static str,
	challenge: &Challenge,
) -> Result<(), BindMismatchError> {
	if challenge.component == expected {
		Ok(())
	} else {
		Err(BindMismatchError { expected, actual: challenge.component.clone() })
	}
}
