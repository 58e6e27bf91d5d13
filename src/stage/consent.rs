//! Consent stage: presents the permissions an application holds or requests and forwards
//! the challenge token on continue.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	challenge::{Challenge, Response},
	error::ValidationError,
	stage::{self, FlowStage},
	view::{PermissionItem, StageView, ViewNode},
};

/// Registry tag of the consent stage.
pub const COMPONENT: &str = "ak-stage-consent";

// Special case for the openid scope: present in the payload for accounting only.
const OPENID_SCOPE_ID: &str = "openid";

/// Step fields of an `ak-stage-consent` challenge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentChallenge {
	/// Heading shown above the permission lists.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub header_text: Option<String>,
	/// Permissions the application holds or requests.
	#[serde(default)]
	pub permissions: Vec<ConsentPermission>,
	/// Newly requested permissions beyond an earlier consent.
	#[serde(default)]
	pub additional_permissions: Vec<ConsentPermission>,
	/// Opaque token that must round-trip in the response.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token: Option<String>,
}

/// Single permission entry of a consent challenge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentPermission {
	/// Stable permission/scope identifier.
	pub id: String,
	/// Human-readable permission name; empty names carry no presentable meaning.
	pub name: String,
}

/// Filters a permission list down to its presentable entries, order-preserved.
///
/// Entries whose name is empty, or whose id equals the `openid` sentinel, exist in the
/// payload for accounting and are never shown to the user. The filter is additive over
/// the challenge data; the underlying list is untouched.
pub fn render_permissions(perms: &[ConsentPermission]) -> Vec<PermissionItem> {
	perms
		.iter()
		.filter(|p| !p.name.is_empty() && p.id != OPENID_SCOPE_ID)
		.map(|p| PermissionItem { code: p.id.clone(), label: p.name.clone() })
		.collect()
}

/// Stage rendering `ak-stage-consent` challenges.
#[derive(Debug, Default)]
pub struct ConsentStage {
	title: Option<String>,
	data: Option<ConsentChallenge>,
}
impl ConsentStage {
	/// Creates an unbound consent stage.
	pub fn new() -> Self {
		Self::default()
	}

	fn render_no_previous(&self, data: &ConsentChallenge, mut view: StageView) -> StageView {
		if let Some(header) = &data.header_text {
			view = view.with_node(ViewNode::Heading(header.clone()));
		}
		if !data.permissions.is_empty() {
			view = view
				.with_node(ViewNode::Paragraph(
					"Application requires following permissions:".into(),
				))
				.with_node(ViewNode::PermissionList(render_permissions(&data.permissions)));
		}

		view
	}

	fn render_additional(&self, data: &ConsentChallenge, mut view: StageView) -> StageView {
		if let Some(header) = &data.header_text {
			view = view.with_node(ViewNode::Heading(header.clone()));
		}
		if !data.permissions.is_empty() {
			view = view
				.with_node(ViewNode::Paragraph(
					"Application already has access to the following permissions:".into(),
				))
				.with_node(ViewNode::PermissionList(render_permissions(&data.permissions)));
		}

		view.with_node(ViewNode::Paragraph("Application requires following new permissions:".into()))
			.with_node(ViewNode::PermissionList(render_permissions(&data.additional_permissions)))
	}
}
impl FlowStage for ConsentStage {
	fn component(&self) -> &'static str {
		COMPONENT
	}

	fn bind(&mut self, challenge: Challenge) -> Result<()> {
		stage::ensure_component(COMPONENT, &challenge)?;

		self.title = challenge.title().map(str::to_owned);
		self.data = Some(challenge.decode_fields()?);

		Ok(())
	}

	fn render(&self) -> StageView {
		let Some(data) = &self.data else {
			return StageView::loading();
		};
		let view = StageView::titled(self.title.clone());
		let view = if data.additional_permissions.is_empty() {
			self.render_no_previous(data, view)
		} else {
			self.render_additional(data, view)
		};

		view.with_node(ViewNode::Submit { label: "Continue".into() })
	}

	fn build_response(&self) -> Result<Response, ValidationError> {
		let token = self.data.as_ref().and_then(|data| data.token.clone()).ok_or_else(|| {
			ValidationError::new().with_field("token", "Consent challenge is missing its token.")
		})?;
		let mut payload = Map::new();

		payload.insert("token".into(), Value::String(token));

		Ok(Response::new(COMPONENT, payload))
	}
}
