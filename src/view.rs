//! Pure-data render output produced by stages.
//!
//! Rendering is a pure function of the bound challenge plus local edits: stages emit a
//! [`StageView`] tree and the embedding UI layer decides how to draw it. Keeping the view
//! as plain data means re-rendering after a state transition has no ordering-sensitive
//! side effects.

/// Complete view of one rendered stage (or of the executor's own placeholder states).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageView {
	/// Flow title, when the challenge carried display metadata.
	pub title: Option<String>,
	/// `true` while a transport call is in flight and the UI should suspend input.
	pub loading: bool,
	/// Ordered nodes making up the stage body.
	pub nodes: Vec<ViewNode>,
}
impl StageView {
	/// Creates an empty view with the given title.
	pub fn titled(title: Option<String>) -> Self {
		Self { title, ..Self::default() }
	}

	/// Placeholder view shown while waiting on the transport.
	pub fn loading() -> Self {
		Self { loading: true, ..Self::default() }
	}

	/// Appends a node to the stage body.
	pub fn with_node(mut self, node: ViewNode) -> Self {
		self.nodes.push(node);

		self
	}

	/// Looks up a form field node by wire name.
	pub fn field(&self, name: &str) -> Option<&FieldView> {
		self.nodes.iter().find_map(|node| match node {
			ViewNode::Field(field) if field.name == name => Some(field),
			_ => None,
		})
	}
}

/// One node of a stage body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewNode {
	/// Section heading.
	Heading(String),
	/// Explanatory paragraph.
	Paragraph(String),
	/// Bullet list of granted/requested permissions.
	PermissionList(Vec<PermissionItem>),
	/// Editable form field.
	Field(FieldView),
	/// Paginated dual-select association widget.
	DualSelect(DualSelectView),
	/// Submit affordance ending the stage.
	Submit {
		/// Button label.
		label: String,
	},
}

/// Single presentable permission entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionItem {
	/// Stable permission code attached to the entry.
	pub code: String,
	/// Human-readable permission name.
	pub label: String,
}

/// Editable form field with an inline error marker slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldView {
	/// Wire name of the field (part of the response contract).
	pub name: String,
	/// Display label.
	pub label: String,
	/// Current value, when one is set or defaulted.
	pub value: Option<String>,
	/// Whether submission requires a value.
	pub required: bool,
	/// Helper text shown beneath the input.
	pub help: Option<String>,
	/// Inline validation marker, populated on failed submits.
	pub error: Option<String>,
}
impl FieldView {
	/// Creates a field with the given wire name and label.
	pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			label: label.into(),
			value: None,
			required: false,
			help: None,
			error: None,
		}
	}

	/// Sets the current value.
	pub fn with_value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(value.into());

		self
	}

	/// Sets the current value when one exists.
	pub fn with_optional_value(mut self, value: Option<&str>) -> Self {
		self.value = value.map(str::to_owned);

		self
	}

	/// Marks the field as required.
	pub fn required(mut self) -> Self {
		self.required = true;

		self
	}

	/// Attaches helper text.
	pub fn with_help(mut self, help: impl Into<String>) -> Self {
		self.help = Some(help.into());

		self
	}

	/// Attaches an inline validation marker.
	pub fn with_error(mut self, error: Option<&str>) -> Self {
		self.error = error.map(str::to_owned);

		self
	}
}

/// Dual-select widget pairing an on-demand "available" pool with the selected keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DualSelectView {
	/// Wire name of the association field.
	pub name: String,
	/// Label above the available pool.
	pub available_label: String,
	/// Label above the selected pool.
	pub selected_label: String,
	/// Currently selected item keys, in association order.
	pub selected: Vec<String>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn field_lookup_finds_nodes_by_wire_name() {
		let view = StageView::titled(Some("Edit provider".into()))
			.with_node(ViewNode::Field(FieldView::new("name", "Name").required()))
			.with_node(ViewNode::Submit { label: "Continue".into() });

		assert!(view.field("name").expect("Field node should be present.").required);
		assert!(view.field("missing").is_none());
		assert!(!view.loading);
	}

	#[test]
	fn loading_view_suspends_input() {
		let view = StageView::loading();

		assert!(view.loading);
		assert!(view.nodes.is_empty());
	}
}
