//! Radius provider configuration form, rendered as one stage of an admin flow.

// crates.io
use rand::{Rng, distr::Alphanumeric};
use serde_json::{Map, Value};
#[cfg(feature = "reqwest")] use reqwest::Client as ReqwestClient;
// self
#[cfg(feature = "reqwest")]
use crate::{
	api::{PageQuery, PageResponse},
	error::TransportError,
	stage::dual_select::{DualSelectPage, PageFuture},
	transport,
};
use crate::{
	_prelude::*,
	challenge::{Challenge, Response},
	error::ValidationError,
	stage::{
		self, FieldValue, FlowStage,
		dual_select::{PairProvider, SelectedSelector},
	},
	view::{DualSelectView, FieldView, StageView, ViewNode},
};

/// Registry tag of the radius provider form stage.
pub const COMPONENT: &str = "ak-provider-radius-form";

/// Invalidation flow slug preselected for new providers.
pub const DEFAULT_INVALIDATION_FLOW: &str = "default-provider-invalidation-flow";

/// Length of the generated shared-secret default.
pub const SHARED_SECRET_LEN: usize = 128;

const DEFAULT_CLIENT_NETWORKS: &str = "0.0.0.0/0, ::/0";

/// Radius provider record as the server expects it; field names are part of the wire
/// contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadiusProvider {
	/// Primary key of an existing provider (absent on create).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pk: Option<i64>,
	/// Display name.
	pub name: String,
	/// Flow slot reused for the authentication flow; see [`RadiusProviderFormStage`].
	pub authorization_flow: String,
	/// Whether code-based MFA is supported.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub mfa_support: Option<bool>,
	/// Shared secret clients authenticate with.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub shared_secret: Option<String>,
	/// Comma-separated CIDRs clients may connect from.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_networks: Option<String>,
	/// Keys of the associated property mappings.
	#[serde(default)]
	pub property_mappings: Vec<String>,
	/// Flow used when logging out of the provider.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub invalidation_flow: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RadiusFormChallenge {
	#[serde(default)]
	instance: Option<RadiusProvider>,
}

#[derive(Clone, Debug)]
struct FormState {
	name: String,
	authentication_flow: Option<String>,
	mfa_support: bool,
	shared_secret: String,
	client_networks: String,
	property_mappings: Vec<String>,
	invalidation_flow: Option<String>,
}
impl FormState {
	fn from_instance(instance: Option<&RadiusProvider>) -> Self {
		Self {
			name: instance.map(|i| i.name.clone()).unwrap_or_default(),
			authentication_flow: instance
				.map(|i| i.authorization_flow.clone())
				.filter(|flow| !flow.is_empty()),
			mfa_support: instance.and_then(|i| i.mfa_support).unwrap_or(true),
			shared_secret: instance
				.and_then(|i| i.shared_secret.clone())
				.unwrap_or_else(|| random_string(SHARED_SECRET_LEN)),
			client_networks: instance
				.and_then(|i| i.client_networks.clone())
				.unwrap_or_else(|| DEFAULT_CLIENT_NETWORKS.into()),
			property_mappings: instance.map(|i| i.property_mappings.clone()).unwrap_or_default(),
			invalidation_flow: instance
				.and_then(|i| i.invalidation_flow.clone())
				.or_else(|| Some(DEFAULT_INVALIDATION_FLOW.into())),
		}
	}
}

/// Stage rendering `ak-provider-radius-form` challenges.
///
/// The challenge optionally carries an existing provider under its `instance` field
/// (update); otherwise the form starts from defaults (create). The stage exclusively
/// owns its working copy of the record being edited.
#[derive(Default)]
pub struct RadiusProviderFormStage {
	title: Option<String>,
	instance: Option<RadiusProvider>,
	form: Option<FormState>,
	selector: SelectedSelector,
	mappings_provider: Option<Arc<dyn PairProvider>>,
	errors: ValidationError,
}
impl RadiusProviderFormStage {
	/// Creates an unbound form stage.
	pub fn new() -> Self {
		Self::default()
	}

	/// Attaches the paginated source feeding the property-mappings dual-select.
	pub fn with_mappings_provider(mut self, provider: Arc<dyn PairProvider>) -> Self {
		self.mappings_provider = Some(provider);

		self
	}

	/// Instance being edited, when the challenge carried one.
	pub fn instance(&self) -> Option<&RadiusProvider> {
		self.instance.as_ref()
	}

	/// Selector partitioning property mappings into selected vs available.
	pub fn mappings_selector(&self) -> &SelectedSelector {
		&self.selector
	}

	/// Paginated source for the available property-mappings pool, when attached.
	pub fn mappings_provider(&self) -> Option<&Arc<dyn PairProvider>> {
		self.mappings_provider.as_ref()
	}

	fn field(&self, name: &str, label: &str, value: Option<&str>) -> FieldView {
		FieldView::new(name, label)
			.with_optional_value(value)
			.with_error(self.errors.for_field(name))
	}
}
impl Debug for RadiusProviderFormStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RadiusProviderFormStage")
			.field("instance", &self.instance)
			.field("selector", &self.selector)
			.field("has_mappings_provider", &self.mappings_provider.is_some())
			.finish()
	}
}
impl FlowStage for RadiusProviderFormStage {
	fn component(&self) -> &'static str {
		COMPONENT
	}

	fn bind(&mut self, challenge: Challenge) -> Result<()> {
		stage::ensure_component(COMPONENT, &challenge)?;

		let data: RadiusFormChallenge = challenge.decode_fields()?;

		self.title = challenge.title().map(str::to_owned);
		self.form = Some(FormState::from_instance(data.instance.as_ref()));
		// Built once per instance load; per-item partitioning stays an O(1) set lookup.
		self.selector = SelectedSelector::from_keys(
			data.instance.as_ref().map(|i| i.property_mappings.iter().cloned()),
		);
		self.instance = data.instance;
		self.errors = ValidationError::new();

		Ok(())
	}

	fn render(&self) -> StageView {
		let Some(form) = &self.form else {
			return StageView::loading();
		};

		StageView::titled(self.title.clone())
			.with_node(ViewNode::Field(
				self.field("name", "Name", Some(&form.name)).required(),
			))
			.with_node(ViewNode::Field(
				self.field(
					"authorizationFlow",
					"Authentication flow",
					form.authentication_flow.as_deref(),
				)
				.required()
				.with_help("Flow used for users to authenticate."),
			))
			.with_node(ViewNode::Field(
				self.field(
					"mfaSupport",
					"Code-based MFA Support",
					Some(if form.mfa_support { "true" } else { "false" }),
				)
				.with_help(
					"When enabled, code-based multi-factor authentication can be used by \
					 appending a semicolon and the TOTP code to the password.",
				),
			))
			.with_node(ViewNode::Field(
				self.field("sharedSecret", "Shared secret", Some(&form.shared_secret)).required(),
			))
			.with_node(ViewNode::Field(
				self.field("clientNetworks", "Client Networks", Some(&form.client_networks))
					.required()
					.with_help(
						"List of CIDRs (comma-seperated) that clients can connect from. A more \
						 specific CIDR will match before a looser one.",
					),
			))
			.with_node(ViewNode::DualSelect(DualSelectView {
				name: "propertyMappings".into(),
				available_label: "Available Property Mappings".into(),
				selected_label: "Selected Property Mappings".into(),
				selected: form.property_mappings.clone(),
			}))
			.with_node(ViewNode::Field(
				self.field(
					"invalidationFlow",
					"Invalidation flow",
					form.invalidation_flow.as_deref(),
				)
				.required()
				.with_help("Flow used when logging out of this provider."),
			))
			.with_node(ViewNode::Submit { label: "Continue".into() })
	}

	fn apply_input(&mut self, field: &str, value: FieldValue) {
		let Some(form) = self.form.as_mut() else {
			return;
		};

		match (field, value) {
			("name", FieldValue::Text(text)) => form.name = text,
			("authorizationFlow", FieldValue::Text(text)) =>
				form.authentication_flow = Some(text),
			("mfaSupport", FieldValue::Bool(flag)) => form.mfa_support = flag,
			("sharedSecret", FieldValue::Text(text)) => form.shared_secret = text,
			("clientNetworks", FieldValue::Text(text)) => form.client_networks = text,
			("propertyMappings", FieldValue::Keys(keys)) => form.property_mappings = keys,
			("invalidationFlow", FieldValue::Text(text)) => form.invalidation_flow = Some(text),
			_ => {},
		}
	}

	fn build_response(&self) -> Result<Response, ValidationError> {
		let Some(form) = &self.form else {
			return Err(ValidationError::new().with_field("name", "No challenge is bound."));
		};
		let mut errors = ValidationError::new();

		if form.name.trim().is_empty() {
			errors.push("name", "Name is required.");
		}
		if form.authentication_flow.as_deref().is_none_or(|flow| flow.trim().is_empty()) {
			errors.push("authorizationFlow", "Authentication flow is required.");
		}
		if form.shared_secret.trim().is_empty() {
			errors.push("sharedSecret", "Shared secret is required.");
		}
		if form.client_networks.trim().is_empty() {
			errors.push("clientNetworks", "Client Networks is required.");
		}
		if form.invalidation_flow.as_deref().is_none_or(|flow| flow.trim().is_empty()) {
			errors.push("invalidationFlow", "Invalidation flow is required.");
		}

		errors.into_result()?;

		let mut payload = Map::new();

		if let Some(pk) = self.instance.as_ref().and_then(|i| i.pk) {
			payload.insert("pk".into(), Value::Number(pk.into()));
		}

		payload.insert("name".into(), Value::String(form.name.clone()));
		// Every provider record has an authorization-flow slot, but the radius provider
		// only has an authentication flow. The shared schema is reused on purpose: the
		// selected authentication flow is stored in the `authorizationFlow` field of the
		// outgoing response. Changing this breaks server compatibility.
		payload.insert(
			"authorizationFlow".into(),
			Value::String(form.authentication_flow.clone().unwrap_or_default()),
		);
		payload.insert("mfaSupport".into(), Value::Bool(form.mfa_support));
		payload.insert("sharedSecret".into(), Value::String(form.shared_secret.clone()));
		payload.insert("clientNetworks".into(), Value::String(form.client_networks.clone()));
		payload.insert(
			"propertyMappings".into(),
			Value::Array(
				form.property_mappings.iter().cloned().map(Value::String).collect(),
			),
		);
		payload.insert(
			"invalidationFlow".into(),
			Value::String(form.invalidation_flow.clone().unwrap_or_default()),
		);

		Ok(Response::new(COMPONENT, payload))
	}

	fn on_error(&mut self, errors: &ValidationError) {
		self.errors = errors.clone();
	}
}

/// Record returned by the radius property-mappings list endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadiusPropertyMapping {
	/// Primary key used as the association key.
	pub pk: String,
	/// Display name used for both labels.
	pub name: String,
}

#[cfg(feature = "reqwest")]
/// Paginated source for radius property mappings backed by the admin list API.
#[derive(Clone, Debug)]
pub struct RadiusPropertyMappingsProvider {
	client: ReqwestClient,
	endpoint: Url,
}
#[cfg(feature = "reqwest")]
impl RadiusPropertyMappingsProvider {
	/// Creates a provider querying `propertymappings/provider/radius/` under `base`.
	pub fn new(base: &Url) -> Result<Self, url::ParseError> {
		Self::with_client(ReqwestClient::default(), base)
	}

	/// Variant of [`new`](Self::new) reusing an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient, base: &Url) -> Result<Self, url::ParseError> {
		Ok(Self { client, endpoint: base.join("propertymappings/provider/radius/")? })
	}
}
#[cfg(feature = "reqwest")]
impl PairProvider for RadiusPropertyMappingsProvider {
	fn fetch<'a>(&'a self, page: u32, search: &'a str) -> PageFuture<'a> {
		Box::pin(async move {
			let query = PageQuery::ordered_by("name", page, search);
			let response = self
				.client
				.get(self.endpoint.clone())
				.query(&query)
				.send()
				.await
				.map_err(TransportError::from)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await.map_err(TransportError::from)?;

			if !status.is_success() {
				return Err(transport::status_error(
					status.as_u16(),
					transport::summarize_body(&body),
					transport::parse_retry_after(&headers),
				));
			}

			let mut deserializer = serde_json::Deserializer::from_slice(&body);
			let page: PageResponse<RadiusPropertyMapping> =
				serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
					TransportError::ChallengeParse { source, status: Some(status.as_u16()) }
				})?;

			Ok(DualSelectPage {
				pagination: page.pagination.clone(),
				options: page.into_pairs(|m| m.pk.clone(), |m| m.name.clone()),
			})
		})
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn bound_stage(instance: Option<Value>) -> RadiusProviderFormStage {
		let mut stage = RadiusProviderFormStage::new();
		let mut challenge = Challenge::new(COMPONENT);

		if let Some(instance) = instance {
			challenge = challenge.with_field("instance", instance);
		}

		stage.bind(challenge).expect("Radius challenge fixture should bind.");

		stage
	}

	#[test]
	fn create_mode_seeds_defaults() {
		let stage = bound_stage(None);
		let view = stage.render();
		let secret = view
			.field("sharedSecret")
			.and_then(|field| field.value.clone())
			.expect("Shared secret should be defaulted.");

		assert_eq!(secret.len(), SHARED_SECRET_LEN);
		assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
		assert_eq!(
			view.field("clientNetworks").and_then(|field| field.value.as_deref()),
			Some(DEFAULT_CLIENT_NETWORKS)
		);
		assert_eq!(
			view.field("invalidationFlow").and_then(|field| field.value.as_deref()),
			Some(DEFAULT_INVALIDATION_FLOW)
		);
		assert_eq!(view.field("mfaSupport").and_then(|field| field.value.as_deref()), Some("true"));
	}

	#[test]
	fn selector_is_seeded_from_the_instance_mappings() {
		let stage = bound_stage(Some(serde_json::json!({
			"name": "corp-radius",
			"authorizationFlow": "default-authentication-flow",
			"propertyMappings": ["pk1", "pk3"]
		})));
		let selector = stage.mappings_selector();

		assert!(selector.contains("pk1"));
		assert!(selector.contains("pk3"));
		assert!(!selector.contains("pk2"));
	}

	#[test]
	fn authentication_flow_is_stored_in_the_authorization_slot() {
		let mut stage = bound_stage(None);

		stage.apply_input("name", FieldValue::Text("corp-radius".into()));
		stage.apply_input(
			"authorizationFlow",
			FieldValue::Text("default-authentication-flow".into()),
		);

		let response = stage.build_response().expect("Filled form should build a response.");

		assert_eq!(
			response.field("authorizationFlow"),
			Some(&Value::String("default-authentication-flow".into()))
		);
	}

	#[test]
	fn empty_name_blocks_submission_until_corrected() {
		let mut stage = bound_stage(None);

		stage.apply_input(
			"authorizationFlow",
			FieldValue::Text("default-authentication-flow".into()),
		);

		let err = stage.build_response().expect_err("Empty name should fail validation.");

		assert!(err.for_field("name").is_some());

		stage.on_error(&err);

		let marker = stage
			.render()
			.field("name")
			.and_then(|field| field.error.clone())
			.expect("Inline marker should be rendered for the failing field.");

		assert!(marker.contains("required"));

		stage.apply_input("name", FieldValue::Text("corp-radius".into()));

		assert!(stage.build_response().is_ok());
	}

	#[test]
	fn update_mode_round_trips_the_instance_fields() {
		let mut stage = bound_stage(Some(serde_json::json!({
			"pk": 7,
			"name": "corp-radius",
			"authorizationFlow": "default-authentication-flow",
			"mfaSupport": false,
			"sharedSecret": "s3cr3t",
			"clientNetworks": "10.0.0.0/8",
			"propertyMappings": ["pk1"],
			"invalidationFlow": "custom-invalidation"
		})));

		stage.apply_input("propertyMappings", FieldValue::Keys(vec!["pk1".into(), "pk2".into()]));

		let response = stage.build_response().expect("Update form should build a response.");

		assert_eq!(response.field("pk"), Some(&Value::Number(7.into())));
		assert_eq!(response.field("mfaSupport"), Some(&Value::Bool(false)));
		assert_eq!(response.field("sharedSecret"), Some(&Value::String("s3cr3t".into())));
		assert_eq!(
			response.field("propertyMappings"),
			Some(&serde_json::json!(["pk1", "pk2"]))
		);
		assert_eq!(
			response.field("invalidationFlow"),
			Some(&Value::String("custom-invalidation".into()))
		);
	}
}
