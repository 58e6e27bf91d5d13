// crates.io
use serde_json::{Value, json};
// self
use flow_executor::{
	_preludet::*,
	challenge::{Challenge, FlowAdvance, TerminalOutcome},
	executor::{FlowState, SubmitOutcome},
	stage::{
		FieldValue,
		radius::{DEFAULT_INVALIDATION_FLOW, SHARED_SECRET_LEN},
	},
};

fn radius_challenge(instance: Option<Value>) -> Challenge {
	let mut challenge = Challenge::new("ak-provider-radius-form");

	if let Some(instance) = instance {
		challenge = challenge.with_field("instance", instance);
	}

	challenge
}

#[tokio::test]
async fn create_form_submits_defaults_with_the_reused_flow_slot() {
	let (transport, executor) = build_scripted_executor();

	transport.push(Ok(FlowAdvance::Next(radius_challenge(None))));
	executor.begin().await.expect("Entering the flow should succeed.");
	executor
		.apply_input("name", FieldValue::Text("corp-radius".into()))
		.expect("Rendering session should accept input.");
	executor
		.apply_input("authorizationFlow", FieldValue::Text("default-authentication-flow".into()))
		.expect("Rendering session should accept input.");
	transport.push(Ok(FlowAdvance::Terminal(TerminalOutcome::Success)));

	let outcome = executor.submit().await.expect("Filled form should submit.");

	assert!(matches!(outcome, SubmitOutcome::Terminal(TerminalOutcome::Success)));

	let submitted = transport.submitted();
	let response = &submitted[0];

	// The selected authentication flow travels in the provider schema's
	// authorization-flow slot; the server relies on that shape.
	assert_eq!(
		response.field("authorizationFlow"),
		Some(&Value::String("default-authentication-flow".into()))
	);
	assert_eq!(response.field("mfaSupport"), Some(&Value::Bool(true)));
	assert_eq!(response.field("clientNetworks"), Some(&Value::String("0.0.0.0/0, ::/0".into())));
	assert_eq!(
		response.field("invalidationFlow"),
		Some(&Value::String(DEFAULT_INVALIDATION_FLOW.into()))
	);

	let secret = response
		.field("sharedSecret")
		.and_then(Value::as_str)
		.expect("Create mode should generate a shared secret.");

	assert_eq!(secret.len(), SHARED_SECRET_LEN);
	assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
	assert!(response.field("pk").is_none());
}

#[tokio::test]
async fn invalid_form_stays_local_until_corrected() {
	let (transport, executor) = build_scripted_executor();

	transport.push(Ok(FlowAdvance::Next(radius_challenge(None))));
	executor.begin().await.expect("Entering the flow should succeed.");
	executor
		.apply_input("authorizationFlow", FieldValue::Text("default-authentication-flow".into()))
		.expect("Rendering session should accept input.");

	let outcome = executor.submit().await.expect("Validation failure is a non-fatal outcome.");
	let SubmitOutcome::Invalid(errors) = outcome else {
		panic!("Empty name should fail validation, got {outcome:?}.");
	};

	assert!(errors.for_field("name").is_some());
	assert_eq!(transport.submit_calls(), 0, "Validation must block before any network call.");
	assert_eq!(executor.state(), FlowState::Rendering);
	assert!(
		executor
			.render()
			.field("name")
			.and_then(|field| field.error.clone())
			.is_some(),
		"The failing field should carry an inline marker."
	);

	executor
		.apply_input("name", FieldValue::Text("corp-radius".into()))
		.expect("Rendering session should accept input.");
	transport.push(Ok(FlowAdvance::Terminal(TerminalOutcome::Success)));

	let outcome = executor.submit().await.expect("Corrected form should submit.");

	assert!(matches!(outcome, SubmitOutcome::Terminal(TerminalOutcome::Success)));
	assert_eq!(transport.submit_calls(), 1);
}

#[tokio::test]
async fn update_form_round_trips_the_instance_and_edited_associations() {
	let (transport, executor) = build_scripted_executor();

	transport.push(Ok(FlowAdvance::Next(radius_challenge(Some(json!({
		"pk": 7,
		"name": "corp-radius",
		"authorizationFlow": "default-authentication-flow",
		"mfaSupport": false,
		"sharedSecret": "s3cr3t",
		"clientNetworks": "10.0.0.0/8",
		"propertyMappings": ["pk1"],
		"invalidationFlow": "custom-invalidation"
	}))))));
	executor.begin().await.expect("Entering the flow should succeed.");
	executor
		.apply_input("propertyMappings", FieldValue::Keys(vec!["pk1".into(), "pk2".into()]))
		.expect("Rendering session should accept input.");
	transport.push(Ok(FlowAdvance::Terminal(TerminalOutcome::Success)));
	executor.submit().await.expect("Update form should submit.");

	let submitted = transport.submitted();
	let response = &submitted[0];

	assert_eq!(response.field("pk"), Some(&Value::Number(7.into())));
	assert_eq!(response.field("name"), Some(&Value::String("corp-radius".into())));
	assert_eq!(response.field("mfaSupport"), Some(&Value::Bool(false)));
	assert_eq!(response.field("sharedSecret"), Some(&Value::String("s3cr3t".into())));
	assert_eq!(response.field("propertyMappings"), Some(&json!(["pk1", "pk2"])));
	assert_eq!(
		response.field("invalidationFlow"),
		Some(&Value::String("custom-invalidation".into()))
	);
}
