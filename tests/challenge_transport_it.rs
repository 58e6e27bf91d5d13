#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use flow_executor::{
	_preludet::*,
	challenge::{FlowAdvance, TerminalOutcome},
	executor::{FlowExecutor, FlowState, SubmitOutcome},
	registry,
	transport::{ChallengeTransport, ReqwestChallengeTransport},
};

fn build_transport(server: &MockServer) -> ReqwestChallengeTransport {
	ReqwestChallengeTransport::new(
		Url::parse(&server.url("/flow")).expect("Mock flow endpoint should parse successfully."),
	)
}

#[tokio::test]
async fn initial_fetch_decodes_the_first_challenge() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/flow");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"component":"ak-stage-consent","flowInfo":{"title":"Welcome"},"token":"tok-1"}"#);
		})
		.await;
	let transport = build_transport(&server);
	let advance = transport.initial().await.expect("Initial challenge should decode.");

	mock.assert_async().await;

	let FlowAdvance::Next(challenge) = advance else {
		panic!("Consent challenge must not classify as terminal, got {advance:?}.");
	};

	assert_eq!(challenge.component, "ak-stage-consent");
	assert_eq!(challenge.title(), Some("Welcome"));
}

#[tokio::test]
async fn consent_flow_completes_over_http() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/flow");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"component":"ak-stage-consent","token":"tok-1"}"#);
		})
		.await;

	let submit_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/flow")
				.json_body_includes(r#"{"component":"ak-stage-consent","token":"tok-1"}"#);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"component":"terminal-success"}"#);
		})
		.await;
	let executor =
		FlowExecutor::new(build_transport(&server), Arc::new(registry::default_registry()));

	executor.begin().await.expect("Entering the flow should succeed.");

	let outcome = executor.submit().await.expect("Submitting the consent should succeed.");

	submit_mock.assert_async().await;
	assert!(matches!(outcome, SubmitOutcome::Terminal(TerminalOutcome::Success)));
	assert_eq!(executor.state(), FlowState::Terminal(TerminalOutcome::Success));
}

#[tokio::test]
async fn client_errors_classify_as_permanent() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/flow");
			then.status(404).body("flow not found");
		})
		.await;

	let transport = build_transport(&server);
	let err = transport.initial().await.expect_err("Missing flow should fail.");

	assert!(!err.is_transient());
	assert_eq!(err.status(), Some(404));
	assert!(err.to_string().contains("flow not found"));
}

#[tokio::test]
async fn server_errors_classify_as_transient_with_the_retry_hint() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/flow");
			then.status(503).header("retry-after", "7").body("upstream unavailable");
		})
		.await;

	let transport = build_transport(&server);
	let err = transport.initial().await.expect_err("Unavailable flow endpoint should fail.");

	assert!(err.is_transient());
	assert_eq!(err.status(), Some(503));

	let flow_executor::error::TransportError::Transient { retry_after, .. } = err else {
		panic!("A 503 must map to the transient class, got {err:?}.");
	};

	assert_eq!(retry_after, Some(Duration::seconds(7)));
}

#[tokio::test]
async fn malformed_challenge_bodies_report_the_parse_failure() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/flow");
			then.status(200).header("content-type", "text/html").body("<html>proxy error</html>");
		})
		.await;

	let transport = build_transport(&server);
	let err = transport.initial().await.expect_err("Non-JSON body should fail to decode.");

	assert!(matches!(
		err,
		flow_executor::error::TransportError::ChallengeParse { status: Some(200), .. }
	));
	assert!(err.is_transient(), "A garbled body may be a proxy blip and should allow retrying.");
}
