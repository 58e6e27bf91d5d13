//! Transport primitives for challenge/response exchanges.
//!
//! [`ChallengeTransport`] is the executor's only dependency on an HTTP stack. The
//! transport owns retry/backoff for transient network failures and the per-call timeout;
//! the executor owns the decision of *whether* a response may be resubmitted, because
//! at-most-once delivery is not guaranteed and a submit may already have mutated server
//! state.

// crates.io
#[cfg(feature = "reqwest")]
use reqwest::{
	Client as ReqwestClient, StatusCode,
	header::{HeaderMap, RETRY_AFTER},
};
#[cfg(feature = "reqwest")] use time::{OffsetDateTime, format_description::well_known::Rfc2822};
// self
#[cfg(feature = "reqwest")] use crate::challenge::Challenge;
use crate::{
	_prelude::*,
	challenge::{FlowAdvance, Response},
	error::TransportError,
};

/// Boxed future returned by transport calls.
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<FlowAdvance, TransportError>> + 'a + Send>>;

/// Contract for submitting responses and receiving the next challenge or terminal
/// outcome.
pub trait ChallengeTransport
where
	Self: 'static + Send + Sync,
{
	/// Fetches the first challenge when a flow is entered.
	fn initial(&self) -> TransportFuture<'_>;

	/// Submits a stage response, returning the next challenge or the terminal outcome.
	fn submit<'a>(&'a self, response: &'a Response) -> TransportFuture<'a>;
}

/// Reqwest-backed transport exchanging JSON payloads with a flow executor endpoint.
///
/// The initial challenge is fetched with `GET`, responses are `POST`ed as JSON. Status
/// classification follows the error taxonomy: 429 and 5xx are transient (with any
/// `Retry-After` hint attached), other non-success statuses permanently end the flow.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestChallengeTransport {
	client: ReqwestClient,
	endpoint: Url,
}
#[cfg(feature = "reqwest")]
impl ReqwestChallengeTransport {
	/// Creates a transport for the given flow executor endpoint.
	pub fn new(endpoint: Url) -> Self {
		Self::with_client(ReqwestClient::default(), endpoint)
	}

	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient, endpoint: Url) -> Self {
		Self { client, endpoint }
	}

	/// Endpoint the transport exchanges challenges with.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	async fn exchange(
		&self,
		request: reqwest::RequestBuilder,
	) -> Result<FlowAdvance, TransportError> {
		let response = request.send().await.map_err(TransportError::from)?;
		let status = response.status();
		let headers = response.headers().to_owned();
		let body = response.bytes().await.map_err(TransportError::from)?;

		if status.is_success() {
			return decode_challenge(&body, status.as_u16());
		}

		Err(status_error(status.as_u16(), summarize_body(&body), parse_retry_after(&headers)))
	}
}
#[cfg(feature = "reqwest")]
impl ChallengeTransport for ReqwestChallengeTransport {
	fn initial(&self) -> TransportFuture<'_> {
		Box::pin(async move { self.exchange(self.client.get(self.endpoint.clone())).await })
	}

	fn submit<'a>(&'a self, response: &'a Response) -> TransportFuture<'a> {
		Box::pin(async move {
			self.exchange(self.client.post(self.endpoint.clone()).json(response)).await
		})
	}
}

#[cfg(feature = "reqwest")]
fn decode_challenge(body: &[u8], status: u16) -> Result<FlowAdvance, TransportError> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let challenge: Challenge = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| TransportError::ChallengeParse { source, status: Some(status) })?;

	Ok(FlowAdvance::from_challenge(challenge))
}

/// Maps a non-success HTTP status into the transport error taxonomy.
#[cfg(feature = "reqwest")]
pub(crate) fn status_error(
	status: u16,
	message: String,
	retry_after: Option<Duration>,
) -> TransportError {
	if status == StatusCode::TOO_MANY_REQUESTS.as_u16() || status >= 500 {
		TransportError::Transient { message, status: Some(status), retry_after }
	} else {
		TransportError::Permanent { message, status: Some(status) }
	}
}

#[cfg(feature = "reqwest")]
pub(crate) fn summarize_body(body: &[u8]) -> String {
	const BODY_PREVIEW_LIMIT: usize = 256;

	let text = String::from_utf8_lossy(body);
	let trimmed = text.trim();

	if trimmed.is_empty() {
		return "Flow endpoint returned an empty error body.".into();
	}

	trimmed.chars().take(BODY_PREVIEW_LIMIT).collect()
}

#[cfg(feature = "reqwest")]
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
