//! Client-side engine for server-driven authentication flows—challenge rendering stages, a
//! single-submit state machine, and transport-aware error taxonomy in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod challenge;
pub mod error;
pub mod executor;
pub mod obs;
pub mod registry;
pub mod stage;
pub mod transport;
pub mod view;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// self
	use crate::{
		challenge::{FlowAdvance, Response},
		error::TransportError,
		executor::FlowExecutor,
		registry::{self, StageRegistry},
		transport::{ChallengeTransport, TransportFuture},
	};

	/// Executor type alias used by scripted-transport tests.
	pub type ScriptedExecutor = FlowExecutor<ScriptedTransport>;

	/// In-process transport that replays a scripted sequence of flow advances.
	///
	/// Every `submit` call is counted and the outgoing [`Response`] is recorded so tests can
	/// assert on exact payloads and call counts.
	#[derive(Debug, Default)]
	pub struct ScriptedTransport {
		script: Mutex<VecDeque<Result<FlowAdvance, TransportError>>>,
		submitted: Mutex<Vec<Response>>,
		submit_calls: AtomicUsize,
	}
	impl ScriptedTransport {
		/// Queues the next result the transport will hand back.
		pub fn push(&self, step: Result<FlowAdvance, TransportError>) {
			self.script.lock().push_back(step);
		}

		/// Number of `submit` calls observed so far.
		pub fn submit_calls(&self) -> usize {
			self.submit_calls.load(Ordering::SeqCst)
		}

		/// Clones of every response submitted through this transport, in order.
		pub fn submitted(&self) -> Vec<Response> {
			self.submitted.lock().clone()
		}

		fn next_step(&self) -> Result<FlowAdvance, TransportError> {
			self.script.lock().pop_front().unwrap_or_else(|| {
				Err(TransportError::Transient {
					message: "Scripted transport is exhausted.".into(),
					status: None,
					retry_after: None,
				})
			})
		}
	}
	impl ChallengeTransport for ScriptedTransport {
		fn initial(&self) -> TransportFuture<'_> {
			Box::pin(async move { self.next_step() })
		}

		fn submit<'a>(&'a self, response: &'a Response) -> TransportFuture<'a> {
			Box::pin(async move {
				self.submit_calls.fetch_add(1, Ordering::SeqCst);
				self.submitted.lock().push(response.clone());

				self.next_step()
			})
		}
	}

	/// Constructs a [`FlowExecutor`] backed by a scripted transport and the built-in registry.
	pub fn build_scripted_executor() -> (Arc<ScriptedTransport>, ScriptedExecutor) {
		build_scripted_executor_with(Arc::new(registry::default_registry()))
	}

	/// Constructs a [`FlowExecutor`] backed by a scripted transport and the given registry.
	pub fn build_scripted_executor_with(
		registry: Arc<StageRegistry>,
	) -> (Arc<ScriptedTransport>, ScriptedExecutor) {
		let transport = Arc::new(ScriptedTransport::default());
		let executor = FlowExecutor::new(transport.clone(), registry);

		(transport, executor)
	}
}

mod _prelude {
	pub use std::{
		collections::{HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::Duration;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, flow_executor as _, httpmock as _, tokio as _};
