//! Dynamic multi-select association pattern shared by provider-form stages.
//!
//! A dual-select widget pairs an "available" pool, populated on demand through a
//! paginated [`PairProvider`], with a "selected" pool derived from the instance's
//! currently-associated item keys. The [`SelectedSelector`] partitions options between
//! the two pools without a second round trip.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, api::Pagination, error::TransportError};

/// `(key, label, sort label, raw item)` tuple feeding dual-select widgets.
pub type DualSelectPair = (String, String, String, Value);

/// Boxed future returned by [`PairProvider`] implementations.
pub type PageFuture<'a> =
	Pin<Box<dyn Future<Output = Result<DualSelectPage, TransportError>> + 'a + Send>>;

/// One page of available options.
#[derive(Clone, Debug, PartialEq)]
pub struct DualSelectPage {
	/// Pagination metadata echoed from the list endpoint.
	pub pagination: Pagination,
	/// Options of this page, mapped into dual-select tuples.
	pub options: Vec<DualSelectPair>,
}

/// Asynchronous paginated source for the "available" pool of a dual-select widget.
///
/// Implementations support search-as-you-type and pagination rather than loading the
/// full remote set.
pub trait PairProvider
where
	Self: Send + Sync,
{
	/// Fetches one page of options filtered by the search term.
	fn fetch<'a>(&'a self, page: u32, search: &'a str) -> PageFuture<'a>;
}

/// O(1) membership predicate partitioning options into "selected" vs "available".
///
/// Built once per instance load from the associated item keys; the backing set is never
/// recomputed per item. Without an instance (create mode) nothing is selected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectedSelector(Option<HashSet<String>>);
impl SelectedSelector {
	/// Builds the selector from an instance's associated keys, if an instance is loaded.
	pub fn from_keys<I, S>(keys: Option<I>) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self(keys.map(|keys| keys.into_iter().map(Into::into).collect()))
	}

	/// Membership test for a single option tuple.
	pub fn is_selected(&self, pair: &DualSelectPair) -> bool {
		self.contains(&pair.0)
	}

	/// Membership test by raw key.
	pub fn contains(&self, key: &str) -> bool {
		self.0.as_ref().is_some_and(|keys| keys.contains(key))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn pair(key: &str) -> DualSelectPair {
		(key.into(), key.into(), key.into(), Value::Null)
	}

	#[test]
	fn selector_matches_only_associated_keys() {
		let selector =
			SelectedSelector::from_keys(Some(["pk1".to_owned(), "pk3".to_owned()]));

		assert!(selector.is_selected(&pair("pk1")));
		assert!(selector.is_selected(&pair("pk3")));
		assert!(!selector.is_selected(&pair("pk2")));
		assert!(!selector.contains("pk4"));
	}

	#[test]
	fn selector_without_instance_selects_nothing() {
		let selector = SelectedSelector::from_keys(None::<Vec<String>>);

		assert!(!selector.is_selected(&pair("pk1")));
	}
}
