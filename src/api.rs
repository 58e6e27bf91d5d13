//! Paginated list query contract used by dual-select providers.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, stage::dual_select::DualSelectPair};

/// Request parameters of a paginated list query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
	/// Server-side ordering field.
	pub ordering: String,
	/// Page size.
	pub page_size: u32,
	/// Search term, already trimmed.
	pub search: String,
	/// 1-based page index.
	pub page: u32,
}
impl PageQuery {
	/// Page size dual-select providers request per fetch.
	pub const DEFAULT_PAGE_SIZE: u32 = 20;

	/// Creates a query ordered by the given field with the default page size.
	pub fn ordered_by(ordering: impl Into<String>, page: u32, search: &str) -> Self {
		Self {
			ordering: ordering.into(),
			page_size: Self::DEFAULT_PAGE_SIZE,
			search: search.trim().into(),
			page,
		}
	}
}

/// Pagination metadata echoed by list endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
	/// Total number of matching items.
	pub count: u64,
	/// Current page index.
	pub current: u32,
	/// Total number of pages.
	pub total_pages: u32,
}

/// One page of results from a paginated list query.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PageResponse<T> {
	/// Pagination metadata.
	pub pagination: Pagination,
	/// Items of the current page.
	pub results: Vec<T>,
}
impl<T> PageResponse<T>
where
	T: Serialize,
{
	/// Maps the results into `(key, label, sort label, raw item)` dual-select tuples.
	pub fn into_pairs(
		self,
		key: impl Fn(&T) -> String,
		label: impl Fn(&T) -> String,
	) -> Vec<DualSelectPair> {
		self.results
			.into_iter()
			.map(|item| {
				let k = key(&item);
				let l = label(&item);
				let raw = serde_json::to_value(&item).unwrap_or(Value::Null);

				(k, l.clone(), l, raw)
			})
			.collect()
	}
}
