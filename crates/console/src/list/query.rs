//! Page, filter and search state for one resource list.

use std::collections::BTreeMap;
use std::fmt;

/// Wire key of the free-text search term.
pub const SEARCH_KEY: &str = "q";

/// Pagination, search and filter state driving one list's fetch.
///
/// Every mutation returns a new value so the controller can swap the active
/// query in one step. `page` is always at least 1, and every change except
/// an explicit page change resets it to 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    page: u32,
    per_page: u32,
    search_term: Option<String>,
    filters: BTreeMap<String, Option<String>>,
}

impl ListQuery {
    /// First page with no search and no filters.
    #[must_use]
    pub fn new(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page: per_page.max(1),
            search_term: None,
            filters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search_term.as_deref()
    }

    /// Value of a filter, `None` when unset or cleared.
    #[must_use]
    pub fn filter(&self, name: &str) -> Option<&str> {
        self.filters.get(name).and_then(|v| v.as_deref())
    }

    /// Explicit page change. The only transition that keeps filters and
    /// moves away from page 1.
    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// Apply a (debounced) search term; resets to page 1.
    #[must_use]
    pub fn with_search(&self, term: Option<String>) -> Self {
        Self {
            page: 1,
            search_term: term,
            ..self.clone()
        }
    }

    /// Set or clear a discrete filter; resets to page 1.
    #[must_use]
    pub fn with_filter(&self, name: &str, value: Option<String>) -> Self {
        let mut filters = self.filters.clone();
        filters.insert(name.to_string(), value);
        Self {
            page: 1,
            filters,
            ..self.clone()
        }
    }

    /// Canonical request: pagination plus every non-empty search/filter value.
    #[must_use]
    pub fn to_request(&self) -> ListRequest {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("perPage".to_string(), self.per_page.to_string()),
        ];
        if let Some(term) = self.search_term.as_deref().filter(|t| !t.is_empty()) {
            pairs.push((SEARCH_KEY.to_string(), term.to_string()));
        }
        for (name, value) in &self.filters {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                pairs.push((name.clone(), value.to_string()));
            }
        }
        ListRequest { pairs }
    }
}

/// Serialized form of a [`ListQuery`], as sent on the wire.
///
/// Never contains a key whose value is empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListRequest {
    pairs: Vec<(String, String)>,
}

impl ListRequest {
    /// Key/value pairs in wire order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Value for a key, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Page number carried by the request.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.get("page").and_then(|p| p.parse().ok()).unwrap_or(1)
    }

    /// Rows per page carried by the request.
    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.get("perPage")
            .and_then(|p| p.parse().ok())
            .unwrap_or(1)
    }
}

impl fmt::Display for ListRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.pairs)
            .finish();
        f.write_str(&encoded)
    }
}
