//! Core data models: regions, refresh requests, page state

use fragweb_config::RegionConfig;
use fragweb_dom::Selector;
use fragweb_utils::join_query;

use crate::error::{CoreError, CoreResult};

// ==================== Regions ====================

/// One named region bound to a selector
#[derive(Debug, Clone)]
pub struct RegionBinding {
    /// Stable identifier used in reports and logs
    pub id: String,
    /// Selector locating the region in both the live and fetched documents
    pub selector: Selector,
}

/// Ordered set of region bindings for one page.
///
/// Order is the declaration order; replacement during a refresh walks the
/// map in this order. Duplicate ids are rejected at construction.
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    bindings: Vec<RegionBinding>,
}

impl RegionMap {
    /// Create an empty region map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region; fails on a duplicate id or bad selector
    pub fn insert(&mut self, id: &str, selector: &str) -> CoreResult<()> {
        if self.bindings.iter().any(|b| b.id == id) {
            return Err(CoreError::DuplicateRegion { id: id.to_string() });
        }
        self.bindings.push(RegionBinding {
            id: id.to_string(),
            selector: Selector::parse(selector)?,
        });
        Ok(())
    }

    /// Build a region map from page profile declarations
    pub fn from_config(regions: &[RegionConfig]) -> CoreResult<Self> {
        let mut map = RegionMap::new();
        for region in regions {
            map.insert(&region.id, &region.selector)?;
        }
        Ok(map)
    }

    /// Look up a binding by region id
    pub fn get(&self, id: &str) -> Option<&RegionBinding> {
        self.bindings.iter().find(|b| b.id == id)
    }

    /// Iterate bindings in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &RegionBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ==================== Requests ====================

/// HTTP method and payload shape for a refresh request
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshMethod {
    /// GET returning a full alternate rendering of the page
    Get,
    /// Legacy PUT to the page path itself with a JSON `{"time": ...}` body
    /// and a CSRF token header; the response body is a raw fragment
    LegacyPut { time: String, csrf_token: String },
}

/// A fully built refresh request, ready for a `FragmentFetcher`
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshRequest {
    /// Page path (the live document's location)
    pub path: String,
    /// Path suffix, either the profile's or a `data-path` override
    pub suffix: String,
    /// Query parameters in emit order; values are not yet percent-encoded
    pub query: Vec<(String, String)>,
    pub method: RefreshMethod,
}

impl RefreshRequest {
    /// Start a GET request for the given page path
    pub fn get(path: &str) -> Self {
        RefreshRequest {
            path: path.to_string(),
            suffix: String::new(),
            query: Vec::new(),
            method: RefreshMethod::Get,
        }
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    /// Relative URL: path, suffix, then the query string in emit order
    pub fn url(&self) -> String {
        let mut url = format!("{}{}", self.path, self.suffix);
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&join_query(&self.query));
        }
        url
    }
}

// ==================== State ====================

/// Last successfully applied view parameters for one page.
///
/// Overwritten only after a refresh succeeds, so a failed request never
/// moves the recorded state away from what the user is looking at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageState {
    /// Active time-range value (the `time` query parameter)
    pub time: Option<String>,
    /// Active path suffix from a `data-path` trigger
    pub time_path: Option<String>,
    /// Current page number; `None` before any pagination
    pub page: Option<u32>,
}

// ==================== Outcomes ====================

/// What a completed refresh did to the live document
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The response was applied
    Applied(RefreshReport),
    /// A newer request was started before this response landed; the
    /// response was discarded and the document left alone
    Stale,
    /// The trigger acted on the live document only (no request issued)
    LocalOnly,
}

/// Per-region accounting for an applied refresh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    /// Region ids replaced with fetched content
    pub replaced: Vec<String>,
    /// Region ids left untouched (absent from the response or the page)
    pub skipped: Vec<String>,
    /// Number of chart targets re-rendered
    pub charts_rendered: usize,
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_map_rejects_duplicates() {
        let mut map = RegionMap::new();
        map.insert("report-table", "#report-table").unwrap();
        let err = map.insert("report-table", "#other").unwrap_err();
        assert!(matches!(err, CoreError::DuplicateRegion { .. }));
    }

    #[test]
    fn test_region_map_preserves_order() {
        let mut map = RegionMap::new();
        map.insert("transaction-table", "#transaction-table").unwrap();
        map.insert("pagination-buttons", "#pagination-buttons").unwrap();
        let ids: Vec<&str> = map.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["transaction-table", "pagination-buttons"]);
    }

    #[test]
    fn test_region_map_rejects_bad_selector() {
        let mut map = RegionMap::new();
        assert!(map.insert("bad", "div > p").is_err());
    }

    #[test]
    fn test_request_url_with_query() {
        let request = RefreshRequest::get("/accounts/5")
            .with_param("time", "30")
            .with_param("page", "1");
        assert_eq!(request.url(), "/accounts/5?time=30&page=1");
    }

    #[test]
    fn test_request_url_with_suffix() {
        let request = RefreshRequest::get("/loans/2")
            .with_suffix("/ajax")
            .with_param("page", "3");
        assert_eq!(request.url(), "/loans/2/ajax?page=3");
    }

    #[test]
    fn test_request_url_without_query() {
        assert_eq!(RefreshRequest::get("/transactions").url(), "/transactions");
    }
}
