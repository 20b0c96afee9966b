//! fragweb-core: fragment refresh controller
//!
//! A `PageController` owns the live document for one page and keeps its
//! named regions in sync with the server. Triggers (time-range buttons,
//! pagination buttons, delete buttons) are bound by selector; activating
//! one builds a refresh request, fetches the server's rendering through a
//! `FragmentFetcher`, and splices each declared region's new content into
//! the live tree. Regions absent from a response are left untouched, and a
//! failed fetch leaves the document exactly as it was.

pub mod charts;
pub mod error;
pub mod fetch;
pub mod models;

use std::collections::HashSet;
use std::sync::Arc;

use fragweb_config::{PageProfile, RefreshMode, SelectionConfig, TriggerKind};
use fragweb_dom::{Document, NodeId, Selector};

pub use charts::{ChartDataset, ChartPayload, ChartRenderer, ChartSpec, LogChartRenderer};
pub use error::{CoreError, CoreResult, ErrorCode, ErrorSeverity, FetchError};
pub use fetch::FragmentFetcher;
pub use models::{
    PageState, RefreshMethod, RefreshOutcome, RefreshReport, RefreshRequest, RegionBinding,
    RegionMap,
};

/// Callback invoked once per failed refresh
pub type ErrorSink = Box<dyn Fn(&CoreError) + Send + Sync>;

const DEFAULT_CSRF_FIELD: &str = "csrfmiddlewaretoken";

// ==================== Controller ====================

#[derive(Debug, Clone, Copy)]
struct BoundTrigger {
    node: NodeId,
    kind: TriggerKind,
    /// Index into the controller's trigger selector list
    selector_index: usize,
}

/// Fragment refresh controller for one page
pub struct PageController {
    document: Document,
    page_path: String,
    profile: PageProfile,
    selection: SelectionConfig,
    regions: RegionMap,
    trigger_selectors: Vec<(TriggerKind, Selector)>,
    state_holder: Option<Selector>,
    fetcher: Arc<dyn FragmentFetcher>,
    chart_renderer: Arc<dyn ChartRenderer>,
    error_sink: Option<ErrorSink>,
    state: PageState,
    triggers: Vec<BoundTrigger>,
    bound: HashSet<NodeId>,
    csrf_token: Option<String>,
    /// Monotonic refresh generation; responses carrying an older token
    /// than the current generation are discarded as stale
    generation: u64,
}

impl PageController {
    /// Start building a controller for a parsed page
    pub fn builder(document: Document, page_path: &str) -> PageControllerBuilder {
        PageControllerBuilder {
            document,
            page_path: page_path.to_string(),
            profile: None,
            selection: SelectionConfig::default(),
            csrf_field: DEFAULT_CSRF_FIELD.to_string(),
            fetcher: None,
            chart_renderer: Arc::new(LogChartRenderer),
            error_sink: None,
        }
    }

    /// The live document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Last successfully applied view parameters
    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// Serialized content of a region in the live document
    pub fn region_html(&self, id: &str) -> Option<String> {
        let binding = self.regions.get(id)?;
        let node = self.document.select_first(&binding.selector)?;
        Some(self.document.inner_html(node))
    }

    /// First live element matching a selector string (trigger lookup)
    pub fn find(&self, selector: &str) -> CoreResult<NodeId> {
        let parsed = Selector::parse(selector)?;
        self.document
            .select_first(&parsed)
            .ok_or_else(|| CoreError::ElementNotFound {
                selector: selector.to_string(),
            })
    }

    // ==================== Trigger binding ====================

    /// Bind every trigger element currently in the document.
    ///
    /// Idempotent: already-bound elements are skipped, so calling this
    /// again after a partial refresh binds only the new elements. Returns
    /// the number of newly bound triggers.
    pub fn initialize(&mut self) -> usize {
        self.prune_detached();
        let mut added = 0;
        for index in 0..self.trigger_selectors.len() {
            let found = self
                .document
                .select_all(&self.trigger_selectors[index].1);
            for node in found {
                if self.bound.insert(node) {
                    self.triggers.push(BoundTrigger {
                        node,
                        kind: self.trigger_selectors[index].0,
                        selector_index: index,
                    });
                    added += 1;
                }
            }
        }
        added
    }

    /// Bind triggers inside one replaced region
    fn rebind_within(&mut self, scope: NodeId) -> usize {
        let mut added = 0;
        for index in 0..self.trigger_selectors.len() {
            let found = self
                .document
                .select_within(scope, &self.trigger_selectors[index].1);
            for node in found {
                if self.bound.insert(node) {
                    self.triggers.push(BoundTrigger {
                        node,
                        kind: self.trigger_selectors[index].0,
                        selector_index: index,
                    });
                    added += 1;
                }
            }
        }
        added
    }

    /// Drop bindings whose elements were detached by a replacement
    fn prune_detached(&mut self) {
        let document = &self.document;
        self.triggers.retain(|t| document.is_attached(t.node));
        self.bound = self.triggers.iter().map(|t| t.node).collect();
    }

    // ==================== Activation ====================

    /// Activate a bound trigger, as a click would.
    ///
    /// Time triggers swap the selected class within their group before any
    /// network activity, so the highlight moves even when the fetch later
    /// fails. Delete triggers only wire the confirmation modal and issue
    /// no request.
    pub async fn activate(&mut self, node: NodeId) -> CoreResult<RefreshOutcome> {
        let trigger = self
            .triggers
            .iter()
            .find(|t| t.node == node)
            .copied()
            .ok_or_else(|| CoreError::ConfigError {
                message: "element is not a bound trigger".to_string(),
            })?;

        match trigger.kind {
            TriggerKind::Delete => self.wire_delete_modal(node),
            TriggerKind::Time => self.activate_time(node, trigger.selector_index).await,
            TriggerKind::Page => self.activate_page(node).await,
        }
    }

    /// Copy the trigger's target id and action URL into the shared modal
    fn wire_delete_modal(&mut self, node: NodeId) -> CoreResult<RefreshOutcome> {
        let target_id = self
            .document
            .data_attr(node, "id")
            .map(str::to_string)
            .ok_or_else(|| CoreError::MissingTriggerData {
                attribute: "data-id".to_string(),
            })?;
        let action_url = self
            .document
            .data_attr(node, "url")
            .map(str::to_string)
            .ok_or_else(|| CoreError::MissingTriggerData {
                attribute: "data-url".to_string(),
            })?;

        let inputs = Selector::parse(".modal-input-id")?;
        for input in self.document.select_all(&inputs) {
            self.document.set_attr(input, "value", &target_id);
        }
        let forms = Selector::parse(".deleteModalForm")?;
        for form in self.document.select_all(&forms) {
            self.document.set_attr(form, "action", &action_url);
        }

        log::debug!("delete modal wired for id {}", target_id);
        Ok(RefreshOutcome::LocalOnly)
    }

    async fn activate_time(
        &mut self,
        node: NodeId,
        selector_index: usize,
    ) -> CoreResult<RefreshOutcome> {
        let time = self.document.data_attr(node, "time").map(str::to_string);
        let path = self.document.data_attr(node, "path").map(str::to_string);
        if time.is_none() && path.is_none() {
            return Err(CoreError::MissingTriggerData {
                attribute: "data-time".to_string(),
            });
        }

        // Optimistic highlight: the clicked button becomes the selected
        // one immediately, independent of the fetch outcome
        self.select_exclusively(node, selector_index);

        // The holder mirrors the active path right away, matching what a
        // subsequent pagination click should fetch
        if let (Some(holder), Some(path)) = (self.state_holder.clone(), path.as_deref()) {
            if let Some(holder_node) = self.document.select_first(&holder) {
                self.document.set_attr(holder_node, "data-path", path);
            }
        }

        let request = match self.profile.refresh {
            RefreshMode::LegacyPut => {
                let time = time.clone().ok_or_else(|| CoreError::MissingTriggerData {
                    attribute: "data-time".to_string(),
                })?;
                RefreshRequest {
                    path: self.page_path.clone(),
                    suffix: String::new(),
                    query: Vec::new(),
                    method: RefreshMethod::LegacyPut {
                        time,
                        csrf_token: self.csrf_token.clone().unwrap_or_default(),
                    },
                }
            }
            RefreshMode::Get => {
                // A data-path trigger is appended to the page path,
                // taking the place of the profile suffix
                let suffix = path.as_deref().unwrap_or(&self.profile.suffix);
                let mut request =
                    RefreshRequest::get(&self.page_path).with_suffix(suffix);
                if let Some(time) = &time {
                    request = request.with_param("time", time);
                }
                request.with_param("page", "1")
            }
        };

        let outcome = self.refresh(&request).await?;
        if matches!(outcome, RefreshOutcome::Applied(_)) {
            self.state = PageState {
                time,
                time_path: path,
                page: Some(1),
            };
        }
        Ok(outcome)
    }

    async fn activate_page(&mut self, node: NodeId) -> CoreResult<RefreshOutcome> {
        let page: u32 = self
            .document
            .data_attr(node, "page")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| CoreError::MissingTriggerData {
                attribute: "data-page".to_string(),
            })?;

        let suffix = self
            .state
            .time_path
            .as_deref()
            .unwrap_or(&self.profile.suffix);
        let mut request = RefreshRequest::get(&self.page_path).with_suffix(suffix);
        if let Some(time) = &self.state.time {
            request = request.with_param("time", time);
        }
        request = request.with_param("page", &page.to_string());

        let outcome = self.refresh(&request).await?;
        if matches!(outcome, RefreshOutcome::Applied(_)) {
            self.state.page = Some(page);
        }
        Ok(outcome)
    }

    /// Move the selected class to `node` within its trigger group
    fn select_exclusively(&mut self, node: NodeId, selector_index: usize) {
        let selector = self.trigger_selectors[selector_index].1.clone();
        let selected = self.selection.selected_class.clone();
        let deselected = self.selection.deselected_class.clone();

        for member in self.document.select_all(&selector) {
            self.document.remove_class(member, &selected);
            self.document.add_class(member, &deselected);
        }
        self.document.remove_class(node, &deselected);
        self.document.add_class(node, &selected);
    }

    // ==================== Refresh ====================

    /// Start a refresh generation. A response applied with an older token
    /// than the current generation is discarded as stale.
    pub fn begin_refresh(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Fetch the server's rendering and apply it to the live document.
    ///
    /// On fetch failure the document is left untouched, the error sink is
    /// invoked exactly once, and the error is returned.
    pub async fn refresh(&mut self, request: &RefreshRequest) -> CoreResult<RefreshOutcome> {
        let token = self.begin_refresh();
        log::debug!("refresh #{}: {}", token, request.url());

        let fetcher = Arc::clone(&self.fetcher);
        match fetcher.fetch(request).await {
            Ok(body) => self.apply_response(&body, token),
            Err(fetch_error) => {
                let error = CoreError::Fetch(fetch_error);
                self.emit(&error);
                Err(error)
            }
        }
    }

    /// Apply a fetched response for the given generation token.
    ///
    /// Declared regions present in both documents are replaced; regions
    /// absent from either side are skipped and left untouched. Triggers
    /// inside replaced regions are rebound, and the chart region (if any)
    /// is re-rendered from its JSON payload.
    pub fn apply_response(&mut self, body: &str, token: u64) -> CoreResult<RefreshOutcome> {
        if token != self.generation {
            log::warn!(
                "discarding stale response (token {} < generation {})",
                token,
                self.generation
            );
            return Ok(RefreshOutcome::Stale);
        }

        let mut report = RefreshReport::default();
        let mut replaced_nodes = Vec::new();
        let bindings: Vec<(String, Selector)> = self
            .regions
            .iter()
            .map(|b| (b.id.clone(), b.selector.clone()))
            .collect();

        match self.profile.refresh {
            RefreshMode::LegacyPut => {
                // The whole body is the new content of the single region
                let (id, selector) = &bindings[0];
                match self.document.select_first(selector) {
                    Some(live) => {
                        self.document.set_inner_html(live, body);
                        report.replaced.push(id.clone());
                        replaced_nodes.push(live);
                    }
                    None => {
                        log::debug!("region '{}' missing from live page, skipped", id);
                        report.skipped.push(id.clone());
                    }
                }
            }
            RefreshMode::Get => {
                let fetched = Document::parse(body);
                for (id, selector) in &bindings {
                    let live = self.document.select_first(selector);
                    let new = fetched.select_first(selector);
                    match (live, new) {
                        (Some(live), Some(new)) => {
                            let content = fetched.inner_html(new);
                            self.document.set_inner_html(live, &content);
                            report.replaced.push(id.clone());
                            replaced_nodes.push(live);
                        }
                        _ => {
                            log::debug!("region '{}' absent, skipped", id);
                            report.skipped.push(id.clone());
                        }
                    }
                }
            }
        }

        self.prune_detached();
        for node in replaced_nodes {
            let added = self.rebind_within(node);
            if added > 0 {
                log::debug!("rebound {} triggers in replaced region", added);
            }
        }

        if let Some(chart_id) = self.profile.chart_region.clone() {
            if report.replaced.iter().any(|id| *id == chart_id) {
                report.charts_rendered = self.render_charts(&chart_id);
            }
        }

        log::info!(
            "refresh applied: {} replaced, {} skipped",
            report.replaced.len(),
            report.skipped.len()
        );
        Ok(RefreshOutcome::Applied(report))
    }

    /// Deserialize the chart region's JSON and hand each chart to the
    /// renderer. Malformed payloads are logged and skipped; the refresh
    /// itself already succeeded.
    fn render_charts(&mut self, region_id: &str) -> usize {
        let binding = match self.regions.get(region_id) {
            Some(b) => b,
            None => return 0,
        };
        let node = match self.document.select_first(&binding.selector) {
            Some(n) => n,
            None => return 0,
        };
        let raw = self.document.text_content(node);
        let raw = raw.trim();
        if raw.is_empty() {
            return 0;
        }
        match serde_json::from_str::<ChartPayload>(raw) {
            Ok(payload) => {
                for chart in &payload.charts {
                    self.chart_renderer.render(chart);
                }
                payload.charts.len()
            }
            Err(error) => {
                log::warn!("chart region '{}' is not valid JSON: {}", region_id, error);
                0
            }
        }
    }

    fn emit(&self, error: &CoreError) {
        log::error!(
            target: "fragweb::error",
            "[{}] {} (severity: {})",
            error.code(),
            error,
            error.severity()
        );
        if let Some(sink) = &self.error_sink {
            sink(error);
        }
    }
}

// ==================== Builder ====================

/// Builder for `PageController`
pub struct PageControllerBuilder {
    document: Document,
    page_path: String,
    profile: Option<PageProfile>,
    selection: SelectionConfig,
    csrf_field: String,
    fetcher: Option<Arc<dyn FragmentFetcher>>,
    chart_renderer: Arc<dyn ChartRenderer>,
    error_sink: Option<ErrorSink>,
}

impl PageControllerBuilder {
    /// Page profile (regions, triggers, refresh mode)
    pub fn profile(mut self, profile: PageProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Selection classes (defaults to btn-primary / btn-outline-primary)
    pub fn selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    /// Form field name carrying the CSRF token
    pub fn csrf_field(mut self, field: &str) -> Self {
        self.csrf_field = field.to_string();
        self
    }

    /// Transport implementation
    pub fn fetcher(mut self, fetcher: Arc<dyn FragmentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Chart renderer (defaults to `LogChartRenderer`)
    pub fn chart_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.chart_renderer = renderer;
        self
    }

    /// Callback invoked once per failed refresh
    pub fn on_error<F>(mut self, sink: F) -> Self
    where
        F: Fn(&CoreError) + Send + Sync + 'static,
    {
        self.error_sink = Some(Box::new(sink));
        self
    }

    /// Validate the configuration and construct the controller.
    ///
    /// Call `initialize()` afterwards to bind the page's triggers.
    pub fn build(self) -> CoreResult<PageController> {
        let profile = self.profile.ok_or_else(|| CoreError::ConfigError {
            message: "a page profile is required".to_string(),
        })?;
        let fetcher = self.fetcher.ok_or_else(|| CoreError::ConfigError {
            message: "a fetcher is required".to_string(),
        })?;

        let regions = RegionMap::from_config(&profile.regions)?;
        if regions.is_empty() {
            return Err(CoreError::ConfigError {
                message: "a page profile must declare at least one region".to_string(),
            });
        }

        let mut trigger_selectors = Vec::new();
        for trigger in &profile.triggers {
            trigger_selectors.push((trigger.kind, Selector::parse(&trigger.selector)?));
        }

        let state_holder = match &profile.state_holder {
            Some(selector) => Some(Selector::parse(selector)?),
            None => None,
        };

        // The CSRF token is rendered into a hidden form field
        let csrf_selector = Selector::parse(&format!("input[name={}]", self.csrf_field))?;
        let csrf_token = self
            .document
            .select_first(&csrf_selector)
            .and_then(|node| self.document.attr(node, "value"))
            .map(str::to_string);

        Ok(PageController {
            document: self.document,
            page_path: self.page_path,
            profile,
            selection: self.selection,
            regions,
            trigger_selectors,
            state_holder,
            fetcher,
            chart_renderer: self.chart_renderer,
            error_sink: self.error_sink,
            state: PageState::default(),
            triggers: Vec::new(),
            bound: HashSet::new(),
            csrf_token,
            generation: 0,
        })
    }
}

// ==================== Tests ====================
