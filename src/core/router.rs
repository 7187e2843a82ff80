//! # Navigation Controller
//!
//! Drives the navigation lifecycle. The transition engine does the actual
//! page transitions; this controller reacts to the events it emits, keeps the
//! DOM in step, swaps content, and handles native back/forward.
//!
//! ```text
//!  user click ──► route(path) ──► engine ──┐
//!                                          │ lifecycle events
//!  popstate ──► handle_popstate()          ▼
//!                 │            handle(LifecycleEvent)
//!                 │              ├─ TransitionOut   → add routing class
//!                 │              ├─ RefreshDocument → swap content, checkpoint
//!                 │              ├─ TransitionIn    → clear routing class
//!                 │              ├─ InitializedPage → bind popstate
//!                 │              └─ SameTarget      → scroll root panel to top
//!                 ▼
//!       simple route? ── yes ─► set main id, close overlay, end detail view
//!                     └─ no ──► open detail view for the path
//! ```
//!
//! ## Invariants
//!
//! - The ephemeral state checkpoint runs once per cycle: at content-swap time,
//!   or right after a silent `push`. Never at transition-in.
//! - While `handle_popstate` runs, `is_pop_navigation()` is true. The
//!   "detail view ended" listener checks it so a back button press does not
//!   also trigger a route to the root.
//! - There is no locking. The engine serializes navigations.
//! - Listeners are wired once and live as long as the controller.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use serde_json::Value;

use crate::api::{ApiClient, ApiError, Format};
use crate::core::config::RouterSettings;
use crate::core::document::{DocumentError, DocumentParser, PageMetadata, PageType, ParsedDocument};
use crate::core::lifecycle::{Announcement, LifecycleEvent, NavPhase, PopOutcome};
use crate::core::nav_tree::{SITE_ROOT, resolve_root};
use crate::core::state::EphemeralStateStore;
use crate::host::{
    Animator, Announcer, Components, Dom, Easing, Element, Location, TransitionEngine, Tween,
};

const CLIPPED_CLASS: &str = "is-clipped";
const MAIN_ID_PREFIX: &str = "is-main--";

/// Errors from the controller's fetch and swap paths.
#[derive(Debug)]
pub enum NavError {
    Api(ApiError),
    Document(DocumentError),
    Json(serde_json::Error),
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavError::Api(e) => write!(f, "fetch failed: {e}"),
            NavError::Document(e) => write!(f, "document error: {e}"),
            NavError::Json(e) => write!(f, "index payload is not JSON: {e}"),
        }
    }
}

impl std::error::Error for NavError {}

impl From<ApiError> for NavError {
    fn from(e: ApiError) -> Self {
        NavError::Api(e)
    }
}

impl From<DocumentError> for NavError {
    fn from(e: DocumentError) -> Self {
        NavError::Document(e)
    }
}

/// Everything outside the controller that it talks to.
#[derive(Clone)]
pub struct Host {
    pub dom: Arc<dyn Dom>,
    pub location: Arc<dyn Location>,
    pub engine: Arc<dyn TransitionEngine>,
    pub animator: Arc<dyn Animator>,
    pub components: Arc<dyn Components>,
    pub announcer: Arc<dyn Announcer>,
    pub api: Arc<dyn ApiClient>,
}

pub struct NavigationController {
    host: Host,
    settings: RouterSettings,
    parser: DocumentParser,
    state: EphemeralStateStore<Value>,
    root: String,
    page_data: PageMetadata,
    phase: NavPhase,
    initialized: bool,
    popstate_bound: bool,
    is_pop: bool,
    scroll_in_flight: Arc<AtomicBool>,
}

impl NavigationController {
    pub fn new(host: Host, settings: RouterSettings) -> Result<Self, DocumentError> {
        let parser = DocumentParser::new(&settings.page_selector)?;
        Ok(Self {
            host,
            settings,
            parser,
            state: EphemeralStateStore::new(),
            root: SITE_ROOT.to_string(),
            page_data: PageMetadata::new(),
            phase: NavPhase::Idle,
            initialized: false,
            popstate_bound: false,
            is_pop: false,
            scroll_in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Ancestor index URL for the content on screen.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn page_metadata(&self) -> &PageMetadata {
        &self.page_data
    }

    pub fn phase(&self) -> NavPhase {
        self.phase
    }

    pub fn is_pop_navigation(&self) -> bool {
        self.is_pop
    }

    pub fn is_popstate_bound(&self) -> bool {
        self.popstate_bound
    }

    pub fn is_scrolling(&self) -> bool {
        self.scroll_in_flight.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Ephemeral state
    // ========================================================================

    /// State that lives until the checkpoint after next.
    pub fn set_state(&mut self, name: impl Into<String>, value: Value) {
        self.state.set_state(name, value);
    }

    pub fn get_state(&self, name: &str) -> Option<&Value> {
        self.state.get_state(name)
    }

    pub fn check_state(&mut self) {
        self.state.check_state();
        debug!("State checkpoint, generation {}", self.state.generation());
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// One-time wiring: resolve the root path, point the root link at it and
    /// start listening for root clicks and "detail view ended".
    ///
    /// Pages that are not themselves an index also get their root index
    /// loaded in the background. A failure there is returned, but the
    /// controller is fully set up by then.
    pub async fn init(&mut self) -> Result<(), NavError> {
        let nav_tree = self.host.dom.nav_tree();
        self.page_data = self.host.dom.page_metadata();
        let pathname = self.host.location.pathname();

        self.root = resolve_root(&nav_tree, &self.page_data, &pathname);
        self.host.dom.set_root_href(&self.root);
        self.initialized = true;
        info!("Router initialized, root path {}", self.root);

        if self.page_data.page_type() != PageType::Index {
            self.load_root_index().await?;
        }
        Ok(())
    }

    /// Suppresses empty `#hash` links.
    pub fn intercepts_link(&self, href: &str) -> bool {
        href.starts_with('#')
    }

    /// Root/logo link clicked.
    pub fn on_root_click(&self) {
        if !self.initialized {
            debug!("Root click before init, ignoring");
            return;
        }
        self.clear_offcanvas();
        self.announce(Announcement::RootClicked);
    }

    /// Listener side of the announcement bus.
    pub fn on_announcement(&self, announcement: &Announcement) {
        if !self.initialized {
            return;
        }
        if *announcement == Announcement::DetailViewEnded {
            if self.is_pop {
                debug!("Detail view ended during popstate, not re-routing");
            } else {
                self.route(&self.root);
            }
        }
    }

    /// Publishes, then delivers to this controller's own listener right away,
    /// the same way an in-process emitter would.
    fn announce(&self, announcement: Announcement) {
        debug!("Announcing {}", announcement.name());
        self.host.announcer.publish(&announcement);
        self.on_announcement(&announcement);
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn route(&self, path: &str) {
        debug!("Route: {}", path);
        self.host.engine.route(path);
    }

    /// Navigates without a visible transition, then runs the checkpoint.
    pub fn push<F>(&mut self, path: &str, on_complete: F)
    where
        F: FnOnce() + Send + 'static,
    {
        debug!("Silent push: {}", path);
        self.host.engine.route_silently(path, Box::new(on_complete));
        self.check_state();
    }

    /// Gives up on in-app routing and reloads the site root.
    pub fn redirect(&self) {
        let origin = self.host.location.origin();
        warn!("Redirecting to {}", origin);
        self.host.location.assign(&origin);
    }

    /// Native back/forward.
    pub fn handle_popstate(&mut self) -> PopOutcome {
        if !self.popstate_bound {
            debug!("Popstate before first page init, ignoring");
            return PopOutcome::Ignored;
        }

        let previous = self.phase;
        self.phase = NavPhase::Pop;
        self.is_pop = true;

        let pathname = self.host.location.pathname();
        let outcome = match self.match_simple_route(&pathname) {
            Some(identifier) => {
                self.host
                    .dom
                    .set_main_id(&format!("{MAIN_ID_PREFIX}{identifier}"));

                if identifier == self.settings.root_url_id {
                    self.clear_offcanvas();
                }
                if self.host.components.detail_active() {
                    self.announce(Announcement::DetailViewEnded);
                }
                self.host.components.close_overlay();
                PopOutcome::Simple { identifier }
            }
            None => {
                let opened = self.host.components.open_detail(&pathname);
                if !opened {
                    debug!("No tile for {}, nothing to open", pathname);
                }
                PopOutcome::Detail {
                    path: pathname,
                    opened,
                }
            }
        };

        self.host.components.close_gallery();

        self.is_pop = false;
        self.phase = previous;
        debug!("Popstate handled: {:?}", outcome);
        outcome
    }

    /// Content-root identifier for a simple route, or `None` for detail paths.
    fn match_simple_route(&self, pathname: &str) -> Option<String> {
        let matched = self
            .settings
            .simple_routes
            .iter()
            .find(|route| route.as_str() == pathname)?;
        let identifier = matched.replace('/', "");
        if identifier.is_empty() {
            Some(self.settings.root_url_id.clone())
        } else {
            Some(identifier)
        }
    }

    fn clear_offcanvas(&self) {
        self.host
            .dom
            .remove_classes(Element::Html, &self.settings.offcanvas_classes);
    }

    // ========================================================================
    // Fetching
    // ========================================================================

    pub fn parse_doc(&self, html: &str) -> Result<ParsedDocument, DocumentError> {
        self.parser.parse_doc(html)
    }

    /// Fetches the root index markup and hands its page fragment to whoever
    /// hydrates the root grid.
    pub async fn load_root_index(&self) -> Result<(), NavError> {
        let html = self
            .host
            .api
            .collection(&self.root, Format::Html)
            .await
            .inspect_err(|e| warn!("Root index load failed for {}: {}", self.root, e))?;
        let doc = self.parse_doc(&html)?;
        self.announce(Announcement::RootFragmentReady(doc.fragment.markup));
        Ok(())
    }

    /// Fetches the root index as JSON for the full index view.
    pub async fn load_full_index<F>(&self, on_loaded: F) -> Result<(), NavError>
    where
        F: FnOnce(Value),
    {
        let body = self
            .host
            .api
            .collection(&self.root, Format::Json)
            .await
            .inspect_err(|e| warn!("Full index load failed for {}: {}", self.root, e))?;
        let payload: Value = serde_json::from_str(&body).map_err(NavError::Json)?;
        on_loaded(payload);
        Ok(())
    }

    // ========================================================================
    // Lifecycle handlers
    // ========================================================================

    /// Dispatches a transition engine event to its handler.
    pub fn handle(&mut self, event: LifecycleEvent) -> Result<(), NavError> {
        debug!("Lifecycle event {} in phase {:?}", event.name(), self.phase);
        match event {
            LifecycleEvent::TransitionOut => {
                self.enter(NavPhase::TransitionOut, &[NavPhase::Idle]);
                self.change_page_out();
                Ok(())
            }
            LifecycleEvent::RefreshDocument { response } => {
                self.enter(NavPhase::ContentRefresh, &[NavPhase::TransitionOut]);
                self.change_content(&response)
            }
            LifecycleEvent::TransitionIn => {
                self.enter(NavPhase::TransitionIn, &[NavPhase::ContentRefresh]);
                self.change_page_in();
                self.phase = NavPhase::Idle;
                Ok(())
            }
            LifecycleEvent::InitializedPage => {
                self.init_page();
                self.phase = NavPhase::Idle;
                Ok(())
            }
            LifecycleEvent::SameTarget => {
                self.enter(NavPhase::SameTarget, &[NavPhase::Idle]);
                self.same_page();
                self.phase = NavPhase::Idle;
                Ok(())
            }
        }
    }

    /// Moves to `next`, complaining (but carrying on) if the engine skipped
    /// a step.
    fn enter(&mut self, next: NavPhase, expected_from: &[NavPhase]) {
        if !expected_from.contains(&self.phase) {
            warn!("Unexpected transition {:?} -> {:?}", self.phase, next);
        }
        self.phase = next;
    }

    /// First page is up: drop bootstrap data, unclip, start handling popstate.
    pub fn init_page(&mut self) {
        self.host.dom.detach_bootstrap_data();
        let clipped = [CLIPPED_CLASS.to_string()];
        self.host.dom.remove_classes(Element::Html, &clipped);
        self.host.dom.remove_classes(Element::Body, &clipped);
        if !self.popstate_bound {
            self.popstate_bound = true;
            debug!("Popstate listener bound");
        }
    }

    pub fn change_page_out(&self) {
        self.host
            .dom
            .add_class(Element::Html, &self.settings.routing_class);
    }

    pub fn change_page_in(&self) {
        let routing = [self.settings.routing_class.clone()];
        self.host.dom.remove_classes(Element::Html, &routing);
    }

    /// Swaps the fetched page into the live container and runs the
    /// checkpoint. Unparseable responses leave the DOM alone, but the cycle
    /// still counts.
    pub fn change_content(&mut self, response: &str) -> Result<(), NavError> {
        let swapped = self.parse_doc(response).map(|doc| {
            self.host.dom.replace_page_content(&doc.fragment.markup);
            let snapshot = doc.snapshot();
            self.page_data = doc.fragment.metadata;
            snapshot
        });

        let result = match swapped {
            Ok(snapshot) => {
                self.announce(Announcement::DocumentRefreshed(snapshot));
                Ok(())
            }
            Err(e) => {
                warn!("Content swap skipped: {}", e);
                Err(NavError::Document(e))
            }
        };

        self.check_state();
        result
    }

    /// Root link clicked while already on the root: scroll the root panel
    /// back to the top. Returns whether a scroll started.
    pub fn same_page(&mut self) -> bool {
        if self.host.location.pathname() != self.root || self.is_scrolling() {
            return false;
        }
        let from = self.host.dom.root_panel_scroll_top();
        if from <= 0.0 {
            return false;
        }

        // Marked before starting: an animator may finish synchronously.
        self.scroll_in_flight.store(true, Ordering::SeqCst);

        let dom = Arc::clone(&self.host.dom);
        let in_flight = Arc::clone(&self.scroll_in_flight);
        self.host.animator.tween(
            Tween {
                from,
                to: 0.0,
                duration: self.settings.scroll_duration,
                easing: Easing::EaseInOutCubic,
            },
            Box::new(move |top| dom.set_root_panel_scroll_top(top)),
            Box::new(move || in_flight.store(false, Ordering::SeqCst)),
        );
        true
    }
}
