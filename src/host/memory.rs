//! In-process host: a DOM that is just a struct, an engine that records what
//! it was asked to do, an animator that finishes instantly.
//!
//! Good enough to drive the router headless from the CLI and from tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use log::debug;

use super::{Animator, Announcer, Components, Dom, Element, Location, TransitionEngine, Tween};
use crate::core::document::PageMetadata;
use crate::core::lifecycle::Announcement;
use crate::core::nav_tree::NavigationTree;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================================================
// DOM
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct DomSnapshot {
    pub classes: HashMap<Element, HashSet<String>>,
    pub main_id: Option<String>,
    pub root_href: Option<String>,
    pub page_markup: String,
    pub page_metadata: PageMetadata,
    pub nav_tree: NavigationTree,
    pub bootstrap_attached: bool,
    pub scroll_top: f64,
}

#[derive(Default)]
pub struct MemoryDom {
    state: Mutex<DomSnapshot>,
}

impl MemoryDom {
    pub fn new(nav_tree: NavigationTree, page_metadata: PageMetadata) -> Self {
        Self {
            state: Mutex::new(DomSnapshot {
                nav_tree,
                page_metadata,
                bootstrap_attached: true,
                ..Default::default()
            }),
        }
    }

    pub fn snapshot(&self) -> DomSnapshot {
        lock(&self.state).clone()
    }

    pub fn has_class(&self, element: Element, class: &str) -> bool {
        lock(&self.state)
            .classes
            .get(&element)
            .is_some_and(|set| set.contains(class))
    }
}

impl Dom for MemoryDom {
    fn add_class(&self, element: Element, class: &str) {
        lock(&self.state)
            .classes
            .entry(element)
            .or_default()
            .insert(class.to_string());
    }

    fn remove_classes(&self, element: Element, classes: &[String]) {
        if let Some(set) = lock(&self.state).classes.get_mut(&element) {
            for class in classes {
                set.remove(class);
            }
        }
    }

    fn set_main_id(&self, id: &str) {
        lock(&self.state).main_id = Some(id.to_string());
    }

    fn set_root_href(&self, href: &str) {
        lock(&self.state).root_href = Some(href.to_string());
    }

    fn replace_page_content(&self, markup: &str) {
        lock(&self.state).page_markup = markup.to_string();
    }

    fn nav_tree(&self) -> NavigationTree {
        lock(&self.state).nav_tree.clone()
    }

    fn page_metadata(&self) -> PageMetadata {
        lock(&self.state).page_metadata.clone()
    }

    fn detach_bootstrap_data(&self) {
        lock(&self.state).bootstrap_attached = false;
    }

    fn root_panel_scroll_top(&self) -> f64 {
        lock(&self.state).scroll_top
    }

    fn set_root_panel_scroll_top(&self, top: f64) {
        lock(&self.state).scroll_top = top;
    }
}

// ============================================================================
// Location
// ============================================================================

pub struct MemoryLocation {
    origin: String,
    pathname: Mutex<String>,
    assigned: Mutex<Vec<String>>,
}

impl MemoryLocation {
    pub fn new(origin: impl Into<String>, pathname: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            pathname: Mutex::new(pathname.into()),
            assigned: Mutex::new(Vec::new()),
        }
    }

    /// Moves the location without navigating, like a history pop does.
    pub fn set_pathname(&self, pathname: &str) {
        *lock(&self.pathname) = pathname.to_string();
    }

    /// URLs passed to `assign`, in order.
    pub fn assigned(&self) -> Vec<String> {
        lock(&self.assigned).clone()
    }
}

impl Location for MemoryLocation {
    fn pathname(&self) -> String {
        lock(&self.pathname).clone()
    }

    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn assign(&self, url: &str) {
        lock(&self.assigned).push(url.to_string());
    }
}

// ============================================================================
// Transition engine
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Route(String),
    Silent(String),
}

/// Records navigations. Silent routes complete immediately.
#[derive(Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.calls).clone()
    }
}

impl TransitionEngine for RecordingEngine {
    fn route(&self, path: &str) {
        debug!("Engine route: {}", path);
        lock(&self.calls).push(EngineCall::Route(path.to_string()));
    }

    fn route_silently(&self, path: &str, on_complete: Box<dyn FnOnce() + Send>) {
        debug!("Engine silent route: {}", path);
        lock(&self.calls).push(EngineCall::Silent(path.to_string()));
        on_complete();
    }
}

// ============================================================================
// Animator
// ============================================================================

/// Runs tweens synchronously in a fixed number of steps.
///
/// With `hold` set, tweens are parked instead, and finish only when
/// [`StepAnimator::finish_all`] is called. That is how an in-flight animation
/// is observed.
pub struct StepAnimator {
    steps: u32,
    hold: AtomicBool,
    started: AtomicUsize,
    parked: Mutex<Vec<(Tween, Box<dyn FnMut(f64) + Send>, Box<dyn FnOnce() + Send>)>>,
}

impl StepAnimator {
    pub fn new(steps: u32) -> Self {
        Self {
            steps: steps.max(1),
            hold: AtomicBool::new(false),
            started: AtomicUsize::new(0),
            parked: Mutex::new(Vec::new()),
        }
    }

    pub fn holding(steps: u32) -> Self {
        let animator = Self::new(steps);
        animator.hold.store(true, Ordering::SeqCst);
        animator
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    fn run(
        &self,
        tween: Tween,
        mut on_update: Box<dyn FnMut(f64) + Send>,
        on_complete: Box<dyn FnOnce() + Send>,
    ) {
        for step in 1..=self.steps {
            on_update(tween.value_at(f64::from(step) / f64::from(self.steps)));
        }
        on_complete();
    }

    pub fn finish_all(&self) {
        let parked: Vec<_> = lock(&self.parked).drain(..).collect();
        for (tween, on_update, on_complete) in parked {
            self.run(tween, on_update, on_complete);
        }
    }
}

impl Animator for StepAnimator {
    fn tween(
        &self,
        tween: Tween,
        on_update: Box<dyn FnMut(f64) + Send>,
        on_complete: Box<dyn FnOnce() + Send>,
    ) {
        self.started.fetch_add(1, Ordering::SeqCst);
        if self.hold.load(Ordering::SeqCst) {
            lock(&self.parked).push((tween, on_update, on_complete));
        } else {
            self.run(tween, on_update, on_complete);
        }
    }
}

// ============================================================================
// Sibling components
// ============================================================================

/// Overlay, gallery and detail view stand-ins. Tiles are the detail paths
/// that can be opened.
#[derive(Default)]
pub struct MemoryComponents {
    tiles: Mutex<HashSet<String>>,
    detail: Mutex<Option<String>>,
    overlay_closes: AtomicUsize,
    gallery_closes: AtomicUsize,
}

impl MemoryComponents {
    pub fn new<I, S>(tiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tiles: Mutex::new(tiles.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn open_detail_path(&self) -> Option<String> {
        lock(&self.detail).clone()
    }

    pub fn set_detail(&self, path: Option<&str>) {
        *lock(&self.detail) = path.map(str::to_string);
    }

    pub fn overlay_closes(&self) -> usize {
        self.overlay_closes.load(Ordering::SeqCst)
    }

    pub fn gallery_closes(&self) -> usize {
        self.gallery_closes.load(Ordering::SeqCst)
    }
}

impl Components for MemoryComponents {
    fn detail_active(&self) -> bool {
        lock(&self.detail).is_some()
    }

    fn open_detail(&self, path: &str) -> bool {
        if !lock(&self.tiles).contains(path) {
            return false;
        }
        self.set_detail(Some(path));
        true
    }

    fn close_overlay(&self) {
        self.overlay_closes.fetch_add(1, Ordering::SeqCst);
    }

    fn close_gallery(&self) {
        self.gallery_closes.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Announcer
// ============================================================================

/// Keeps every announcement, in order.
#[derive(Default)]
pub struct RecordingAnnouncer {
    published: Mutex<Vec<Announcement>>,
}

impl RecordingAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<Announcement> {
        lock(&self.published).clone()
    }
}

impl Announcer for RecordingAnnouncer {
    fn publish(&self, announcement: &Announcement) {
        debug!("Announce: {}", announcement.name());
        lock(&self.published).push(announcement.clone());
    }
}
